//! Day-aligned date ranges and the impact resolver.
//!
//! Every mutation reports the half-open, whole-day interval its ids touch so the
//! caller knows which days and totals to re-query.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use rusqlite::{Connection, params_from_iter};
use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};
use crate::store::placeholders;
use crate::types::{DriveId, GroupId, utc_from_unix};

/// Half-open interval of UTC calendar days: `start <= day < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end <= start {
            return Err(JournalError::InvalidRequest(format!(
                "empty date range {}..{}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The single day `date`.
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: next_day(date),
        }
    }

    /// The calendar month `year`-`month` (1-based month).
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            JournalError::InvalidRequest(format!("invalid month {}-{}", year, month))
        })?;
        let end = start.checked_add_months(Months::new(1)).ok_or_else(|| {
            JournalError::InvalidRequest(format!("month {}-{} out of range", year, month))
        })?;
        Ok(Self { start, end })
    }

    /// Smallest day-aligned range containing both instants: the start of the
    /// earliest instant's day up to the start of the day after the latest one.
    pub fn covering(earliest: DateTime<Utc>, latest: DateTime<Utc>) -> Self {
        let (earliest, latest) = if latest < earliest {
            (latest, earliest)
        } else {
            (earliest, latest)
        };
        Self {
            start: earliest.date_naive(),
            end: next_day(latest.date_naive()),
        }
    }

    /// Inclusive lower bound as unix seconds.
    pub fn start_timestamp(&self) -> i64 {
        midnight_timestamp(self.start)
    }

    /// Exclusive upper bound as unix seconds.
    pub fn end_timestamp(&self) -> i64 {
        midnight_timestamp(self.end)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let day = instant.date_naive();
        self.start <= day && day < self.end
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &DateRange) -> DateRange {
        DateRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Every day in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start
            .iter_days()
            .take_while(move |day| *day < self.end)
    }

    pub fn year_month(&self) -> (i32, u32) {
        (self.start.year(), self.start.month())
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
}

fn midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

// ============================================================================
// Impact resolver
// ============================================================================

/// Earliest start and latest end over the named rows of `table`.
fn extent(conn: &Connection, table: &str, ids: &[i64]) -> Result<Option<(i64, i64)>> {
    if ids.is_empty() {
        return Ok(None);
    }
    let sql = format!(
        "SELECT MIN(start_date), MAX(end_date) FROM {} WHERE id IN ({})",
        table,
        placeholders(ids.len())
    );
    let bounds: (Option<i64>, Option<i64>) = conn.query_row(
        &sql,
        params_from_iter(ids.iter()),
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(match bounds {
        (Some(min), Some(max)) => Some((min, max)),
        _ => None,
    })
}

/// Minimal day-aligned range enclosing the named drives and grouped drives.
///
/// Ids that no longer resolve are ignored; if nothing resolves at all the result
/// is [`JournalError::NoAffectedRange`], which callers treat as "nothing to refresh".
pub fn affected_range(
    conn: &Connection,
    drive_ids: &[DriveId],
    group_ids: &[GroupId],
) -> Result<DateRange> {
    let drives = extent(conn, "drives", drive_ids)?;
    let groups = extent(conn, "grouped_drives", group_ids)?;

    let (min, max) = match (drives, groups) {
        (Some(d), Some(g)) => (d.0.min(g.0), d.1.max(g.1)),
        (Some(bounds), None) | (None, Some(bounds)) => bounds,
        (None, None) => return Err(JournalError::NoAffectedRange),
    };

    Ok(DateRange::covering(utc_from_unix(min)?, utc_from_unix(max)?))
}
