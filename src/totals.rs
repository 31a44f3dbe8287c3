//! Totals aggregator.
//!
//! Business and private are independent sums; `unclassified` is always the
//! remainder `total - business - private`, never a scan for drives without a
//! classification.

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::range::DateRange;
use crate::types::{CarId, Classification, Drive, hours_minutes};

/// Unclassified distance at or below this is summation noise.
const DISTANCE_TOLERANCE_KM: f64 = 1e-6;

/// Duration/distance pair for one classification bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub duration_min: i64,
    pub distance: f64,
}

impl Bucket {
    pub fn new(duration_min: i64, distance: f64) -> Self {
        Self {
            duration_min,
            distance,
        }
    }

    /// Duration as `h:mm`.
    pub fn duration_display(&self) -> String {
        hours_minutes(self.duration_min)
    }

    fn add(&mut self, drive: &Drive) {
        self.duration_min += drive.duration_min;
        self.distance += drive.distance;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub business: Bucket,
    pub private: Bucket,
    pub unclassified: Bucket,
    pub total: Bucket,
}

impl Totals {
    /// Build totals from the three independent sums, deriving the remainder.
    pub fn from_sums(business: Bucket, private: Bucket, total: Bucket) -> Self {
        Self {
            business,
            private,
            unclassified: Bucket {
                duration_min: total.duration_min - business.duration_min - private.duration_min,
                distance: total.distance - business.distance - private.distance,
            },
            total,
        }
    }

    /// Totals over drives already in memory (e.g. one listed day).
    pub fn from_drives<'a, I>(drives: I) -> Self
    where
        I: IntoIterator<Item = &'a Drive>,
    {
        let mut business = Bucket::default();
        let mut private = Bucket::default();
        let mut total = Bucket::default();

        for drive in drives {
            total.add(drive);
            match drive.classification {
                Some(Classification::Business) => business.add(drive),
                Some(Classification::Private) => private.add(drive),
                None => {}
            }
        }

        Self::from_sums(business, private, total)
    }

    /// Whether any duration or distance is left unclassified.
    pub fn unclassified_remaining(&self) -> bool {
        self.unclassified.duration_min > 0 || self.unclassified.distance > DISTANCE_TOLERANCE_KM
    }
}

/// Totals for the drives of `car_id` starting inside `range`.
/// An empty range yields all-zero totals.
pub fn totals(conn: &Connection, car_id: CarId, range: &DateRange) -> Result<Totals> {
    let mut stmt = conn.prepare_cached(
        "SELECT
            COALESCE(SUM(CASE WHEN c.classification = ?4 THEN d.duration_min ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN c.classification = ?4 THEN d.distance ELSE 0.0 END), 0.0),
            COALESCE(SUM(CASE WHEN c.classification = ?5 THEN d.duration_min ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN c.classification = ?5 THEN d.distance ELSE 0.0 END), 0.0),
            COALESCE(SUM(d.duration_min), 0),
            COALESCE(SUM(d.distance), 0.0)
         FROM drives d
         LEFT JOIN classifications c ON c.drive_id = d.id
         WHERE d.car_id = ?1 AND d.start_date >= ?2 AND d.start_date < ?3",
    )?;

    let totals = stmt.query_row(
        params![
            car_id,
            range.start_timestamp(),
            range.end_timestamp(),
            Classification::Business,
            Classification::Private,
        ],
        |row| {
            Ok(Totals::from_sums(
                Bucket::new(row.get(0)?, row.get(1)?),
                Bucket::new(row.get(2)?, row.get(3)?),
                Bucket::new(row.get(4)?, row.get(5)?),
            ))
        },
    )?;
    Ok(totals)
}
