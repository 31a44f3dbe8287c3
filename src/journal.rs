//! # Drive Journal
//!
//! Store handle that owns the SQLite connection and exposes every journal
//! operation. The handle is passed explicitly to whoever serves requests;
//! there is no process-wide instance.
//!
//! ## Operations
//!
//! - **Mutations** (`classify`, `group`, `ungroup`, group classification
//!   writes): each runs in one transaction and reports the affected day range.
//! - **Queries**: drive and grouped-drive listings, per-day and per-month views,
//!   totals, GPS traces.
//! - **`apply`**: runs one presentation action and re-queries the affected days
//!   and the month totals in a single call.

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use log::{info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::classify;
use crate::config::JournalConfig;
use crate::error::{JournalError, Result};
use crate::grouping;
use crate::migrations;
use crate::range::{self, DateRange};
use crate::route::Route;
use crate::store::{drives, grouped, positions};
use crate::totals::{self, Totals};
use crate::types::{Car, CarId, Classification, Drive, DriveId, GroupId, GroupedDrive};
use crate::view::{Day, MonthView, build_days};

// ============================================================================
// Actions
// ============================================================================

/// One mutation requested by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Action {
    Classify {
        classification: Classification,
        drive_ids: Vec<DriveId>,
        group_ids: Vec<GroupId>,
    },
    Group {
        drive_ids: Vec<DriveId>,
    },
    Ungroup {
        group_ids: Vec<GroupId>,
    },
}

impl Action {
    /// Build an action from raw form values.
    ///
    /// Ids must parse as integers; anything else is rejected rather than passed
    /// on to the store.
    pub fn from_form(
        action: &str,
        classification: Option<&str>,
        drive_ids: &[&str],
        group_ids: &[&str],
    ) -> Result<Self> {
        match action {
            "classify" => {
                let value = classification.unwrap_or_default();
                let classification = Classification::parse(value).ok_or_else(|| {
                    JournalError::InvalidRequest(format!("unknown classification '{}'", value))
                })?;
                Ok(Action::Classify {
                    classification,
                    drive_ids: parse_ids(drive_ids)?,
                    group_ids: parse_ids(group_ids)?,
                })
            }
            "group" => Ok(Action::Group {
                drive_ids: parse_ids(drive_ids)?,
            }),
            "ungroup" => Ok(Action::Ungroup {
                group_ids: parse_ids(group_ids)?,
            }),
            other => Err(JournalError::InvalidRequest(format!(
                "unknown action '{}'",
                other
            ))),
        }
    }
}

fn parse_ids(raw: &[&str]) -> Result<Vec<i64>> {
    raw.iter()
        .map(|s| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| JournalError::InvalidRequest(format!("invalid id '{}'", s)))
        })
        .collect()
}

/// An action plus the car and displayed month it was issued from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub car_id: CarId,
    pub year: i32,
    pub month: u32,
    pub action: Action,
}

/// What the presentation layer needs to refresh after an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    /// Days touched by the action; `None` when nothing needs refreshing
    pub range: Option<DateRange>,
    pub affected_days: Vec<Day>,
    /// Totals of the displayed month
    pub totals: Totals,
    /// Set when the action was rejected or resolved nothing
    pub warning: Option<String>,
}

// ============================================================================
// Journal
// ============================================================================

pub struct DriveJournal {
    db: Connection,
    config: JournalConfig,
}

impl DriveJournal {
    /// Open (and migrate) the journal at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        Self::open_with_config(JournalConfig::with_database_path(db_path))
    }

    /// Open a throwaway in-memory journal.
    pub fn in_memory() -> Result<Self> {
        Self::open_with_config(JournalConfig::with_database_path(":memory:"))
    }

    pub fn open_with_config(config: JournalConfig) -> Result<Self> {
        let mut db = Connection::open(&config.database_path)?;
        db.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        migrations::migrate(&mut db)?;

        info!(
            "[DriveJournal] Opened {}",
            config.database_path.display()
        );

        Ok(Self { db, config })
    }

    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// The underlying connection, for callers that share the database.
    pub fn connection(&self) -> &Connection {
        &self.db
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub fn classify(
        &mut self,
        classification: Classification,
        drive_ids: &[DriveId],
        group_ids: &[GroupId],
    ) -> Result<DateRange> {
        classify::classify(&mut self.db, classification, drive_ids, group_ids)
    }

    pub fn group(
        &mut self,
        car_id: CarId,
        drive_ids: &[DriveId],
    ) -> Result<(GroupedDrive, DateRange)> {
        grouping::group(&mut self.db, car_id, drive_ids)
    }

    pub fn ungroup(&mut self, group_ids: &[GroupId]) -> Result<DateRange> {
        grouping::ungroup(&mut self.db, group_ids)
    }

    /// Overwrite the groups' stored classification without touching members.
    pub fn set_group_classification(
        &mut self,
        group_ids: &[GroupId],
        classification: Option<Classification>,
    ) -> Result<usize> {
        classify::set_group_classification(&mut self.db, group_ids, classification)
    }

    /// Re-derive and store a group's classification from its members.
    pub fn recompute_group_classification(
        &mut self,
        group_id: GroupId,
    ) -> Result<Option<Classification>> {
        classify::recompute_group_classification(&mut self.db, group_id)
    }

    pub fn set_drive_comment(&mut self, drive_id: DriveId, comment: &str) -> Result<()> {
        if drives::drive_by_id(&self.db, drive_id)?.is_none() {
            return Err(JournalError::NotFound(format!("drive {}", drive_id)));
        }
        drives::set_drive_comment(&self.db, drive_id, comment)
    }

    pub fn set_group_comment(&mut self, group_id: GroupId, comment: &str) -> Result<()> {
        match grouped::set_comment(&self.db, group_id, comment)? {
            0 => Err(JournalError::NotFound(format!("grouped drive {}", group_id))),
            _ => Ok(()),
        }
    }

    /// Run one presentation action and gather what must be redisplayed.
    ///
    /// Rejected or empty actions are logged and reported through
    /// `ActionOutcome::warning` with no affected days; store failures are
    /// returned as errors.
    pub fn apply(&mut self, request: &ActionRequest) -> Result<ActionOutcome> {
        let month = DateRange::month(request.year, request.month)?;

        let result = match &request.action {
            Action::Classify {
                classification,
                drive_ids,
                group_ids,
            } => self.classify(*classification, drive_ids, group_ids),
            Action::Group { drive_ids } => self
                .group(request.car_id, drive_ids)
                .map(|(_, range)| range),
            Action::Ungroup { group_ids } => self.ungroup(group_ids),
        };

        let (range, warning) = match result {
            Ok(range) => (Some(range), None),
            Err(e) if e.is_recoverable() => {
                warn!("[DriveJournal] Action {:?} not applied: {}", request.action, e);
                (None, Some(e.to_string()))
            }
            Err(e) => return Err(e),
        };

        let affected_days = match &range {
            Some(range) => self.days(request.car_id, range)?,
            None => Vec::new(),
        };

        Ok(ActionOutcome {
            range,
            affected_days,
            totals: self.totals(request.car_id, &month)?,
            warning,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn cars(&self) -> Result<Vec<Car>> {
        drives::cars(&self.db)
    }

    pub fn year_span(&self) -> Result<Option<(i32, i32)>> {
        drives::year_span(&self.db)
    }

    pub fn drive(&self, id: DriveId) -> Result<Drive> {
        drives::drive_by_id(&self.db, id)?
            .ok_or_else(|| JournalError::NotFound(format!("drive {}", id)))
    }

    pub fn drive_comment(&self, id: DriveId) -> Result<Option<String>> {
        drives::drive_comment(&self.db, id)
    }

    pub fn grouped_drive(&self, id: GroupId) -> Result<GroupedDrive> {
        grouped::grouped_drive_by_id(&self.db, id)?
            .ok_or_else(|| JournalError::NotFound(format!("grouped drive {}", id)))
    }

    /// Member drive ids of the named groups; unknown ids contribute nothing.
    pub fn drive_ids_for_groups(&self, group_ids: &[GroupId]) -> Result<Vec<DriveId>> {
        grouped::member_drive_ids(&self.db, group_ids)
    }

    /// GPS trace of one drive.
    pub fn route(&self, drive_id: DriveId) -> Result<Route> {
        if drives::drive_by_id(&self.db, drive_id)?.is_none() {
            return Err(JournalError::NotFound(format!("drive {}", drive_id)));
        }
        Ok(Route::new(positions::positions_for_drives(&self.db, &[drive_id])?))
    }

    /// GPS trace across all member drives of a group.
    pub fn group_route(&self, group_id: GroupId) -> Result<Route> {
        let members = grouped::member_drive_ids(&self.db, &[group_id])?;
        if members.is_empty() && grouped::grouped_drive_by_id(&self.db, group_id)?.is_none() {
            return Err(JournalError::NotFound(format!("grouped drive {}", group_id)));
        }
        Ok(Route::new(positions::positions_for_drives(&self.db, &members)?))
    }

    pub fn drives(&self, car_id: CarId, range: &DateRange) -> Result<Vec<Drive>> {
        drives::drives_in_range(&self.db, car_id, range)
    }

    pub fn grouped_drives(&self, car_id: CarId, range: &DateRange) -> Result<Vec<GroupedDrive>> {
        grouped::grouped_drives_in_range(&self.db, car_id, range)
    }

    pub fn affected_range(&self, drive_ids: &[DriveId], group_ids: &[GroupId]) -> Result<DateRange> {
        range::affected_range(&self.db, drive_ids, group_ids)
    }

    pub fn totals(&self, car_id: CarId, range: &DateRange) -> Result<Totals> {
        totals::totals(&self.db, car_id, range)
    }

    /// Days with drives inside `range`, newest first.
    pub fn days(&self, car_id: CarId, range: &DateRange) -> Result<Vec<Day>> {
        Ok(build_days(
            self.drives(car_id, range)?,
            self.grouped_drives(car_id, range)?,
        ))
    }

    /// A single day, present even when it has no drives.
    pub fn day(&self, car_id: CarId, date: NaiveDate) -> Result<Day> {
        let range = DateRange::day(date);
        Ok(self
            .days(car_id, &range)?
            .into_iter()
            .next()
            .unwrap_or(Day {
                date,
                drives: Vec::new(),
                grouped_drives: Vec::new(),
                totals: Totals::default(),
            }))
    }

    pub fn month(&self, car_id: CarId, year: i32, month: u32) -> Result<MonthView> {
        let range = DateRange::month(year, month)?;
        Ok(MonthView {
            car_id,
            year,
            month,
            range,
            cars: self.cars()?,
            days: self.days(car_id, &range)?,
            totals: self.totals(car_id, &range)?,
            year_span: self.year_span()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_form() {
        let action = Action::from_form("classify", Some("private"), &["3", " 4"], &["9"]).unwrap();
        assert_eq!(
            action,
            Action::Classify {
                classification: Classification::Private,
                drive_ids: vec![3, 4],
                group_ids: vec![9],
            }
        );

        assert_eq!(
            Action::from_form("ungroup", None, &[], &["12"]).unwrap(),
            Action::Ungroup { group_ids: vec![12] }
        );
    }

    #[test]
    fn test_action_from_form_rejects_bad_input() {
        assert!(Action::from_form("classify", Some("unknown"), &["1"], &[]).is_err());
        assert!(Action::from_form("classify", None, &["1"], &[]).is_err());
        assert!(Action::from_form("group", None, &["1); DROP TABLE drives; --"], &[]).is_err());
        assert!(Action::from_form("merge", None, &["1"], &[]).is_err());
    }

    #[test]
    fn test_action_json_shape() {
        let json = serde_json::to_value(Action::Group { drive_ids: vec![1, 2] }).unwrap();
        assert_eq!(json["action"], "group");
        assert_eq!(json["driveIds"], serde_json::json!([1, 2]));
        assert!(json.get("drive_ids").is_none());

        let request: ActionRequest = serde_json::from_str(
            r#"{"carId": 1, "year": 2024, "month": 3,
                "action": {"action": "classify", "classification": "business",
                           "driveIds": [4], "groupIds": []}}"#,
        )
        .unwrap();
        assert_eq!(
            request.action,
            Action::Classify {
                classification: Classification::Business,
                drive_ids: vec![4],
                group_ids: vec![],
            }
        );
    }

    #[test]
    fn test_day_without_drives() {
        let journal = DriveJournal::in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let day = journal.day(1, date).unwrap();
        assert_eq!(day.date, date);
        assert!(day.drives.is_empty());
        assert!(day.is_weekend());
    }

    #[test]
    fn test_missing_records() {
        let mut journal = DriveJournal::in_memory().unwrap();
        assert!(matches!(journal.drive(1), Err(JournalError::NotFound(_))));
        assert!(matches!(journal.grouped_drive(1), Err(JournalError::NotFound(_))));
        assert!(matches!(journal.route(1), Err(JournalError::NotFound(_))));
        assert!(matches!(journal.group_route(1), Err(JournalError::NotFound(_))));
        assert!(matches!(
            journal.set_group_comment(1, "x"),
            Err(JournalError::NotFound(_))
        ));
        assert!(matches!(
            journal.set_drive_comment(1, "x"),
            Err(JournalError::NotFound(_))
        ));
        assert_eq!(journal.year_span().unwrap(), None);
    }
}
