//! Record types read and written by the journal store.
//!
//! Drives are produced upstream and only ever read here; classifications,
//! grouped drives and comments are owned by this crate.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

pub type DriveId = i64;
pub type GroupId = i64;
pub type CarId = i64;

// ============================================================================
// Classification
// ============================================================================

/// Business/private tag. Absence of a value means "unclassified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Business,
    Private,
}

impl Classification {
    /// Integer code persisted in the `classification` columns.
    pub fn code(&self) -> i64 {
        match self {
            Classification::Business => 1,
            Classification::Private => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Classification::Business),
            2 => Some(Classification::Private),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Business => "business",
            Classification::Private => "private",
        }
    }

    /// Parse the form value used by the presentation layer.
    /// Anything other than "business"/"private" is not a classification.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "business" => Some(Classification::Business),
            "private" => Some(Classification::Private),
            _ => None,
        }
    }
}

impl ToSql for Classification {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for Classification {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        Classification::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

// ============================================================================
// Records
// ============================================================================

/// One completed trip, enriched with resolved addresses and the engine-owned
/// classification and group membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    pub id: DriveId,
    pub car_id: CarId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Duration in whole minutes
    pub duration_min: i64,
    /// Distance in kilometres
    pub distance: f64,
    pub start_address: String,
    pub end_address: String,
    pub start_odometer: i64,
    pub end_odometer: i64,
    pub classification: Option<Classification>,
    pub group_id: Option<GroupId>,
    pub comment: Option<String>,
}

/// Aggregate standing in for several drives of the same car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedDrive {
    pub id: GroupId,
    pub car_id: CarId,
    /// Member drive ids, ordered by member start time
    pub drive_ids: Vec<DriveId>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration_min: i64,
    pub distance: f64,
    pub start_address: String,
    pub end_address: String,
    /// min(start odometer) across members
    pub start_odometer: i64,
    /// max(end odometer) across members
    pub end_odometer: i64,
    /// Denormalized classification; see `grouping::consensus_classification`
    pub classification: Option<Classification>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub id: CarId,
    pub model: Option<String>,
    pub name: Option<String>,
}

/// Convert stored unix seconds into a UTC timestamp.
pub(crate) fn utc_from_unix(secs: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(
        0, secs,
    ))
}

/// Format a minute count as `h:mm`.
pub fn hours_minutes(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.abs();
    format!("{}{}:{:02}", sign, minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_codes() {
        assert_eq!(Classification::Business.code(), 1);
        assert_eq!(Classification::Private.code(), 2);
        assert_eq!(Classification::from_code(2), Some(Classification::Private));
        assert_eq!(Classification::from_code(-1), None);
    }

    #[test]
    fn test_classification_parse() {
        assert_eq!(
            Classification::parse("business"),
            Some(Classification::Business)
        );
        assert_eq!(Classification::parse("Private"), None);
        assert_eq!(Classification::parse(""), None);
    }

    #[test]
    fn test_classification_sql_roundtrip() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let value: Classification = conn
            .query_row("SELECT ?1", [Classification::Private], |row| row.get(0))
            .unwrap();
        assert_eq!(value, Classification::Private);

        let bad: rusqlite::Result<Classification> =
            conn.query_row("SELECT 5", [], |row| row.get(0));
        assert!(bad.is_err());
    }

    #[test]
    fn test_hours_minutes() {
        assert_eq!(hours_minutes(0), "0:00");
        assert_eq!(hours_minutes(59), "0:59");
        assert_eq!(hours_minutes(60), "1:00");
        assert_eq!(hours_minutes(135), "2:15");
        assert_eq!(hours_minutes(-5), "-0:05");
    }

    #[test]
    fn test_utc_from_unix() {
        let ts = utc_from_unix(1_700_000_000).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }
}
