//! Per-day and per-month listings handed to the presentation layer.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::range::DateRange;
use crate::totals::Totals;
use crate::types::{Car, CarId, Drive, GroupedDrive};

/// Drives and grouped drives starting on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub date: NaiveDate,
    /// Newest first
    pub drives: Vec<Drive>,
    /// Oldest first
    pub grouped_drives: Vec<GroupedDrive>,
    pub totals: Totals,
}

impl Day {
    pub fn is_weekend(&self) -> bool {
        matches!(self.date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn grouped_drive(&self, id: i64) -> Option<&GroupedDrive> {
        self.grouped_drives.iter().find(|g| g.id == id)
    }
}

/// Everything the monthly dashboard shows for one car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    pub car_id: CarId,
    pub year: i32,
    pub month: u32,
    pub range: DateRange,
    pub cars: Vec<Car>,
    /// Newest day first
    pub days: Vec<Day>,
    pub totals: Totals,
    /// First and last year with drives, for period pickers
    pub year_span: Option<(i32, i32)>,
}

/// Bucket drives (newest first) into days and attach the grouped drives that
/// start on each day.
///
/// Only days with at least one drive are produced; a group whose start day has
/// no listed drive is not shown.
pub fn build_days(drives: Vec<Drive>, grouped_drives: Vec<GroupedDrive>) -> Vec<Day> {
    let mut days: Vec<Day> = Vec::new();

    for drive in drives {
        let date = drive.start_date.date_naive();
        match days.last_mut() {
            Some(day) if day.date == date => day.drives.push(drive),
            _ => days.push(Day {
                date,
                drives: vec![drive],
                grouped_drives: Vec::new(),
                totals: Totals::default(),
            }),
        }
    }

    for group in grouped_drives {
        let date = group.start_date.date_naive();
        if let Some(day) = days.iter_mut().find(|d| d.date == date) {
            day.grouped_drives.push(group);
        }
    }

    for day in &mut days {
        day.totals = Totals::from_drives(&day.drives);
    }

    days
}
