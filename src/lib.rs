//! Drive Journal - trip classification and grouping engine
//!
//! This crate provides:
//! - Business/private classification of recorded drives
//! - Grouping of adjacent drives into one logical trip, and ungrouping
//! - Day-aligned impact ranges and per-classification totals
//! - GPS traces of drives and grouped drives as GeoJSON
//! - SQLite persistence with schema migrations

pub mod classify;
pub mod config;
pub mod error;
pub mod grouping;
pub mod journal;
pub mod migrations;
pub mod range;
pub mod route;
pub mod store;
pub mod totals;
pub mod types;
pub mod view;

pub use config::JournalConfig;
pub use error::{JournalError, Result};
pub use journal::{Action, ActionOutcome, ActionRequest, DriveJournal};
pub use range::DateRange;
pub use route::{GpsPoint, Route};
pub use totals::{Bucket, Totals};
pub use types::{Car, CarId, Classification, Drive, DriveId, GroupId, GroupedDrive, hours_minutes};
pub use view::{Day, MonthView};
