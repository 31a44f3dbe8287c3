//! Unified error handling for the drive journal.
//!
//! Expected conditions a caller can react to (empty id sets, nothing to refresh,
//! double grouping) are kept apart from store failures, which are surfaced as-is
//! and never retried here.

use thiserror::Error;

/// Error type for journal operations.
#[derive(Error, Debug)]
pub enum JournalError {
    /// Empty or contradictory input (no ids, drives of another car, unknown drives)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The underlying store was unreachable or rejected a statement
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Schema migration failed while opening the store
    #[error("migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    /// A refresh was requested but none of the ids resolved to a record
    #[error("no affected date range: none of the given ids resolved to a record")]
    NoAffectedRange,

    /// A drive offered for grouping is already a member of another group
    #[error("drive {drive_id} already belongs to grouped drive {group_id}")]
    AlreadyGrouped { drive_id: i64, group_id: i64 },

    /// A single-record lookup found nothing
    #[error("not found: {0}")]
    NotFound(String),

    /// Configuration could not be parsed
    #[error("config error: {0}")]
    Config(String),

    /// File I/O error (config loading)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl JournalError {
    /// Whether the caller can carry on (e.g. skip the refresh step) instead of failing.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            JournalError::InvalidRequest(_)
                | JournalError::NoAffectedRange
                | JournalError::AlreadyGrouped { .. }
                | JournalError::NotFound(_)
        )
    }
}

/// Result type alias for journal operations.
pub type Result<T> = std::result::Result<T, JournalError>;
