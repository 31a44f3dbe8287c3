//! Journal configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};
use crate::types::CarId;

/// Settings for opening a journal store. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JournalConfig {
    /// SQLite database file; ":memory:" for a throwaway store
    pub database_path: PathBuf,
    /// Car shown when a request does not name one
    pub default_car_id: CarId,
    /// How long a statement waits on a locked database
    pub busy_timeout_ms: u64,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("drive_journal.db"),
            default_car_id: 1,
            busy_timeout_ms: 5_000,
        }
    }
}

impl JournalConfig {
    pub fn with_database_path(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| JournalError::Config(e.to_string()))
    }

    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!(
            "[Config] Loaded {} (database {})",
            path.display(),
            config.database_path.display()
        );
        Ok(config)
    }
}
