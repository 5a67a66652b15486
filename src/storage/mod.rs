//! Storage module for persisting crawl results
//!
//! This module handles everything the pipeline keeps between invocations:
//! - JSON checkpoints of the populated tree, read back by resume mode
//! - A SQLite ledger of runs and their absorbed failures

mod checkpoint;
mod schema;
mod sqlite;
mod traits;

pub use checkpoint::{load_checkpoint, save_checkpoint, Checkpoint};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::path::Path;

/// Opens or creates the ledger database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a pipeline run in the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub mode: RunMode,
    pub status: RunStatus,
    pub totals: RunTotals,
}

/// Tree size recorded when a run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    /// Trackers under the root, valid or not
    pub trackers_total: u64,
    pub trackers_valid: u64,
    pub issues_total: u64,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Where a run's tree came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Fresh crawl of the remote site
    Crawl,

    /// Restored from the JSON checkpoint
    Resume,
}

impl RunMode {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Crawl => "crawl",
            Self::Resume => "resume",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "crawl" => Some(Self::Crawl),
            "resume" => Some(Self::Resume),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[RunStatus::Running, RunStatus::Completed, RunStatus::Failed] {
            let parsed = RunStatus::from_db_string(status.to_db_string());
            assert_eq!(Some(*status), parsed);
        }
        assert_eq!(RunStatus::from_db_string("interrupted"), None);
    }

    #[test]
    fn test_run_mode_roundtrip() {
        for mode in &[RunMode::Crawl, RunMode::Resume] {
            assert_eq!(RunMode::from_db_string(mode.to_db_string()), Some(*mode));
        }
        assert_eq!(RunMode::from_db_string("invalid"), None);
    }
}
