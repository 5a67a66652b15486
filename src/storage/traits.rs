//! Storage traits and error types
//!
//! This module defines the trait interface for the run ledger and the errors
//! shared by the ledger and the checkpoint files.

use crate::crawler::CrawlFailure;
use crate::storage::{RunMode, RunRecord, RunStatus, RunTotals};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Checkpoint file not found: {}", .0.display())]
    CheckpointMissing(PathBuf),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for run ledger backends
///
/// A run is opened when the pipeline starts, receives the crawl's absorbed
/// failures, and is closed with its final status and totals.
pub trait Storage {
    /// Opens a new run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `mode` - Whether the run crawls or resumes from a checkpoint
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, mode: RunMode) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Closes a run with its final status and totals
    fn finish_run(&mut self, run_id: i64, status: RunStatus, totals: RunTotals)
        -> StorageResult<()>;

    /// Appends absorbed failures to a run
    fn record_failures(&mut self, run_id: i64, failures: &[CrawlFailure]) -> StorageResult<()>;

    /// Gets a run's failures in the order they were recorded
    fn failures_for_run(&self, run_id: i64) -> StorageResult<Vec<CrawlFailure>>;
}
