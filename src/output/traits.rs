//! Output handler traits and types
//!
//! This module defines the trait interface for output handlers and the data
//! gathered for a run summary.

use crate::crawler::CrawlFailure;
use crate::graph::{ComplexityMap, Graph};
use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One row of the summary's tracker table
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerRow {
    pub id: String,
    pub tracker_id: i64,
    pub name: String,

    /// Issues below the tracker, including resolved descendants
    pub issues: usize,

    /// False when the tracker was skipped or its fill failed
    pub filled: bool,
}

/// One entry of the complexity ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RankedIssue {
    pub id: String,
    pub label: String,
    pub score: u64,
}

/// Everything rendered into `summary.md`
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    // Run metadata, absent when no ledger entry exists
    pub run_id: Option<i64>,
    pub mode: Option<String>,
    pub status: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub config_hash: String,

    // Tree overview
    pub root_name: String,
    pub trackers: Vec<TrackerRow>,
    pub issues_total: usize,

    // Graph overview
    pub graph_nodes: usize,
    pub structural_edges: usize,
    pub reference_edges: usize,

    /// Subjects ordered by descending score, then id
    pub ranking: Vec<RankedIssue>,

    pub failures: Vec<CrawlFailure>,
}

impl RunSummary {
    /// Creates a new empty summary
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trackers_valid(&self) -> usize {
        self.trackers.iter().filter(|row| row.filled).count()
    }

    /// Sum of all complexity scores
    pub fn total_references(&self) -> u64 {
        self.ranking.iter().map(|entry| entry.score).sum()
    }
}

/// Trait for output handlers
///
/// Output handlers persist the artifacts of one graph build.
pub trait OutputHandler {
    /// Writes the node/edge document
    fn write_graph(&self, graph: &Graph) -> OutputResult<PathBuf>;

    /// Writes the id → score map
    fn write_complexity(&self, complexity: &ComplexityMap) -> OutputResult<PathBuf>;

    /// Renders and writes the markdown summary
    fn write_summary(&self, summary: &RunSummary) -> OutputResult<PathBuf>;
}
