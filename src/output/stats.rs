//! Statistics from the run ledger
//!
//! This module extracts the latest run and its failures from storage and
//! prints them for `--stats`.

use crate::crawler::{CrawlFailure, FailureStage};
use crate::storage::{RunRecord, Storage, StorageResult};
use std::collections::BTreeMap;

/// Ledger statistics for the most recent run
#[derive(Debug, Clone, Default)]
pub struct LedgerStatistics {
    /// Most recent run, if any was recorded
    pub run: Option<RunRecord>,

    /// Failures of that run, in recorded order
    pub failures: Vec<CrawlFailure>,
}

impl LedgerStatistics {
    /// Failure count per stage, skipping empty stages
    pub fn failures_by_stage(&self) -> Vec<(FailureStage, usize)> {
        [
            FailureStage::Tracker,
            FailureStage::Children,
            FailureStage::Content,
        ]
        .into_iter()
        .map(|stage| {
            let count = self.failures.iter().filter(|f| f.stage == stage).count();
            (stage, count)
        })
        .filter(|(_, count)| *count > 0)
        .collect()
    }

    /// Failure count per tracker id, sorted by id
    pub fn failures_by_tracker(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.tracker_id.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(LedgerStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query the ledger
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<LedgerStatistics> {
    let run = storage.get_latest_run()?;
    let failures = match &run {
        Some(run) => storage.failures_for_run(run.id)?,
        None => Vec::new(),
    };
    Ok(LedgerStatistics { run, failures })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &LedgerStatistics) {
    println!("=== Run Statistics ===\n");

    let Some(run) = &stats.run else {
        println!("No runs recorded yet.");
        return;
    };

    println!("Latest run:");
    println!("  Run ID: {}", run.id);
    println!("  Mode: {}", run.mode.to_db_string());
    println!("  Status: {}", run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Config hash: {}", run.config_hash);
    println!();

    println!("Tree:");
    println!(
        "  Trackers: {} ({} filled)",
        run.totals.trackers_total, run.totals.trackers_valid
    );
    println!("  Issues: {}", run.totals.issues_total);
    println!();

    if stats.failures.is_empty() {
        println!("No failures recorded.");
        return;
    }

    println!("Failures by stage:");
    for (stage, count) in stats.failures_by_stage() {
        println!("  {}: {}", stage, count);
    }
    println!();

    println!("Failures by tracker:");
    for (tracker_id, count) in stats.failures_by_tracker() {
        println!("  {}: {}", tracker_id, count);
    }
    println!();

    println!("Failed nodes:");
    for failure in &stats.failures {
        match &failure.issue_id {
            Some(issue_id) => println!(
                "  [{}] tracker {} issue {}: {}",
                failure.stage, failure.tracker_id, issue_id, failure.message
            ),
            None => println!(
                "  [{}] tracker {}: {}",
                failure.stage, failure.tracker_id, failure.message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{RunMode, RunStatus, RunTotals, SqliteStorage};

    #[test]
    fn test_empty_ledger() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let stats = load_statistics(&storage).unwrap();
        assert!(stats.run.is_none());
        assert!(stats.failures.is_empty());
    }

    #[test]
    fn test_latest_run_failures_are_grouped() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let old = storage.create_run("h", RunMode::Crawl).unwrap();
        storage
            .record_failures(
                old,
                &[CrawlFailure::new(FailureStage::Tracker, "9", None, "old")],
            )
            .unwrap();

        let run_id = storage.create_run("h", RunMode::Crawl).unwrap();
        storage
            .record_failures(
                run_id,
                &[
                    CrawlFailure::new(FailureStage::Content, "10", Some("101"), "a"),
                    CrawlFailure::new(FailureStage::Content, "12", Some("120"), "b"),
                    CrawlFailure::new(FailureStage::Children, "10", Some("100"), "c"),
                ],
            )
            .unwrap();
        storage
            .finish_run(run_id, RunStatus::Completed, RunTotals::default())
            .unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.run.as_ref().unwrap().id, run_id);
        assert_eq!(stats.failures.len(), 3);
        assert_eq!(
            stats.failures_by_stage(),
            vec![(FailureStage::Children, 1), (FailureStage::Content, 2)]
        );
        let by_tracker = stats.failures_by_tracker();
        assert_eq!(by_tracker["10"], 2);
        assert_eq!(by_tracker["12"], 1);
        assert!(!by_tracker.contains_key("9"));
    }
}
