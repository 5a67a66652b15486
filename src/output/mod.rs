//! Output module for the artifacts of a graph build
//!
//! This module handles:
//! - Writing `graph.json` and `complexity.json`
//! - Rendering the markdown run summary
//! - Printing ledger statistics

mod json;
mod markdown;
pub mod stats;
mod traits;

pub use json::{write_complexity_json, write_graph_json, FileOutput};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, LedgerStatistics};
pub use traits::{OutputError, OutputHandler, OutputResult, RankedIssue, RunSummary, TrackerRow};

use crate::crawler::CrawlFailure;
use crate::graph::{EdgeKind, GraphBuild};
use crate::storage::RunRecord;
use crate::tree::{count_issues, RootTrackerNode, TrackerNode};
use chrono::{DateTime, Utc};

fn duration_seconds(run: &RunRecord) -> Option<u64> {
    let started = run.started_at.parse::<DateTime<Utc>>().ok()?;
    let finished = run.finished_at.as_ref()?.parse::<DateTime<Utc>>().ok()?;
    u64::try_from((finished - started).num_seconds()).ok()
}

/// Collects a run summary from a graph build and its tree
///
/// # Arguments
///
/// * `config_hash` - Hash of the configuration the run used
/// * `root` - The crawl root, listing every tracker
/// * `trackers` - Trackers whose fill succeeded
/// * `build` - Graph and complexity derived from `trackers`
/// * `failures` - Failures absorbed by the crawl
/// * `run` - Ledger entry of the run, when one was recorded
pub fn build_summary(
    config_hash: &str,
    root: &RootTrackerNode,
    trackers: &[TrackerNode],
    build: &GraphBuild,
    failures: &[CrawlFailure],
    run: Option<&RunRecord>,
) -> RunSummary {
    let rows = root
        .children
        .iter()
        .map(|tracker| {
            let filled = trackers.iter().find(|valid| valid.info.id == tracker.info.id);
            TrackerRow {
                id: tracker.info.id.clone(),
                tracker_id: tracker.info.tracker_id,
                name: tracker.info.text.clone(),
                issues: filled.map_or(0, |valid| count_issues(&valid.children)),
                filled: filled.is_some(),
            }
        })
        .collect();

    let mut ranking: Vec<RankedIssue> = build
        .complexity
        .iter()
        .map(|(id, &score)| RankedIssue {
            id: id.clone(),
            label: build
                .graph
                .node(id)
                .map_or_else(|| id.clone(), |node| node.label.clone()),
            score,
        })
        .collect();
    ranking.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));

    RunSummary {
        run_id: run.map(|r| r.id),
        mode: run.map(|r| r.mode.to_db_string().to_string()),
        status: run.map(|r| r.status.to_db_string().to_string()),
        started_at: run.map(|r| r.started_at.clone()),
        finished_at: run.and_then(|r| r.finished_at.clone()),
        duration_seconds: run.and_then(duration_seconds),
        config_hash: config_hash.to_string(),
        root_name: root.info.text.clone(),
        trackers: rows,
        issues_total: trackers.iter().map(|t| count_issues(&t.children)).sum(),
        graph_nodes: build.graph.nodes().len(),
        structural_edges: build.graph.edges_of_kind(EdgeKind::Structural).count(),
        reference_edges: build.graph.edges_of_kind(EdgeKind::Reference).count(),
        ranking,
        failures: failures.to_vec(),
    }
}
