//! Markdown summary generation
//!
//! This module renders a human-readable summary of one run: run metadata,
//! the tracker table, the complexity ranking and the absorbed failures.

use crate::output::traits::{OutputResult, RunSummary};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Entries shown in the complexity ranking
const RANKING_LIMIT: usize = 20;

/// Writes a markdown summary to `output_path`
///
/// # Arguments
///
/// * `summary` - The run summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

// Table cells cannot carry pipes or line breaks.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Tracker Atlas Summary\n\n");

    md.push_str("## Run Information\n\n");
    match summary.run_id {
        Some(id) => md.push_str(&format!("- **Run ID**: {}\n", id)),
        None => md.push_str("- **Run ID**: not recorded\n"),
    }
    if let Some(mode) = &summary.mode {
        md.push_str(&format!("- **Mode**: {}\n", mode));
    }
    if let Some(status) = &summary.status {
        md.push_str(&format!("- **Status**: {}\n", status));
    }
    if let Some(started) = &summary.started_at {
        md.push_str(&format!("- **Started**: {}\n", started));
    }
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    md.push_str("## Overview\n\n");
    md.push_str(&format!("- **Root Tracker**: {}\n", summary.root_name));
    md.push_str(&format!(
        "- **Trackers**: {} ({} filled)\n",
        summary.trackers.len(),
        summary.trackers_valid()
    ));
    md.push_str(&format!("- **Issues**: {}\n", summary.issues_total));
    md.push_str(&format!("- **Graph Nodes**: {}\n", summary.graph_nodes));
    md.push_str(&format!(
        "- **Structural Edges**: {}\n",
        summary.structural_edges
    ));
    md.push_str(&format!(
        "- **Reference Edges**: {}\n",
        summary.reference_edges
    ));
    md.push_str(&format!(
        "- **Cross-References**: {}\n\n",
        summary.total_references()
    ));

    if !summary.trackers.is_empty() {
        md.push_str("## Trackers\n\n");
        md.push_str("| Id | Tracker Id | Name | Issues | Filled |\n");
        md.push_str("|----|------------|------|--------|--------|\n");
        for row in &summary.trackers {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                cell(&row.id),
                row.tracker_id,
                cell(&row.name),
                row.issues,
                if row.filled { "yes" } else { "no" }
            ));
        }
        md.push('\n');
    }

    if !summary.ranking.is_empty() {
        md.push_str(&format!("## Top {} by Complexity\n\n", RANKING_LIMIT));
        md.push_str("| Rank | Issue | Score |\n");
        md.push_str("|------|-------|-------|\n");
        for (rank, entry) in summary.ranking.iter().take(RANKING_LIMIT).enumerate() {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                rank + 1,
                cell(&entry.label),
                entry.score
            ));
        }
        if summary.ranking.len() > RANKING_LIMIT {
            md.push_str(&format!(
                "\n... and {} more\n",
                summary.ranking.len() - RANKING_LIMIT
            ));
        }
        md.push('\n');
    }

    if !summary.failures.is_empty() {
        md.push_str("## Failures\n\n");
        md.push_str(&format!("Total: {}\n\n", summary.failures.len()));
        md.push_str("| Stage | Tracker | Issue | Message |\n");
        md.push_str("|-------|---------|-------|---------|\n");
        for failure in &summary.failures {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                failure.stage,
                cell(&failure.tracker_id),
                failure.issue_id.as_deref().map(cell).unwrap_or_default(),
                cell(&failure.message)
            ));
        }
        md.push('\n');
    }

    md
}
