//! JSON artifact files and the file-backed output handler

use crate::config::OutputConfig;
use crate::graph::{ComplexityMap, Graph};
use crate::output::markdown::generate_markdown_summary;
use crate::output::traits::{OutputError, OutputHandler, OutputResult, RunSummary};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

fn ensure_parent(path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| OutputError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> OutputResult<()> {
    ensure_parent(path)?;
    fs::write(path, content).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> OutputResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_file(path, &json)
}

/// Writes `graph.json`
pub fn write_graph_json(path: &Path, graph: &Graph) -> OutputResult<()> {
    write_pretty(path, graph)
}

/// Writes `complexity.json` with ids in sorted order
pub fn write_complexity_json(path: &Path, complexity: &ComplexityMap) -> OutputResult<()> {
    write_pretty(path, complexity)
}

/// Output handler writing to the locations named in `[output]`
pub struct FileOutput {
    graph_path: PathBuf,
    complexity_path: PathBuf,
    summary_path: PathBuf,
}

impl FileOutput {
    pub fn new(output: &OutputConfig) -> Self {
        Self {
            graph_path: output.graph_path(),
            complexity_path: output.complexity_path(),
            summary_path: PathBuf::from(&output.summary_path),
        }
    }
}

impl OutputHandler for FileOutput {
    fn write_graph(&self, graph: &Graph) -> OutputResult<PathBuf> {
        write_graph_json(&self.graph_path, graph)?;
        tracing::info!(path = %self.graph_path.display(), "Graph written");
        Ok(self.graph_path.clone())
    }

    fn write_complexity(&self, complexity: &ComplexityMap) -> OutputResult<PathBuf> {
        write_complexity_json(&self.complexity_path, complexity)?;
        tracing::info!(path = %self.complexity_path.display(), "Complexity map written");
        Ok(self.complexity_path.clone())
    }

    fn write_summary(&self, summary: &RunSummary) -> OutputResult<PathBuf> {
        ensure_parent(&self.summary_path)?;
        generate_markdown_summary(summary, &self.summary_path)?;
        tracing::info!(path = %self.summary_path.display(), "Summary written");
        Ok(self.summary_path.clone())
    }
}
