//! End-to-end pipeline: crawl or resume, build, write, record
//!
//! One pipeline invocation opens a ledger run, obtains a populated tree
//! (fresh crawl, or the JSON checkpoint in resume mode), builds the graph and
//! complexity map, writes every artifact and closes the run. It can run on a
//! background tokio task with [`spawn_pipeline`]; the only channel back to
//! the caller is the synchronous progress sink.

use crate::config::Config;
use crate::crawler::{run_crawl, CrawlFailure};
use crate::executor::PageExecutor;
use crate::graph::{build_graph, GraphBuild};
use crate::output::{build_summary, FileOutput, OutputHandler};
use crate::progress::{Phase, ProgressSink, ProgressTracker};
use crate::storage::{
    load_checkpoint, open_storage, save_checkpoint, RunMode, RunRecord, RunStatus, RunTotals,
    SqliteStorage, Storage,
};
use crate::tree::{count_issues, RootTrackerNode, TrackerNode};
use crate::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Where the pipeline takes its tree from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// Crawl the remote site and write a fresh checkpoint
    Crawl,

    /// Restore the tree from the last checkpoint without network access
    Resume,
}

impl From<PipelineMode> for RunMode {
    fn from(mode: PipelineMode) -> Self {
        match mode {
            PipelineMode::Crawl => RunMode::Crawl,
            PipelineMode::Resume => RunMode::Resume,
        }
    }
}

/// Everything one pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run_id: i64,
    pub root: RootTrackerNode,

    /// Valid trackers, with `graph_node` set by the build
    pub trackers: Vec<TrackerNode>,
    pub build: GraphBuild,
    pub failures: Vec<CrawlFailure>,

    pub graph_path: PathBuf,
    pub complexity_path: PathBuf,
    pub summary_path: PathBuf,
}

/// A configured pipeline, ready to run
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
    config_hash: String,
    mode: PipelineMode,
}

impl Pipeline {
    pub fn new(config: Config, config_hash: impl Into<String>, mode: PipelineMode) -> Self {
        Self {
            config,
            config_hash: config_hash.into(),
            mode,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    /// Runs the pipeline to completion
    ///
    /// Any error after the ledger run is opened closes it as `failed` before
    /// the error is returned. Resume mode never touches `executor`.
    ///
    /// # Arguments
    ///
    /// * `executor` - Page session used in crawl mode
    /// * `sink` - Receives every progress event, ending at 100%
    ///
    /// # Returns
    ///
    /// * `Ok(PipelineOutput)` - The tree, graph and artifact locations
    /// * `Err(AtlasError)` - Root resolution, checkpoint, storage or output failed
    pub async fn run<E: PageExecutor + ?Sized>(
        &self,
        executor: &E,
        sink: &mut dyn ProgressSink,
    ) -> Result<PipelineOutput> {
        let mut storage = open_storage(Path::new(&self.config.output.database_path))?;
        let run_id = storage.create_run(&self.config_hash, self.mode.into())?;
        tracing::info!(run_id, mode = ?self.mode, "Pipeline started");

        match self.run_recorded(run_id, &mut storage, executor, sink).await {
            Ok(output) => Ok(output),
            Err(e) => {
                tracing::error!(run_id, error = %e, "Pipeline failed");
                if let Err(close) =
                    storage.finish_run(run_id, RunStatus::Failed, RunTotals::default())
                {
                    tracing::warn!(run_id, error = %close, "Could not close failed run");
                }
                Err(e)
            }
        }
    }

    /// Body of [`Pipeline::run`] once the ledger run exists
    ///
    /// The run is marked completed only after every artifact is on disk.
    async fn run_recorded<E: PageExecutor + ?Sized>(
        &self,
        run_id: i64,
        storage: &mut SqliteStorage,
        executor: &E,
        sink: &mut dyn ProgressSink,
    ) -> Result<PipelineOutput> {
        let config = &self.config;
        let mut progress = ProgressTracker::new(sink);

        let (root, mut trackers, failures) = match self.mode {
            PipelineMode::Crawl => {
                let outcome = run_crawl(executor, config, &mut progress).await?;
                save_checkpoint(&config.output, &outcome.root, &outcome.trackers)?;
                (outcome.root, outcome.trackers, outcome.failures)
            }
            PipelineMode::Resume => {
                let checkpoint = load_checkpoint(&config.output)?;
                (checkpoint.root, checkpoint.trackers, Vec::new())
            }
        };

        progress.begin_phase(Phase::BuildGraph);
        let build = build_graph(&root, &mut trackers, config.complexity.marker.as_deref());

        let handler = FileOutput::new(&config.output);
        let graph_path = handler.write_graph(&build.graph)?;
        let complexity_path = handler.write_complexity(&build.complexity)?;

        let totals = RunTotals {
            trackers_total: root.children.len() as u64,
            trackers_valid: trackers.len() as u64,
            issues_total: trackers
                .iter()
                .map(|tracker| count_issues(&tracker.children) as u64)
                .sum(),
        };
        storage.record_failures(run_id, &failures)?;

        let run = RunRecord {
            status: RunStatus::Completed,
            finished_at: Some(Utc::now().to_rfc3339()),
            totals,
            ..storage.get_run(run_id)?
        };
        let summary = build_summary(
            &self.config_hash,
            &root,
            &trackers,
            &build,
            &failures,
            Some(&run),
        );
        let summary_path = handler.write_summary(&summary)?;

        storage.finish_run(run_id, RunStatus::Completed, totals)?;
        progress.finish();
        tracing::info!(
            run_id,
            trackers = trackers.len(),
            issues = totals.issues_total,
            failures = failures.len(),
            "Pipeline finished"
        );

        Ok(PipelineOutput {
            run_id,
            root,
            trackers,
            build,
            failures,
            graph_path,
            complexity_path,
            summary_path,
        })
    }

    /// Regenerates the markdown summary from the checkpoint
    ///
    /// Run metadata and failures come from the latest ledger run when the
    /// database exists. Nothing is recorded and no JSON artifact is rewritten.
    pub fn export_summary(&self) -> Result<PathBuf> {
        let config = &self.config;
        let checkpoint = load_checkpoint(&config.output)?;
        let (root, mut trackers) = (checkpoint.root, checkpoint.trackers);
        let build = build_graph(&root, &mut trackers, config.complexity.marker.as_deref());

        let database = Path::new(&config.output.database_path);
        let (run, failures) = if database.exists() {
            let storage = open_storage(database)?;
            match storage.get_latest_run()? {
                Some(run) => {
                    let failures = storage.failures_for_run(run.id)?;
                    (Some(run), failures)
                }
                None => (None, Vec::new()),
            }
        } else {
            (None, Vec::new())
        };

        let summary = build_summary(
            &self.config_hash,
            &root,
            &trackers,
            &build,
            &failures,
            run.as_ref(),
        );
        Ok(FileOutput::new(&config.output).write_summary(&summary)?)
    }
}

/// Runs a pipeline on a background tokio task
///
/// # Arguments
///
/// * `pipeline` - The configured pipeline
/// * `executor` - Shared page session
/// * `sink` - Progress receiver, moved onto the task
pub fn spawn_pipeline<E, S>(
    pipeline: Pipeline,
    executor: Arc<E>,
    mut sink: S,
) -> JoinHandle<Result<PipelineOutput>>
where
    E: PageExecutor + 'static,
    S: ProgressSink + 'static,
{
    tokio::spawn(async move { pipeline.run(executor.as_ref(), &mut sink).await })
}
