//! Tracker-Atlas main entry point
//!
//! This is the command-line interface for the tracker structure mapper.

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracker_atlas::config::{load_config_with_hash, Config};
use tracker_atlas::output::{load_statistics, print_statistics};
use tracker_atlas::progress::{LogSink, ProgressEvent, ProgressSink};
use tracker_atlas::storage::open_storage;
use tracker_atlas::{spawn_pipeline, HttpPageExecutor, Pipeline, PipelineMode};
use tracing_subscriber::EnvFilter;

/// Tracker-Atlas: a structure mapper for requirement trackers
///
/// Tracker-Atlas crawls one root tracker of a Codebeamer-style project,
/// rebuilds its tracker and issue hierarchy, and writes a cross-reference
/// graph, a complexity map and a markdown summary.
#[derive(Parser, Debug)]
#[command(name = "tracker-atlas")]
#[command(version)]
#[command(about = "A structure mapper for requirement trackers", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Rebuild graph and outputs from the last checkpoint without crawling
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "export_summary"])]
    resume: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show the latest run from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Regenerate the markdown summary from the checkpoint and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,

    /// Crawl a single tracker, by node id or numeric tracker id
    #[arg(long, value_name = "ID", conflicts_with_all = ["resume", "stats", "export_summary"])]
    tracker: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(tracker) = cli.tracker {
        if tracker.trim().is_empty() {
            anyhow::bail!("--tracker needs a tracker id");
        }
        tracing::info!(tracker = %tracker, "Partial crawl requested");
        config.crawler.only_tracker = Some(tracker);
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_summary {
        handle_export_summary(config, config_hash)?;
    } else {
        let mode = if cli.resume {
            PipelineMode::Resume
        } else {
            PipelineMode::Crawl
        };
        handle_pipeline(config, config_hash, mode, cli.quiet).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tracker_atlas=info,warn"),
            1 => EnvFilter::new("tracker_atlas=debug,info"),
            2 => EnvFilter::new("tracker_atlas=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Progress sink drawing an indicatif bar over the 0..100 range
struct BarSink {
    bar: ProgressBar,
    log: LogSink,
}

impl BarSink {
    fn new() -> anyhow::Result<Self> {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos:>3}% {msg}")?
                .progress_chars("=>-"),
        );
        Ok(Self { bar, log: LogSink })
    }
}

impl ProgressSink for BarSink {
    fn on_event(&mut self, event: &ProgressEvent) {
        self.log.on_event(event);
        self.bar.set_position(event.percent.floor() as u64);
        let eta = event.eta.as_secs();
        let message = match &event.node_id {
            Some(node_id) => format!("{} {} (eta {}s)", event.phase, node_id, eta),
            None => format!("{} (eta {}s)", event.phase, eta),
        };
        self.bar.set_message(message);
    }
}

impl Drop for BarSink {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Tracker-Atlas Dry Run ===\n");

    println!("Site:");
    println!("  Host: {}", config.site.host);
    println!("  Project: {}", config.site.project_id);
    println!("  Root tracker: {}", config.site.root_tracker_name);
    println!("  Listing: {}", config.site.tracker_home_tree_url());
    println!("  Tracker page: {}", config.site.tracker_page_url("{id}"));
    println!("  Tree endpoint: {}", config.site.tree_ajax_url());
    println!("  Issue page: {}", config.site.issue_page_url("{id}"));
    match &config.site.tracker_icon {
        Some(icon) => println!("  Tracker icon filter: {}", icon),
        None => println!("  Tracker icon filter: none"),
    }

    println!("\nPage:");
    println!("  Tree config: {}", config.page.tree_config_expression);
    println!("  Content selector: {}", config.page.issue_content_selector);
    println!("  Wait timeout: {}s", config.page.wait_timeout);
    println!("  Poll interval: {}ms", config.page.poll_interval);

    println!("\nSession:");
    println!("  CSRF: {}", config.session.csrf);
    if config.session.csrf {
        println!("  Token expression: {}", config.session.csrf_token_expression);
    }
    println!(
        "  Cookie: {}",
        if config.session.cookie.is_some() { "set" } else { "none" }
    );

    println!("\nCrawler:");
    println!("  Throttle delay: {}ms", config.crawler.throttle_delay);
    match &config.crawler.only_tracker {
        Some(tracker) => println!("  Partial crawl: tracker {}", tracker),
        None => println!("  Partial crawl: none (every tracker)"),
    }
    match &config.complexity.marker {
        Some(marker) => println!("  Complexity marker: {}", marker),
        None => println!("  Complexity marker: none (every issue is scored)"),
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows the latest run from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("failed to open the run database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: regenerates the markdown summary
fn handle_export_summary(config: Config, config_hash: String) -> anyhow::Result<()> {
    println!("=== Exporting Summary ===\n");
    println!("Checkpoint: {}", config.output.root_checkpoint_path().display());
    println!("Output: {}", config.output.summary_path);
    println!();

    let pipeline = Pipeline::new(config, config_hash, PipelineMode::Resume);
    let path = pipeline
        .export_summary()
        .context("failed to export the summary")?;

    println!("✓ Summary exported to: {}", path.display());
    Ok(())
}

/// Handles the crawl and resume modes
async fn handle_pipeline(
    config: Config,
    config_hash: String,
    mode: PipelineMode,
    quiet: bool,
) -> anyhow::Result<()> {
    let executor = Arc::new(
        HttpPageExecutor::new(&config.session).context("failed to build the HTTP client")?,
    );
    match mode {
        PipelineMode::Crawl => tracing::info!(
            host = %config.site.host,
            root = %config.site.root_tracker_name,
            "Starting crawl"
        ),
        PipelineMode::Resume => tracing::info!("Rebuilding from checkpoint"),
    }

    let pipeline = Pipeline::new(config, config_hash, mode);
    let handle = if quiet {
        spawn_pipeline(pipeline, executor, LogSink)
    } else {
        spawn_pipeline(pipeline, executor, BarSink::new()?)
    };
    let output = handle.await.context("pipeline task aborted")??;

    println!("✓ Run {} finished", output.run_id);
    println!(
        "  Trackers: {} filled of {}",
        output.trackers.len(),
        output.root.children.len()
    );
    println!("  Graph: {}", output.graph_path.display());
    println!("  Complexity: {}", output.complexity_path.display());
    println!("  Summary: {}", output.summary_path.display());
    if !output.failures.is_empty() {
        println!(
            "  {} nodes skipped after failures, see --stats",
            output.failures.len()
        );
    }

    Ok(())
}
