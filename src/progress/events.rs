//! Progress event types and sinks

use std::fmt;
use std::time::Duration;

/// Pipeline step a progress event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Fetching the top-level listing and selecting the root tracker
    ResolveRoot,

    /// Filling each child tracker with its direct issues
    FillTrackers,

    /// Recursively resolving issue children
    FindIssues,

    /// Loading detail-page content for every issue
    FillContent,

    /// Building the graph and complexity map
    BuildGraph,

    /// Everything finished
    Complete,
}

impl Phase {
    /// Short name used in logs and the CLI progress bar
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResolveRoot => "resolve-root",
            Self::FillTrackers => "fill-trackers",
            Self::FindIssues => "find-issues",
            Self::FillContent => "fill-content",
            Self::BuildGraph => "build-graph",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single progress update
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub phase: Phase,

    /// Running percentage in `[0, 100]`
    pub percent: f64,

    /// Estimated time remaining; zero when no estimate is possible
    pub eta: Duration,

    /// Node that triggered the update, if any
    pub node_id: Option<String>,
}

/// Receiver of progress events
///
/// Called synchronously, in traversal order, from the task running the
/// crawl. Implementations that feed a UI are responsible for marshalling the
/// event onto their own thread.
pub trait ProgressSink: Send {
    fn on_event(&mut self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressEvent) + Send,
{
    fn on_event(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_event(&mut self, _event: &ProgressEvent) {}
}

/// Sink that writes events to the tracing log at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_event(&mut self, event: &ProgressEvent) {
        tracing::debug!(
            phase = %event.phase,
            node_id = event.node_id.as_deref().unwrap_or("-"),
            eta_secs = event.eta.as_secs(),
            "progress {:.2}%",
            event.percent
        );
    }
}
