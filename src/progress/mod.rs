//! Progress and ETA accounting for a crawl session
//!
//! The crawl reports a single running percentage composed of two weighted
//! phases: tracker discovery, then issue discovery plus content. Every change
//! is delivered as a typed [`ProgressEvent`] to a registered [`ProgressSink`].
//!
//! Progress is telemetry only. Nothing in the crawl reads it back to make a
//! decision.

mod events;
mod tracker;

pub use events::{LogSink, NullSink, Phase, ProgressEvent, ProgressSink};
pub use tracker::{estimate_eta, ProgressTracker};

/// Share of the total reserved for filling the root's child trackers
pub const TRACKER_DISCOVERY_WEIGHT: f64 = 30.0;

/// Share of the total reserved for issue discovery and content filling
pub const ISSUE_DISCOVERY_WEIGHT: f64 = 70.0;

/// Upper bound of the running percentage
pub const PROGRESS_COMPLETE: f64 = 100.0;
