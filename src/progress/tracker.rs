//! Running progress total and ETA estimation

use crate::progress::{Phase, ProgressEvent, ProgressSink, PROGRESS_COMPLETE};
use std::time::{Duration, Instant};

/// Accumulates weighted progress and forwards every change to a sink
///
/// The total only moves forward: negative or non-finite increments are
/// ignored and the sum is clamped at 100.
pub struct ProgressTracker<'a> {
    sink: &'a mut dyn ProgressSink,
    total: f64,
    phase: Phase,
    phase_started: Instant,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            sink,
            total: 0.0,
            phase: Phase::ResolveRoot,
            phase_started: Instant::now(),
        }
    }

    /// Switches to a new phase and restarts the ETA clock
    pub fn begin_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_started = Instant::now();
        self.emit(None);
    }

    /// Relabels the current work without restarting the ETA clock
    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.emit(None);
    }

    /// Adds `increment` to the running total
    pub fn advance(&mut self, increment: f64, node_id: Option<&str>) {
        if increment.is_finite() && increment > 0.0 {
            self.total = (self.total + increment).min(PROGRESS_COMPLETE);
        }
        self.emit(node_id);
    }

    /// Raises the total to at least `floor`
    ///
    /// Used at phase boundaries to absorb floating-point residue and to credit
    /// phases that had nothing to do.
    pub fn advance_to(&mut self, floor: f64) {
        if floor.is_finite() && floor > self.total {
            self.total = floor.min(PROGRESS_COMPLETE);
        }
        self.emit(None);
    }

    /// Marks the session complete at exactly 100%
    pub fn finish(&mut self) {
        self.total = PROGRESS_COMPLETE;
        self.phase = Phase::Complete;
        self.emit(None);
    }

    pub fn percent(&self) -> f64 {
        self.total
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current ETA based on time spent in the active phase
    pub fn eta(&self) -> Duration {
        estimate_eta(self.phase_started.elapsed(), self.total)
    }

    fn emit(&mut self, node_id: Option<&str>) {
        let event = ProgressEvent {
            phase: self.phase,
            percent: self.total,
            eta: self.eta(),
            node_id: node_id.map(str::to_string),
        };
        self.sink.on_event(&event);
    }
}

/// Estimates remaining time as `elapsed * (100 - progress) / progress`
///
/// Returns zero at either boundary, where the ratio is undefined or moot.
pub fn estimate_eta(elapsed: Duration, progress: f64) -> Duration {
    if !(progress > 0.0 && progress < PROGRESS_COMPLETE) {
        return Duration::ZERO;
    }
    let remaining = elapsed.as_secs_f64() * (PROGRESS_COMPLETE - progress) / progress;
    Duration::try_from_secs_f64(remaining).unwrap_or(Duration::MAX)
}
