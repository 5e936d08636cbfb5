// src/engine/tracker.rs

use std::time::Duration;

use tokio::time::Instant;

/// Bookkeeping for a single dependency edge, kept by the *waiting* unit.
///
/// A dependent may start once the dependency has completed at least once and
/// `required_interval` has elapsed since that completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionTracker {
    required_interval: Duration,
    last_completion: Option<Instant>,
}

impl CompletionTracker {
    pub fn new(required_interval: Duration) -> Self {
        Self {
            required_interval,
            last_completion: None,
        }
    }

    pub fn required_interval(&self) -> Duration {
        self.required_interval
    }

    pub fn last_completion(&self) -> Option<Instant> {
        self.last_completion
    }

    pub fn record_completion(&mut self, at: Instant) {
        self.last_completion = Some(at);
    }

    /// Forget any completion from a previous run.
    pub fn reset(&mut self) {
        self.last_completion = None;
    }

    /// Remaining quiescence time, or `None` (unbounded) while the dependency
    /// has not completed yet.
    pub fn time_to_wait(&self, now: Instant) -> Option<Duration> {
        let done = self.last_completion?;
        Some((done + self.required_interval).saturating_duration_since(now))
    }
}
