//! Worker statistics tracking

use crate::execution::FailureKind;
use std::time::{Duration, Instant};

/// Counts kept by each worker (and merged per engine pool)
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Executions that completed with metrics
    pub completed: usize,

    /// Executions the engine rejected or failed
    pub failed: usize,

    /// Executions that hit the per-query timeout
    pub timed_out: usize,

    /// Executions cancelled while in flight
    pub cancelled: usize,

    /// Sum of client-measured elapsed time of completed executions
    pub busy: Duration,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Executions that reached a terminal state
    pub fn total(&self) -> usize {
        self.completed + self.failures()
    }

    /// All failed executions regardless of kind
    pub fn failures(&self) -> usize {
        self.failed + self.timed_out + self.cancelled
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Record a completed execution
    pub fn record_completed(&mut self, elapsed: Duration) {
        self.completed += 1;
        self.busy += elapsed;
    }

    /// Record a failed execution
    pub fn record_failure(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::ExecutionFailure => self.failed += 1,
            FailureKind::Timeout => self.timed_out += 1,
            FailureKind::Cancelled => self.cancelled += 1,
        }
    }

    /// Merge stats from another worker
    ///
    /// The merged window spans the earliest start and the latest end.
    pub fn merge(&mut self, other: &WorkerStats) {
        self.completed += other.completed;
        self.failed += other.failed;
        self.timed_out += other.timed_out;
        self.cancelled += other.cancelled;
        self.busy += other.busy;
        self.started_at = match (self.started_at, other.started_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.ended_at = match (self.ended_at, other.ended_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}
