//! Live execution state
//!
//! The [`ExecutionTracker`] is the single source of truth for every planned,
//! in-flight and finished execution. Entries live in a sharded map so workers
//! of different engines never contend on a shared lock; each entry has one
//! writer (the worker that claimed it) while status readers only take
//! short read guards.

use crate::benchmark::{BenchmarkId, ExecutionId};
use crate::execution::{ExecutionFailure, ExecutionMetrics, ExecutionStatus, QueryExecution};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Misuse of the tracker's state machine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    /// No execution with this id was registered
    #[error("unknown execution {0}")]
    UnknownExecution(ExecutionId),

    /// The id is already tracked
    #[error("execution {0} is already registered")]
    AlreadyRegistered(ExecutionId),

    /// The requested status change is not part of the lifecycle
    #[error("execution {id}: illegal transition from {from} to {to}")]
    IllegalTransition {
        /// Execution id
        id: ExecutionId,
        /// Current status
        from: ExecutionStatus,
        /// Requested status
        to: ExecutionStatus,
    },
}

/// Point-in-time view of one benchmark's executions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    /// Executions in registration order
    pub executions: Vec<QueryExecution>,
    /// Planned executions
    pub total: usize,
    /// Not yet dispatched
    pub pending: usize,
    /// In flight
    pub running: usize,
    /// Finished with metrics
    pub completed: usize,
    /// Finished with a failure
    pub failed: usize,
    /// (completed + failed) / total * 100, or 0 when nothing is planned
    pub progress_percent: f64,
}

impl TrackerSnapshot {
    /// Count statuses of the given executions
    pub fn from_executions(executions: Vec<QueryExecution>) -> Self {
        let mut snapshot = TrackerSnapshot {
            total: executions.len(),
            ..Default::default()
        };
        for execution in &executions {
            match execution.status {
                ExecutionStatus::Pending => snapshot.pending += 1,
                ExecutionStatus::Running => snapshot.running += 1,
                ExecutionStatus::Completed => snapshot.completed += 1,
                ExecutionStatus::Failed => snapshot.failed += 1,
            }
        }
        if snapshot.total > 0 {
            snapshot.progress_percent =
                (snapshot.completed + snapshot.failed) as f64 / snapshot.total as f64 * 100.0;
        }
        snapshot.executions = executions;
        snapshot
    }
}

/// Concurrent registry of query executions
#[derive(Debug, Default)]
pub struct ExecutionTracker {
    executions: DashMap<ExecutionId, QueryExecution>,
    by_benchmark: DashMap<BenchmarkId, Vec<ExecutionId>>,
}

impl ExecutionTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a pending execution
    pub fn register(&self, execution: QueryExecution) -> Result<(), TrackerError> {
        if execution.status != ExecutionStatus::Pending {
            return Err(TrackerError::IllegalTransition {
                id: execution.id,
                from: execution.status,
                to: ExecutionStatus::Pending,
            });
        }

        let id = execution.id;
        let benchmark_id = execution.benchmark_id;
        match self.executions.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(TrackerError::AlreadyRegistered(id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(execution);
            }
        }
        self.by_benchmark.entry(benchmark_id).or_default().push(id);
        Ok(())
    }

    /// `pending -> running`
    pub fn mark_running(&self, id: ExecutionId, start: DateTime<Utc>) -> Result<(), TrackerError> {
        self.transition(id, ExecutionStatus::Running, |execution| {
            execution.start_time = Some(start);
        })
    }

    /// `running -> completed`
    pub fn mark_completed(
        &self,
        id: ExecutionId,
        metrics: ExecutionMetrics,
        end: DateTime<Utc>,
        plan: Option<String>,
    ) -> Result<(), TrackerError> {
        self.transition(id, ExecutionStatus::Completed, |execution| {
            execution.end_time = Some(end);
            execution.metrics = Some(metrics);
            execution.query_plan = plan;
        })
    }

    /// `running -> failed`
    pub fn mark_failed(
        &self,
        id: ExecutionId,
        failure: ExecutionFailure,
        end: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        self.transition(id, ExecutionStatus::Failed, |execution| {
            execution.end_time = Some(end);
            execution.failure = Some(failure);
        })
    }

    /// Current state of one execution
    pub fn get(&self, id: ExecutionId) -> Option<QueryExecution> {
        self.executions.get(&id).map(|entry| entry.value().clone())
    }

    /// Counts, progress and execution states of a benchmark
    pub fn snapshot(&self, benchmark_id: BenchmarkId) -> TrackerSnapshot {
        TrackerSnapshot::from_executions(self.collect(benchmark_id, |_| true))
    }

    /// Executions of one engine within a benchmark, in registration order
    pub fn executions_for(&self, benchmark_id: BenchmarkId, engine: &str) -> Vec<QueryExecution> {
        self.collect(benchmark_id, |execution| execution.engine == engine)
    }

    /// Drop every execution of a benchmark, returning what was removed
    pub fn forget(&self, benchmark_id: BenchmarkId) -> Vec<QueryExecution> {
        let Some((_, ids)) = self.by_benchmark.remove(&benchmark_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.executions.remove(id).map(|(_, execution)| execution))
            .collect()
    }

    fn collect(
        &self,
        benchmark_id: BenchmarkId,
        filter: impl Fn(&QueryExecution) -> bool,
    ) -> Vec<QueryExecution> {
        // Clone the id list first so no index guard is held while reading entries.
        let ids = match self.by_benchmark.get(&benchmark_id) {
            Some(ids) => ids.value().clone(),
            None => return Vec::new(),
        };
        ids.iter()
            .filter_map(|id| self.executions.get(id))
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn transition(
        &self,
        id: ExecutionId,
        to: ExecutionStatus,
        apply: impl FnOnce(&mut QueryExecution),
    ) -> Result<(), TrackerError> {
        let mut entry = self
            .executions
            .get_mut(&id)
            .ok_or(TrackerError::UnknownExecution(id))?;

        let from = entry.status;
        let legal = matches!(
            (from, to),
            (ExecutionStatus::Pending, ExecutionStatus::Running)
                | (ExecutionStatus::Running, ExecutionStatus::Completed)
                | (ExecutionStatus::Running, ExecutionStatus::Failed)
        );
        if !legal {
            return Err(TrackerError::IllegalTransition { id, from, to });
        }

        entry.status = to;
        apply(entry.value_mut());
        Ok(())
    }
}
