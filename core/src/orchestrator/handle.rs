//! Run handles and reports returned to callers

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::benchmark::{BenchmarkId, BenchmarkStatus};
use crate::error::{BenchError, BenchResult};
use crate::execution::QueryExecution;
use crate::result::BenchmarkResult;

/// Accepted run, returned by [`Orchestrator::run`](super::Orchestrator::run)
///
/// Dropping the handle does not stop the run.
#[derive(Debug)]
pub struct RunHandle {
    pub(crate) benchmark_id: BenchmarkId,
    pub(crate) planned: usize,
    pub(crate) engines: Vec<String>,
    pub(crate) unavailable: Vec<String>,
    pub(crate) cancel: CancellationToken,
    pub(crate) task: JoinHandle<BenchResult<RunSummary>>,
}

impl RunHandle {
    /// Benchmark being run
    pub fn benchmark_id(&self) -> BenchmarkId {
        self.benchmark_id
    }

    /// Executions created for this run
    pub fn planned_executions(&self) -> usize {
        self.planned
    }

    /// Engines that passed pre-flight
    pub fn engines(&self) -> &[String] {
        &self.engines
    }

    /// Engines excluded by pre-flight
    pub fn unavailable_engines(&self) -> &[String] {
        &self.unavailable
    }

    /// Request cancellation of the run
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this run (e.g. for a Ctrl+C handler)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the run has finished
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to reach a terminal benchmark status
    pub async fn wait(self) -> BenchResult<RunSummary> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(BenchError::orchestration(format!(
                "run task for benchmark {} failed: {e}",
                self.benchmark_id
            ))),
        }
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Benchmark that ran
    pub benchmark_id: BenchmarkId,
    /// Final benchmark status
    pub status: BenchmarkStatus,
    /// Results saved by this run, in engine selection order
    pub results: Vec<BenchmarkResult>,
    /// Engines excluded by pre-flight
    pub unavailable_engines: Vec<String>,
    /// Executions planned
    pub planned: usize,
    /// Executions that completed
    pub completed: usize,
    /// Executions that failed
    pub failed: usize,
    /// Executions never dispatched because the run was cancelled
    pub never_dispatched: usize,
    /// Whether the run was cancelled
    pub cancelled: bool,
    /// Wall-clock duration of the dispatch phase
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

/// Answer to [`Orchestrator::get_status`](super::Orchestrator::get_status)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkStatusReport {
    /// Benchmark id
    pub benchmark_id: BenchmarkId,
    /// Current benchmark status
    pub status: BenchmarkStatus,
    /// (completed + failed) / total * 100
    pub progress_percent: f64,
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
    /// Per-execution state
    pub executions: Vec<QueryExecution>,
}
