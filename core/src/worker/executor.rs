//! Worker execution loop

use crate::error::BenchResult;
use crate::execution::{ExecutionFailure, FailureKind};
use crate::metrics::{Counter, MetricsSink};
use crate::tracker::ExecutionTracker;
use crate::traits::{EngineClient, EngineError};

use super::rate_limiter::EngineRateLimiter;
use super::stats::WorkerStats;
use super::PlannedExecution;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Worker claims planned executions and drives them through the tracker
///
/// Workers are tokio tasks owned by an engine pool. They share the engine
/// client, the plan, the claim cursor and the rate limiter via `Arc`.
pub struct EngineWorker {
    /// Worker index within its pool
    id: usize,

    /// Engine client (shared across the pool)
    client: Arc<dyn EngineClient>,

    /// Execution tracker (shared across all pools)
    tracker: Arc<ExecutionTracker>,

    /// Counter and latency sink
    metrics: Arc<dyn MetricsSink>,

    /// The engine's planned executions
    work: Arc<[PlannedExecution]>,

    /// Next unclaimed index into `work`
    cursor: Arc<AtomicUsize>,

    /// Engine-wide rate limiter
    rate_limiter: Arc<EngineRateLimiter>,

    /// Per-query time budget
    query_timeout: Duration,

    /// Capture EXPLAIN output after successful executions
    capture_plans: bool,
}

/// Outcome of one dispatched execution
enum Outcome {
    Completed(Duration),
    Failed(FailureKind),
}

impl EngineWorker {
    /// Create a new worker
    ///
    /// Use [`WorkerBuilder`](super::WorkerBuilder) for a more ergonomic construction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        client: Arc<dyn EngineClient>,
        tracker: Arc<ExecutionTracker>,
        metrics: Arc<dyn MetricsSink>,
        work: Arc<[PlannedExecution]>,
        cursor: Arc<AtomicUsize>,
        rate_limiter: Arc<EngineRateLimiter>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            id,
            client,
            tracker,
            metrics,
            work,
            cursor,
            rate_limiter,
            query_timeout,
            capture_plans: false,
        }
    }

    /// Capture query plans for successful executions
    pub fn with_capture_plans(mut self, capture: bool) -> Self {
        self.capture_plans = capture;
        self
    }

    /// Run the worker loop until the plan is drained or `cancel` fires
    ///
    /// Per-query failures are recorded on the execution and counted in the
    /// returned stats. Only tracker faults end the loop with an error.
    pub async fn run(self, cancel: CancellationToken) -> BenchResult<WorkerStats> {
        let mut stats = WorkerStats::new();
        stats.start();

        tracing::debug!(
            worker_id = self.id,
            engine = self.client.engine_name(),
            "Worker started"
        );

        loop {
            // Unclaimed executions stay pending once the run is cancelled
            if cancel.is_cancelled() {
                tracing::debug!(worker_id = self.id, "Worker observed cancellation");
                break;
            }

            let Some(item) = self.try_claim() else {
                tracing::debug!(
                    worker_id = self.id,
                    "No more executions to claim, worker stopping"
                );
                break;
            };

            if !self.rate_limiter.acquire(&cancel).await {
                break;
            }

            match self.execute_one(item, &cancel).await? {
                Outcome::Completed(elapsed) => stats.record_completed(elapsed),
                Outcome::Failed(kind) => stats.record_failure(kind),
            }
        }

        stats.stop();
        tracing::debug!(
            worker_id = self.id,
            engine = self.client.engine_name(),
            completed = stats.completed,
            failed = stats.failures(),
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Worker finished"
        );

        Ok(stats)
    }

    /// Dispatch one claimed execution
    async fn execute_one(
        &self,
        item: &PlannedExecution,
        cancel: &CancellationToken,
    ) -> BenchResult<Outcome> {
        let engine = self.client.engine_name();
        self.tracker
            .mark_running(item.execution_id, chrono::Utc::now())?;

        let result = tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(EngineError::Cancelled),

            result = tokio::time::timeout(
                self.query_timeout,
                self.client.execute(&item.sql, cancel),
            ) => match result {
                Ok(result) => result,
                Err(_) => Err(EngineError::Timeout(self.query_timeout)),
            },
        };
        let end = chrono::Utc::now();

        match result {
            Ok(metrics) => {
                let plan = self.capture_plan(item, cancel).await;
                let elapsed = Duration::from_millis(metrics.elapsed_ms);
                tracing::debug!(
                    engine,
                    execution_id = %item.execution_id,
                    query = %item.query_name,
                    elapsed_ms = metrics.elapsed_ms,
                    rows = ?metrics.rows_processed,
                    "Execution completed"
                );
                self.tracker
                    .mark_completed(item.execution_id, metrics, end, plan)?;
                self.metrics.increment(Counter::ExecutionsCompleted, Some(engine));
                self.metrics.observe_latency(engine, elapsed);
                Ok(Outcome::Completed(elapsed))
            }
            Err(e) => {
                let kind = e.failure_kind();
                if kind == FailureKind::Cancelled {
                    tracing::debug!(
                        engine,
                        execution_id = %item.execution_id,
                        "Execution cancelled"
                    );
                } else {
                    tracing::warn!(
                        engine,
                        execution_id = %item.execution_id,
                        query = %item.query_name,
                        error = %e,
                        "Execution failed"
                    );
                }
                self.tracker.mark_failed(
                    item.execution_id,
                    ExecutionFailure::new(kind, e.to_string()),
                    end,
                )?;
                self.metrics.increment(Counter::ExecutionsFailed, Some(engine));
                Ok(Outcome::Failed(kind))
            }
        }
    }

    /// Fetch the plan if enabled; failures only warn
    async fn capture_plan(
        &self,
        item: &PlannedExecution,
        cancel: &CancellationToken,
    ) -> Option<String> {
        if !self.capture_plans || cancel.is_cancelled() {
            return None;
        }
        let explain = tokio::time::timeout(self.query_timeout, self.client.explain(&item.sql, cancel));
        match explain.await {
            Ok(Ok(plan)) => Some(plan),
            Ok(Err(e)) => {
                tracing::warn!(
                    engine = self.client.engine_name(),
                    execution_id = %item.execution_id,
                    error = %e,
                    "Plan capture failed"
                );
                None
            }
            Err(_) => {
                tracing::warn!(
                    engine = self.client.engine_name(),
                    execution_id = %item.execution_id,
                    "Plan capture timed out"
                );
                None
            }
        }
    }

    /// Claim the next planned execution from the shared cursor
    fn try_claim(&self) -> Option<&PlannedExecution> {
        let claimed = self.cursor.fetch_add(1, Ordering::SeqCst);
        if claimed >= self.work.len() {
            // Over-claimed near the end; undo so the cursor still reports
            // how many items were handed out.
            self.cursor.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        self.work.get(claimed)
    }
}

impl std::fmt::Debug for EngineWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineWorker")
            .field("id", &self.id)
            .field("engine", &self.client.engine_name())
            .field("planned", &self.work.len())
            .field("rate_limiter", &self.rate_limiter)
            .field("query_timeout", &self.query_timeout)
            .field("capture_plans", &self.capture_plans)
            .finish()
    }
}
