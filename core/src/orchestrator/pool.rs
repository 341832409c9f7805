//! Per-engine worker pool

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::aggregator::ResultAggregator;
use crate::benchmark::{BenchmarkId, TableFormat};
use crate::config::ResolvedPool;
use crate::error::{BenchError, BenchResult};
use crate::metrics::MetricsSink;
use crate::result::BenchmarkResult;
use crate::tracker::ExecutionTracker;
use crate::traits::{BenchmarkRepository, EngineClient};
use crate::worker::{EngineRateLimiter, PlannedExecution, WorkerBuilder, WorkerStats};

/// Collaborators shared by every pool of a run
#[derive(Clone)]
pub(crate) struct PoolContext {
    pub benchmark_id: BenchmarkId,
    pub table_format: TableFormat,
    pub tracker: Arc<ExecutionTracker>,
    pub aggregator: Arc<ResultAggregator>,
    pub repository: Arc<dyn BenchmarkRepository>,
    pub metrics: Arc<dyn MetricsSink>,
    pub capture_plans: bool,
}

/// What a drained pool produced
#[derive(Debug)]
pub(crate) struct PoolOutcome {
    pub engine: String,
    pub stats: WorkerStats,
    /// Saved result, absent when no execution reached a terminal state
    pub result: Option<BenchmarkResult>,
}

/// Bounded set of workers dispatching one engine's plan
pub(crate) struct EnginePool {
    engine: String,
    client: Arc<dyn EngineClient>,
    work: Arc<[PlannedExecution]>,
    settings: ResolvedPool,
}

impl EnginePool {
    pub fn new(
        engine: String,
        client: Arc<dyn EngineClient>,
        work: Arc<[PlannedExecution]>,
        settings: ResolvedPool,
    ) -> Self {
        Self {
            engine,
            client,
            work,
            settings,
        }
    }

    pub fn engine_name(&self) -> &str {
        &self.engine
    }

    /// Drain the plan, then aggregate and persist this engine's result
    ///
    /// A worker fault cancels the remaining workers of this pool and is
    /// returned as an orchestration error; per-query failures are not faults.
    pub async fn run(self, ctx: PoolContext, cancel: CancellationToken) -> BenchResult<PoolOutcome> {
        let worker_count = self.settings.concurrency.min(self.work.len());
        let cursor = Arc::new(AtomicUsize::new(0));
        let limiter = Arc::new(EngineRateLimiter::new(self.settings.rate_limit));
        let pool_cancel = cancel.child_token();

        tracing::info!(
            benchmark_id = %ctx.benchmark_id,
            engine = %self.engine,
            planned = self.work.len(),
            workers = worker_count,
            query_timeout_ms = self.settings.query_timeout.as_millis() as u64,
            rate_limit = ?limiter.queries_per_second(),
            "Starting engine pool"
        );

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let worker = WorkerBuilder::new(worker_id)
                .client(Arc::clone(&self.client))
                .tracker(Arc::clone(&ctx.tracker))
                .metrics(Arc::clone(&ctx.metrics))
                .work(Arc::clone(&self.work), Arc::clone(&cursor))
                .rate_limiter(Arc::clone(&limiter))
                .query_timeout(self.settings.query_timeout)
                .capture_plans(ctx.capture_plans)
                .build()?;
            let token = pool_cancel.clone();
            handles.push(tokio::spawn(async move { worker.run(token).await }));
        }

        let mut stats = WorkerStats::new();
        let mut fault: Option<BenchError> = None;
        for (idx, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(worker_stats)) => {
                    tracing::debug!(
                        engine = %self.engine,
                        worker_id = idx,
                        completed = worker_stats.completed,
                        failed = worker_stats.failures(),
                        "Worker completed"
                    );
                    stats.merge(&worker_stats);
                }
                Ok(Err(e)) => {
                    tracing::error!(engine = %self.engine, worker_id = idx, error = %e, "Worker returned error");
                    pool_cancel.cancel();
                    fault.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!(engine = %self.engine, worker_id = idx, error = %e, "Worker task panicked");
                    pool_cancel.cancel();
                    fault.get_or_insert(BenchError::orchestration(format!(
                        "worker {idx} of engine '{}' panicked: {e}",
                        self.engine
                    )));
                }
            }
        }
        if let Some(e) = fault {
            return Err(e);
        }

        let terminal: Vec<_> = ctx
            .tracker
            .executions_for(ctx.benchmark_id, &self.engine)
            .into_iter()
            .filter(|e| e.is_terminal())
            .collect();

        let result = if terminal.is_empty() {
            tracing::info!(
                benchmark_id = %ctx.benchmark_id,
                engine = %self.engine,
                "No terminal executions, skipping result"
            );
            None
        } else {
            let mut result = ctx.aggregator.aggregate(
                ctx.benchmark_id,
                &self.engine,
                ctx.table_format,
                &terminal,
            )?;
            let id = ctx.repository.save_result(result.clone()).await?;
            result.id = Some(id);
            tracing::info!(
                benchmark_id = %ctx.benchmark_id,
                engine = %self.engine,
                result_id = %id,
                successful = result.successful_queries,
                failed = result.failed_queries,
                avg_ms = result.avg_execution_time_ms,
                throughput = result.throughput,
                "Engine result saved"
            );
            Some(result)
        };

        Ok(PoolOutcome {
            engine: self.engine,
            stats,
            result,
        })
    }
}
