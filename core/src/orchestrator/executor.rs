//! Orchestrator execution logic

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::aggregator::ResultAggregator;
use crate::benchmark::{Benchmark, BenchmarkId, BenchmarkStatus};
use crate::config::OrchestratorConfig;
use crate::error::{BenchError, BenchResult};
use crate::metrics::{Counter, MetricsSink};
use crate::result::BenchmarkResult;
use crate::tracker::{ExecutionTracker, TrackerSnapshot};
use crate::traits::{BenchmarkRepository, EngineClient};

use super::handle::{BenchmarkStatusReport, RunHandle, RunSummary};
use super::plan::ExecutionPlan;
use super::pool::{EnginePool, PoolContext, PoolOutcome};
use super::preflight::check_engines;

/// Orchestrator owns the benchmark lifecycle
///
/// Responsible for pre-flight checks, planning, spawning one worker pool per
/// engine, aggregating results and moving the benchmark through
/// `created -> running -> {completed, failed}`. Cheap to clone; clones share
/// all state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) repository: Arc<dyn BenchmarkRepository>,
    pub(crate) clients: HashMap<String, Arc<dyn EngineClient>>,
    pub(crate) tracker: Arc<ExecutionTracker>,
    pub(crate) aggregator: Arc<ResultAggregator>,
    pub(crate) metrics: Arc<dyn MetricsSink>,
    pub(crate) config: OrchestratorConfig,
    /// Cancellation tokens of runs in flight
    pub(crate) active: Mutex<HashMap<BenchmarkId, CancellationToken>>,
    pub(crate) next_execution_id: AtomicU64,
}

impl Orchestrator {
    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Get the orchestrator configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Names of the registered engine clients
    pub fn engine_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.clients.keys().cloned().collect();
        names.sort();
        names
    }

    /// Shared execution tracker
    pub fn tracker(&self) -> Arc<ExecutionTracker> {
        Arc::clone(&self.inner.tracker)
    }

    /// Accept a benchmark run
    ///
    /// Returns once pre-flight passed, the plan is registered and the
    /// benchmark is `running`; dispatch continues in the background.
    ///
    /// # Errors
    /// - `NotFound` for an unknown benchmark
    /// - `InvalidState` if the benchmark is not `created` or is already running
    /// - `EngineUnavailable` if no selected engine passes pre-flight (or any
    ///   fails while `require_all_engines` is set); the benchmark is `failed`
    pub async fn run(&self, benchmark_id: BenchmarkId) -> BenchResult<RunHandle> {
        let benchmark = self
            .inner
            .repository
            .load_benchmark_with_queries(benchmark_id)
            .await?;

        if benchmark.status != BenchmarkStatus::Created {
            return Err(BenchError::invalid_state(format!(
                "benchmark {benchmark_id} is {}, only created benchmarks can run",
                benchmark.status
            )));
        }

        let cancel = CancellationToken::new();
        {
            let mut active = self.lock_active();
            if active.contains_key(&benchmark_id) {
                return Err(BenchError::invalid_state(format!(
                    "benchmark {benchmark_id} is already running"
                )));
            }
            active.insert(benchmark_id, cancel.clone());
        }

        let accepted = self.start(benchmark, cancel).await;
        if accepted.is_err() {
            self.release(benchmark_id);
        }
        accepted
    }

    /// Run a benchmark and wait for it to finish
    pub async fn run_to_completion(&self, benchmark_id: BenchmarkId) -> BenchResult<RunSummary> {
        self.run(benchmark_id).await?.wait().await
    }

    /// Progress, counts and execution states of a benchmark
    ///
    /// Reads the tracker for runs in flight and the repository otherwise;
    /// never blocks dispatch.
    pub async fn get_status(&self, benchmark_id: BenchmarkId) -> BenchResult<BenchmarkStatusReport> {
        let benchmark = self
            .inner
            .repository
            .load_benchmark_with_queries(benchmark_id)
            .await?;

        // The tracker is read first: a run that finishes in between has
        // already persisted its executions before forgetting them.
        let mut snapshot = self.inner.tracker.snapshot(benchmark_id);
        if snapshot.total == 0 {
            let executions = self.inner.repository.list_executions(benchmark_id).await?;
            snapshot = TrackerSnapshot::from_executions(executions);
        }

        let progress_percent = if benchmark.status.is_terminal() && snapshot.total == 0 {
            100.0
        } else {
            snapshot.progress_percent
        };

        Ok(BenchmarkStatusReport {
            benchmark_id,
            status: benchmark.status,
            progress_percent,
            total: snapshot.total,
            pending: snapshot.pending,
            running: snapshot.running,
            completed: snapshot.completed,
            failed: snapshot.failed,
            executions: snapshot.executions,
        })
    }

    /// Results saved so far (partial while the run is in flight)
    pub async fn get_results(&self, benchmark_id: BenchmarkId) -> BenchResult<Vec<BenchmarkResult>> {
        self.inner
            .repository
            .load_benchmark_with_queries(benchmark_id)
            .await?;
        Ok(self.inner.repository.list_results(benchmark_id).await?)
    }

    /// Cancel a run in flight
    ///
    /// In-flight executions fail as cancelled, unclaimed ones stay pending,
    /// and engines with terminal executions still get a result.
    pub async fn cancel(&self, benchmark_id: BenchmarkId) -> BenchResult<()> {
        let token = self.lock_active().get(&benchmark_id).cloned();
        if let Some(token) = token {
            tracing::info!(benchmark_id = %benchmark_id, "Cancelling benchmark run");
            token.cancel();
            return Ok(());
        }

        let benchmark = self
            .inner
            .repository
            .load_benchmark_with_queries(benchmark_id)
            .await?;
        Err(BenchError::invalid_state(format!(
            "benchmark {benchmark_id} is {} and has no run in flight",
            benchmark.status
        )))
    }

    /// Cancel every run in flight and close all engine clients
    pub async fn shutdown(&self) {
        let tokens: Vec<CancellationToken> = self.lock_active().values().cloned().collect();
        if !tokens.is_empty() {
            tracing::info!(runs = tokens.len(), "Cancelling active runs for shutdown");
        }
        for token in tokens {
            token.cancel();
        }
        for (name, client) in &self.inner.clients {
            tracing::debug!(engine = %name, "Closing engine client");
            client.close().await;
        }
    }

    /// Pre-flight, plan, register and spawn the dispatch task
    async fn start(&self, benchmark: Benchmark, cancel: CancellationToken) -> BenchResult<RunHandle> {
        let benchmark_id = benchmark.id;
        let config = &self.inner.config;
        let selected: Vec<String> = benchmark
            .selected_engines()
            .into_iter()
            .map(str::to_string)
            .collect();

        if selected.is_empty() {
            self.mark_failed(benchmark_id).await;
            return Err(BenchError::engine_unavailable(format!(
                "benchmark {benchmark_id} selects no engines"
            )));
        }

        let preflight = check_engines(
            &selected,
            &self.inner.clients,
            config.ping_timeout,
            &config.preflight_retry,
        )
        .await;

        let rejected = preflight.live.is_empty()
            || (config.require_all_engines && !preflight.unavailable.is_empty());
        if rejected {
            tracing::error!(
                benchmark_id = %benchmark_id,
                unavailable = %preflight.describe_unavailable(),
                "Pre-flight failed"
            );
            self.mark_failed(benchmark_id).await;
            return Err(BenchError::engine_unavailable(format!(
                "benchmark {benchmark_id}: {}",
                preflight.describe_unavailable()
            )));
        }

        let plan = ExecutionPlan::build(&benchmark, &preflight.live, &self.inner.next_execution_id);
        let planned = plan.len();

        for execution in &plan.executions {
            if let Err(e) = self.inner.tracker.register(execution.clone()) {
                self.inner.tracker.forget(benchmark_id);
                self.mark_failed(benchmark_id).await;
                return Err(e.into());
            }
        }

        if let Err(e) = self
            .inner
            .repository
            .update_benchmark_status(benchmark_id, BenchmarkStatus::Running)
            .await
        {
            tracing::error!(benchmark_id = %benchmark_id, error = %e, "Failed to mark benchmark running");
            self.inner.tracker.forget(benchmark_id);
            self.mark_failed(benchmark_id).await;
            return Err(e.into());
        }
        self.inner.metrics.increment(Counter::BenchmarksStarted, None);

        tracing::info!(
            benchmark_id = %benchmark_id,
            name = %benchmark.name,
            table_format = %benchmark.table_format,
            engines = ?preflight.live,
            queries = benchmark.queries.len(),
            planned,
            "Benchmark running"
        );

        let pools: Vec<EnginePool> = plan
            .per_engine
            .into_iter()
            .filter_map(|(engine, work)| {
                let client = self.inner.clients.get(&engine)?;
                let settings = config.pool_for(&engine);
                Some(EnginePool::new(engine, Arc::clone(client), work, settings))
            })
            .collect();

        let ctx = PoolContext {
            benchmark_id,
            table_format: benchmark.table_format,
            tracker: Arc::clone(&self.inner.tracker),
            aggregator: Arc::clone(&self.inner.aggregator),
            repository: Arc::clone(&self.inner.repository),
            metrics: Arc::clone(&self.inner.metrics),
            capture_plans: config.capture_plans,
        };

        let unavailable = preflight.unavailable_names();
        let this = self.clone();
        let task = tokio::spawn(this.drive(ctx, pools, cancel.clone(), planned, unavailable.clone()));

        Ok(RunHandle {
            benchmark_id,
            planned,
            engines: preflight.live,
            unavailable,
            cancel,
            task,
        })
    }

    /// Dispatch every pool and settle the benchmark status
    async fn drive(
        self,
        ctx: PoolContext,
        pools: Vec<EnginePool>,
        cancel: CancellationToken,
        planned: usize,
        unavailable: Vec<String>,
    ) -> BenchResult<RunSummary> {
        let benchmark_id = ctx.benchmark_id;
        let started = Instant::now();
        // Faults stop sibling pools without marking the run as user-cancelled
        let abort = cancel.child_token();
        let engine_order: Vec<String> = pools.iter().map(|p| p.engine_name().to_string()).collect();

        let mut running: FuturesUnordered<_> = pools
            .into_iter()
            .map(|pool| {
                let engine = pool.engine_name().to_string();
                let handle = tokio::spawn(pool.run(ctx.clone(), abort.clone()));
                async move { (engine, handle.await) }
            })
            .collect();

        let mut outcomes: Vec<PoolOutcome> = Vec::new();
        let mut fault: Option<BenchError> = None;
        while let Some((engine, joined)) = running.next().await {
            match joined {
                Ok(Ok(outcome)) => {
                    tracing::info!(
                        benchmark_id = %benchmark_id,
                        engine = %engine,
                        completed = outcome.stats.completed,
                        failed = outcome.stats.failed,
                        timed_out = outcome.stats.timed_out,
                        cancelled = outcome.stats.cancelled,
                        busy_ms = outcome.stats.busy.as_millis() as u64,
                        elapsed_ms = ?outcome.stats.elapsed().map(|d| d.as_millis()),
                        "Engine pool drained"
                    );
                    outcomes.push(outcome);
                }
                Ok(Err(e)) => {
                    tracing::error!(benchmark_id = %benchmark_id, engine = %engine, error = %e, "Engine pool failed");
                    abort.cancel();
                    fault.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!(benchmark_id = %benchmark_id, engine = %engine, error = %e, "Engine pool panicked");
                    abort.cancel();
                    fault.get_or_insert(BenchError::orchestration(format!(
                        "pool for engine '{engine}' panicked: {e}"
                    )));
                }
            }
        }

        let snapshot = self.inner.tracker.snapshot(benchmark_id);
        match self
            .inner
            .repository
            .save_executions(&snapshot.executions)
            .await
        {
            Ok(()) => {
                self.inner.tracker.forget(benchmark_id);
            }
            Err(e) => {
                tracing::error!(benchmark_id = %benchmark_id, error = %e, "Failed to persist executions");
                fault.get_or_insert(e.into());
            }
        }

        let outcome = self.settle(benchmark_id, fault).await;
        self.release(benchmark_id);
        outcome?;

        outcomes.sort_by_key(|o| engine_order.iter().position(|e| *e == o.engine));
        let results: Vec<BenchmarkResult> = outcomes.into_iter().filter_map(|o| o.result).collect();

        let summary = RunSummary {
            benchmark_id,
            status: BenchmarkStatus::Completed,
            results,
            unavailable_engines: unavailable,
            planned,
            completed: snapshot.completed,
            failed: snapshot.failed,
            never_dispatched: snapshot.pending,
            cancelled: cancel.is_cancelled(),
            elapsed: started.elapsed(),
        };

        tracing::info!(
            benchmark_id = %benchmark_id,
            completed = summary.completed,
            failed = summary.failed,
            never_dispatched = summary.never_dispatched,
            cancelled = summary.cancelled,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Benchmark completed"
        );

        Ok(summary)
    }

    /// Move the benchmark to its final status
    async fn settle(&self, benchmark_id: BenchmarkId, fault: Option<BenchError>) -> BenchResult<()> {
        let repository = &self.inner.repository;
        match fault {
            None => match repository
                .update_benchmark_status(benchmark_id, BenchmarkStatus::Completed)
                .await
            {
                Ok(()) => {
                    self.inner.metrics.increment(Counter::BenchmarksCompleted, None);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(benchmark_id = %benchmark_id, error = %e, "Failed to mark benchmark completed");
                    self.mark_failed(benchmark_id).await;
                    Err(e.into())
                }
            },
            Some(e) => {
                tracing::error!(benchmark_id = %benchmark_id, error = %e, "Benchmark failed");
                self.mark_failed(benchmark_id).await;
                Err(e)
            }
        }
    }

    /// Best-effort transition to `failed` while another error is reported
    async fn mark_failed(&self, benchmark_id: BenchmarkId) {
        if let Err(e) = self
            .inner
            .repository
            .update_benchmark_status(benchmark_id, BenchmarkStatus::Failed)
            .await
        {
            tracing::error!(benchmark_id = %benchmark_id, error = %e, "Failed to mark benchmark failed");
        }
        self.inner.metrics.increment(Counter::BenchmarksFailed, None);
    }

    fn release(&self, benchmark_id: BenchmarkId) {
        self.lock_active().remove(&benchmark_id);
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, HashMap<BenchmarkId, CancellationToken>> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.inner.config)
            .field("engines", &self.engine_names())
            .field("aggregator", &self.inner.aggregator)
            .finish()
    }
}
