//! Mock engine clients and an in-memory repository shared by the unit tests

use crate::benchmark::{
    Benchmark, BenchmarkId, BenchmarkStatus, Query, QueryId, ResultId, TableFormat,
};
use crate::execution::{ExecutionMetrics, QueryExecution};
use crate::result::BenchmarkResult;
use crate::traits::{BenchmarkRepository, EngineClient, EngineError, RepositoryError};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock EngineClient
// ============================================================================

pub(crate) struct MockEngineClient {
    name: String,
    delay: Duration,
    fail_sql: Vec<String>,
    hang_sql: Vec<String>,
    ping_ok: bool,
    transient_ping_failures: AtomicUsize,
    plans: bool,
    pub executed: AtomicUsize,
    pub pings: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub closed: AtomicBool,
    in_flight: AtomicUsize,
}

impl MockEngineClient {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            fail_sql: Vec::new(),
            hang_sql: Vec::new(),
            ping_ok: true,
            transient_ping_failures: AtomicUsize::new(0),
            plans: false,
            executed: AtomicUsize::new(0),
            pings: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queries with this SQL fail with a query error
    pub(crate) fn failing_on(mut self, sql: &str) -> Self {
        self.fail_sql.push(sql.to_string());
        self
    }

    /// Queries with this SQL never finish on their own
    pub(crate) fn hanging_on(mut self, sql: &str) -> Self {
        self.hang_sql.push(sql.to_string());
        self
    }

    pub(crate) fn unreachable(mut self) -> Self {
        self.ping_ok = false;
        self
    }

    /// Fail the first `n` pings with a retryable error
    pub(crate) fn with_transient_ping_failures(self, n: usize) -> Self {
        self.transient_ping_failures.store(n, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_plans(mut self) -> Self {
        self.plans = true;
        self
    }

    pub(crate) fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EngineClient for MockEngineClient {
    fn engine_name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        sql: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionMetrics, EngineError> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let delay = if self.hang_sql.iter().any(|s| s == sql) {
            Duration::from_secs(3600)
        } else {
            self.delay
        };

        tokio::select! {
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        if self.fail_sql.iter().any(|s| s == sql) {
            return Err(EngineError::Query {
                code: "SYNTAX_ERROR".into(),
                message: format!("cannot run '{sql}'"),
            });
        }

        Ok(ExecutionMetrics {
            elapsed_ms: delay.as_millis() as u64,
            rows_processed: Some(10),
            bytes_processed: Some(1_000),
            cpu_time_ms: Some(5),
            peak_memory_bytes: Some(1_024),
            io_read_bytes: Some(500),
            io_write_bytes: None,
        })
    }

    async fn explain(&self, sql: &str, _cancel: &CancellationToken) -> Result<String, EngineError> {
        if self.plans {
            Ok(format!("PLAN {sql}"))
        } else {
            Err(EngineError::Unsupported("no plans".into()))
        }
    }

    async fn ping(&self) -> Result<(), EngineError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        let remaining = self.transient_ping_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_ping_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(EngineError::Unavailable("server is starting".into()));
        }
        if self.ping_ok {
            Ok(())
        } else {
            Err(EngineError::Protocol("connection refused".into()))
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// Mock BenchmarkRepository
// ============================================================================

#[derive(Default)]
struct MockState {
    benchmarks: HashMap<BenchmarkId, Benchmark>,
    results: Vec<BenchmarkResult>,
    executions: Vec<QueryExecution>,
    transitions: Vec<(BenchmarkId, BenchmarkStatus)>,
}

#[derive(Default)]
pub(crate) struct MockRepository {
    state: Mutex<MockState>,
    fail_save_result: AtomicBool,
    rejected_statuses: std::sync::Mutex<Vec<BenchmarkStatus>>,
}

impl MockRepository {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store a `created` benchmark with one query per SQL string
    pub(crate) async fn insert(&self, id: u64, engines: &[&str], sqls: &[&str]) -> BenchmarkId {
        let benchmark_id = BenchmarkId(id);
        let now = chrono::Utc::now();
        let queries = sqls
            .iter()
            .enumerate()
            .map(|(i, sql)| Query {
                id: QueryId(id * 100 + i as u64),
                benchmark_id,
                name: format!("q{}", i + 1),
                sql: sql.to_string(),
                query_type: None,
                complexity: None,
            })
            .collect();

        let benchmark = Benchmark {
            id: benchmark_id,
            name: format!("bench-{id}"),
            description: String::new(),
            table_format: TableFormat::Iceberg,
            dataset_name: "tpch_sf1".into(),
            dataset_size: None,
            engines: engines.iter().map(|e| e.to_string()).collect(),
            status: BenchmarkStatus::Created,
            created_at: now,
            updated_at: now,
            queries,
        };
        self.state
            .lock()
            .await
            .benchmarks
            .insert(benchmark_id, benchmark);
        benchmark_id
    }

    pub(crate) fn fail_result_saves(&self) {
        self.fail_save_result.store(true, Ordering::SeqCst);
    }

    /// Make every write of `status` fail with a backend error
    pub(crate) fn fail_status_writes(&self, status: BenchmarkStatus) {
        self.rejected_statuses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(status);
    }

    pub(crate) async fn status(&self, id: BenchmarkId) -> BenchmarkStatus {
        self.state.lock().await.benchmarks[&id].status
    }

    pub(crate) async fn transitions(&self, id: BenchmarkId) -> Vec<BenchmarkStatus> {
        self.state
            .lock()
            .await
            .transitions
            .iter()
            .filter(|(b, _)| *b == id)
            .map(|(_, s)| *s)
            .collect()
    }

    pub(crate) async fn saved_executions(&self, id: BenchmarkId) -> Vec<QueryExecution> {
        self.state
            .lock()
            .await
            .executions
            .iter()
            .filter(|e| e.benchmark_id == id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BenchmarkRepository for MockRepository {
    async fn load_benchmark_with_queries(
        &self,
        id: BenchmarkId,
    ) -> Result<Benchmark, RepositoryError> {
        self.state
            .lock()
            .await
            .benchmarks
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("benchmark {id}")))
    }

    async fn update_benchmark_status(
        &self,
        id: BenchmarkId,
        status: BenchmarkStatus,
    ) -> Result<(), RepositoryError> {
        let rejected = self
            .rejected_statuses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&status);
        if rejected {
            return Err(RepositoryError::Backend(format!("cannot write status {status}")));
        }
        let mut state = self.state.lock().await;
        let benchmark = state
            .benchmarks
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("benchmark {id}")))?;
        if !benchmark.status.can_transition_to(status) {
            return Err(RepositoryError::InvalidTransition {
                from: benchmark.status,
                to: status,
            });
        }
        benchmark.status = status;
        state.transitions.push((id, status));
        Ok(())
    }

    async fn save_result(&self, mut result: BenchmarkResult) -> Result<ResultId, RepositoryError> {
        if self.fail_save_result.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend("disk full".into()));
        }
        let mut state = self.state.lock().await;
        let id = ResultId(state.results.len() as u64 + 1);
        result.id = Some(id);
        state.results.push(result);
        Ok(id)
    }

    async fn list_results(
        &self,
        id: BenchmarkId,
    ) -> Result<Vec<BenchmarkResult>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .results
            .iter()
            .filter(|r| r.benchmark_id == id)
            .cloned()
            .collect())
    }

    async fn save_executions(&self, executions: &[QueryExecution]) -> Result<(), RepositoryError> {
        self.state
            .lock()
            .await
            .executions
            .extend_from_slice(executions);
        Ok(())
    }

    async fn list_executions(
        &self,
        id: BenchmarkId,
    ) -> Result<Vec<QueryExecution>, RepositoryError> {
        Ok(self.saved_executions(id).await)
    }
}
