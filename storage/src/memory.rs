//! In-memory benchmark repository

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use lakehouse_bench_core::{
    Benchmark, BenchmarkId, BenchmarkRepository, BenchmarkResult, BenchmarkStatus, NewBenchmark,
    Query, QueryExecution, QueryId, RepositoryError, ResultId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Everything a repository holds; also the on-disk snapshot format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoreState {
    next_benchmark_id: u64,
    next_query_id: u64,
    next_result_id: u64,
    benchmarks: BTreeMap<BenchmarkId, Benchmark>,
    results: Vec<BenchmarkResult>,
    executions: BTreeMap<BenchmarkId, Vec<QueryExecution>>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            next_benchmark_id: 1,
            next_query_id: 1,
            next_result_id: 1,
            benchmarks: BTreeMap::new(),
            results: Vec::new(),
            executions: BTreeMap::new(),
        }
    }
}

impl StoreState {
    fn benchmark_mut(&mut self, id: BenchmarkId) -> Result<&mut Benchmark, RepositoryError> {
        self.benchmarks
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("benchmark {id}")))
    }
}

/// Repository keeping benchmarks, results and executions in memory
///
/// Ids are allocated sequentially. Status changes must follow
/// [`BenchmarkStatus::can_transition_to`] and at most one result is stored
/// per (benchmark, engine).
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<StoreState>,
}

impl MemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub(crate) async fn export(&self) -> StoreState {
        self.state.read().await.clone()
    }

    /// Store a new benchmark in the `created` state
    pub async fn create_benchmark(&self, def: NewBenchmark) -> Result<Benchmark, RepositoryError> {
        def.validate().map_err(RepositoryError::Invalid)?;

        let mut state = self.state.write().await;
        let id = BenchmarkId(state.next_benchmark_id);
        state.next_benchmark_id += 1;

        let mut queries = Vec::with_capacity(def.queries.len());
        for query in def.queries {
            queries.push(Query {
                id: QueryId(state.next_query_id),
                benchmark_id: id,
                name: query.name,
                sql: query.sql,
                query_type: query.query_type,
                complexity: query.complexity,
            });
            state.next_query_id += 1;
        }

        let now = Utc::now();
        let benchmark = Benchmark {
            id,
            name: def.name,
            description: def.description,
            table_format: def.table_format,
            dataset_name: def.dataset_name,
            dataset_size: def.dataset_size,
            engines: def.engines,
            status: BenchmarkStatus::Created,
            created_at: now,
            updated_at: now,
            queries,
        };
        state.benchmarks.insert(id, benchmark.clone());

        tracing::debug!(
            benchmark_id = %id,
            name = %benchmark.name,
            queries = benchmark.queries.len(),
            "Benchmark created"
        );
        Ok(benchmark)
    }

    /// All benchmarks, oldest first
    pub async fn list_benchmarks(&self) -> Vec<Benchmark> {
        self.state.read().await.benchmarks.values().cloned().collect()
    }
}

#[async_trait]
impl BenchmarkRepository for MemoryRepository {
    async fn load_benchmark_with_queries(
        &self,
        id: BenchmarkId,
    ) -> Result<Benchmark, RepositoryError> {
        self.state
            .read()
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
        let mut state = self.state.write().await;
        let benchmark = state.benchmark_mut(id)?;
        if !benchmark.status.can_transition_to(status) {
            return Err(RepositoryError::InvalidTransition {
                from: benchmark.status,
                to: status,
            });
        }
        benchmark.status = status;
        benchmark.updated_at = Utc::now();
        Ok(())
    }

    async fn save_result(&self, mut result: BenchmarkResult) -> Result<ResultId, RepositoryError> {
        let mut state = self.state.write().await;
        state.benchmark_mut(result.benchmark_id)?;

        let duplicate = state
            .results
            .iter()
            .any(|r| r.benchmark_id == result.benchmark_id && r.engine == result.engine);
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "result for benchmark {} on engine '{}' already exists",
                result.benchmark_id, result.engine
            )));
        }

        let id = ResultId(state.next_result_id);
        state.next_result_id += 1;
        result.id = Some(id);
        state.results.push(result);
        Ok(id)
    }

    async fn list_results(&self, id: BenchmarkId) -> Result<Vec<BenchmarkResult>, RepositoryError> {
        let state = self.state.read().await;
        if !state.benchmarks.contains_key(&id) {
            return Err(RepositoryError::NotFound(format!("benchmark {id}")));
        }
        Ok(state
            .results
            .iter()
            .filter(|r| r.benchmark_id == id)
            .cloned()
            .collect())
    }

    async fn save_executions(&self, executions: &[QueryExecution]) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(missing) = executions
            .iter()
            .find(|e| !state.benchmarks.contains_key(&e.benchmark_id))
        {
            return Err(RepositoryError::NotFound(format!(
                "benchmark {}",
                missing.benchmark_id
            )));
        }

        for execution in executions {
            let stored = state.executions.entry(execution.benchmark_id).or_default();
            match stored.iter_mut().find(|e| e.id == execution.id) {
                Some(existing) => *existing = execution.clone(),
                None => stored.push(execution.clone()),
            }
        }
        Ok(())
    }

    async fn list_executions(
        &self,
        id: BenchmarkId,
    ) -> Result<Vec<QueryExecution>, RepositoryError> {
        let state = self.state.read().await;
        if !state.benchmarks.contains_key(&id) {
            return Err(RepositoryError::NotFound(format!("benchmark {id}")));
        }
        Ok(state.executions.get(&id).cloned().unwrap_or_default())
    }
}
