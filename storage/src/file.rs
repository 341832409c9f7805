//! JSON snapshot repository
//!
//! Wraps a [`MemoryRepository`] and rewrites the whole store to a single
//! JSON file after every mutation. The file is written to a sibling temp
//! path and renamed into place, so a crash leaves either the old or the new
//! snapshot.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lakehouse_bench_core::{
    Benchmark, BenchmarkId, BenchmarkRepository, BenchmarkResult, BenchmarkStatus, NewBenchmark,
    QueryExecution, RepositoryError, ResultId,
};
use tokio::sync::Mutex;

use crate::memory::{MemoryRepository, StoreState};

/// Repository persisted as a JSON file
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    inner: MemoryRepository,
    /// Serializes snapshot writes so they land in mutation order
    persist_lock: Mutex<()>,
}

impl JsonFileRepository {
    /// Open the store at `path`, starting empty if the file does not exist
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<StoreState>(&bytes).map_err(|e| {
                RepositoryError::Backend(format!("corrupt store {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => {
                return Err(RepositoryError::Backend(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };

        tracing::debug!(path = %path.display(), "Opened benchmark store");
        Ok(Self {
            path,
            inner: MemoryRepository::from_state(state),
            persist_lock: Mutex::new(()),
        })
    }

    /// Location of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a new benchmark in the `created` state
    pub async fn create_benchmark(&self, def: NewBenchmark) -> Result<Benchmark, RepositoryError> {
        let benchmark = self.inner.create_benchmark(def).await?;
        self.persist().await?;
        Ok(benchmark)
    }

    /// All benchmarks, oldest first
    pub async fn list_benchmarks(&self) -> Vec<Benchmark> {
        self.inner.list_benchmarks().await
    }

    async fn persist(&self) -> Result<(), RepositoryError> {
        let _guard = self.persist_lock.lock().await;
        let state = self.inner.export().await;
        let json = serde_json::to_vec_pretty(&state)
            .map_err(|e| RepositoryError::Backend(format!("cannot encode store: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RepositoryError::Backend(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| RepositoryError::Backend(format!("cannot write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            RepositoryError::Backend(format!("cannot replace {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

#[async_trait]
impl BenchmarkRepository for JsonFileRepository {
    async fn load_benchmark_with_queries(
        &self,
        id: BenchmarkId,
    ) -> Result<Benchmark, RepositoryError> {
        self.inner.load_benchmark_with_queries(id).await
    }

    async fn update_benchmark_status(
        &self,
        id: BenchmarkId,
        status: BenchmarkStatus,
    ) -> Result<(), RepositoryError> {
        self.inner.update_benchmark_status(id, status).await?;
        self.persist().await
    }

    async fn save_result(&self, result: BenchmarkResult) -> Result<ResultId, RepositoryError> {
        let id = self.inner.save_result(result).await?;
        self.persist().await?;
        Ok(id)
    }

    async fn list_results(&self, id: BenchmarkId) -> Result<Vec<BenchmarkResult>, RepositoryError> {
        self.inner.list_results(id).await
    }

    async fn save_executions(&self, executions: &[QueryExecution]) -> Result<(), RepositoryError> {
        self.inner.save_executions(executions).await?;
        self.persist().await
    }

    async fn list_executions(
        &self,
        id: BenchmarkId,
    ) -> Result<Vec<QueryExecution>, RepositoryError> {
        self.inner.list_executions(id).await
    }
}
