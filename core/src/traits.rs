//! Core traits for engine clients and benchmark repositories
//!
//! These traits are defined in core to avoid circular dependencies.
//! Implementations live in their respective crates (engines/, storage/).

use crate::benchmark::{Benchmark, BenchmarkId, BenchmarkStatus, ResultId};
use crate::execution::{ExecutionMetrics, FailureKind, QueryExecution};
use crate::result::BenchmarkResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Engine Client Trait
// ============================================================================

/// Uniform capability over a concrete SQL engine connection
///
/// Implementations handle engine-specific protocol details (Trino, Presto,
/// StarRocks) while presenting a single interface to the workers. A client
/// is shared by every execution of its engine and must be safe for
/// concurrent use.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Engine name as referenced by benchmarks (e.g., "trino")
    fn engine_name(&self) -> &str;

    /// Execute one query and report its metrics
    ///
    /// Must return [`EngineError::Cancelled`] promptly once `cancel` fires,
    /// aborting the remote query when the protocol allows it.
    async fn execute(
        &self,
        sql: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionMetrics, EngineError>;

    /// Capture the engine's plan for a query
    async fn explain(&self, _sql: &str, _cancel: &CancellationToken) -> Result<String, EngineError> {
        Err(EngineError::Unsupported(format!(
            "{} does not support plan capture",
            self.engine_name()
        )))
    }

    /// Cheap liveness check
    async fn ping(&self) -> Result<(), EngineError>;

    /// Release the connection handle
    async fn close(&self) {}
}

/// Engine-specific errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// HTTP/network error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine rejected or failed the query
    #[error("query failed ({code}): {message}")]
    Query {
        /// Engine error code or name
        code: String,
        /// Engine error message
        message: String,
    },

    /// The engine answered with something the client cannot interpret
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The engine is reachable but not serving queries
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// Request timeout
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the query
    #[error("query cancelled")]
    Cancelled,

    /// Operation not supported by this engine
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Check if this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Http(e) => e.is_connect() || e.is_timeout(),
            EngineError::Unavailable(_) | EngineError::Timeout(_) => true,
            _ => false,
        }
    }

    /// Convert to FailureKind for recording on an execution
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            EngineError::Timeout(_) => FailureKind::Timeout,
            EngineError::Http(e) if e.is_timeout() => FailureKind::Timeout,
            EngineError::Cancelled => FailureKind::Cancelled,
            _ => FailureKind::ExecutionFailure,
        }
    }
}

// ============================================================================
// Repository Trait
// ============================================================================

/// Persistence collaborator for benchmarks, results and executions
///
/// Assumed strongly consistent for a single benchmark.
#[async_trait]
pub trait BenchmarkRepository: Send + Sync {
    /// Load a benchmark together with its queries
    async fn load_benchmark_with_queries(
        &self,
        id: BenchmarkId,
    ) -> Result<Benchmark, RepositoryError>;

    /// Move a benchmark to a new status
    ///
    /// Implementations reject non-monotonic transitions.
    async fn update_benchmark_status(
        &self,
        id: BenchmarkId,
        status: BenchmarkStatus,
    ) -> Result<(), RepositoryError>;

    /// Persist an aggregated result, returning its identifier
    async fn save_result(&self, result: BenchmarkResult) -> Result<ResultId, RepositoryError>;

    /// Results saved so far for a benchmark
    async fn list_results(&self, id: BenchmarkId) -> Result<Vec<BenchmarkResult>, RepositoryError>;

    /// Persist terminal (or never-dispatched) executions for historical listing
    async fn save_executions(&self, executions: &[QueryExecution]) -> Result<(), RepositoryError>;

    /// Executions recorded for a benchmark
    async fn list_executions(&self, id: BenchmarkId)
        -> Result<Vec<QueryExecution>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    /// Record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Status change would regress the benchmark lifecycle
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: BenchmarkStatus,
        /// Requested status
        to: BenchmarkStatus,
    },

    /// Record already exists
    #[error("conflict: {0}")]
    Conflict(String),

    /// Record rejected by validation
    #[error("invalid record: {0}")]
    Invalid(String),

    /// Underlying storage failure
    #[error("storage backend error: {0}")]
    Backend(String),
}
