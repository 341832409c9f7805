//! Query execution records and raw engine metrics

use crate::benchmark::{BenchmarkId, ExecutionId, QueryId};
use serde::{Deserialize, Serialize};

/// Lifecycle of one (query, engine) execution
///
/// Only `pending -> running -> {completed, failed}` is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Planned, not yet dispatched
    Pending,
    /// Sent to the engine, awaiting the round trip
    Running,
    /// Finished with metrics
    Completed,
    /// Finished with a failure
    Failed,
}

impl ExecutionStatus {
    /// Whether this status is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "pending"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Normalized metrics reported by an engine client
///
/// Fields the engine cannot report stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// Client-measured wall time of the round trip
    pub elapsed_ms: u64,
    /// Rows processed (or returned when the engine only reports that)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_processed: Option<u64>,
    /// Bytes scanned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_processed: Option<u64>,
    /// CPU time consumed across the cluster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_time_ms: Option<u64>,
    /// Peak memory reserved by the query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_memory_bytes: Option<u64>,
    /// Bytes read from storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_read_bytes: Option<u64>,
    /// Bytes written to storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_write_bytes: Option<u64>,
}

impl ExecutionMetrics {
    /// Metrics carrying only the elapsed time
    pub fn with_elapsed_ms(elapsed_ms: u64) -> Self {
        Self {
            elapsed_ms,
            ..Default::default()
        }
    }
}

/// Why an execution failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The engine returned an error or a malformed result
    ExecutionFailure,
    /// The per-query timeout expired
    Timeout,
    /// The run was cancelled while the query was in flight
    Cancelled,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::ExecutionFailure => write!(f, "execution_failure"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Failure recorded on a query execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    /// Failure classification
    pub kind: FailureKind,
    /// Error message from the engine or the orchestrator
    pub message: String,
}

impl ExecutionFailure {
    /// Create a failure record
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// One attempt of one query on one engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExecution {
    /// Execution identifier
    pub id: ExecutionId,
    /// Benchmark this execution belongs to
    pub benchmark_id: BenchmarkId,
    /// Query being executed
    pub query_id: QueryId,
    /// Target engine name
    pub engine: String,
    /// Current status
    pub status: ExecutionStatus,
    /// When the query was sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// When the query finished (set iff terminal)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Metrics (set iff completed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ExecutionMetrics>,
    /// Failure detail (set iff failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ExecutionFailure>,
    /// Captured EXPLAIN output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_plan: Option<String>,
}

impl QueryExecution {
    /// A freshly planned execution
    pub fn pending(
        id: ExecutionId,
        benchmark_id: BenchmarkId,
        query_id: QueryId,
        engine: impl Into<String>,
    ) -> Self {
        Self {
            id,
            benchmark_id,
            query_id,
            engine: engine.into(),
            status: ExecutionStatus::Pending,
            start_time: None,
            end_time: None,
            metrics: None,
            failure: None,
            query_plan: None,
        }
    }

    /// Whether the execution reached a final state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Error message if the execution failed
    pub fn error_message(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.message.as_str())
    }
}
