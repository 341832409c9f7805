//! Aggregated per-engine benchmark results

use crate::benchmark::{BenchmarkId, ResultId, TableFormat};
use serde::{Deserialize, Serialize};

/// Aggregate statistics for one engine within one benchmark
///
/// Produced by [`crate::aggregator::ResultAggregator`] once all of that
/// engine's executions are terminal. The `id` is assigned by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Repository identifier (unset until saved)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResultId>,
    /// Benchmark this result belongs to
    pub benchmark_id: BenchmarkId,
    /// Engine name
    pub engine: String,
    /// Table format under test
    pub table_format: TableFormat,

    /// Executions aggregated
    pub total_queries: usize,
    /// Executions that completed
    pub successful_queries: usize,
    /// Executions that failed (including timeouts and cancellations)
    pub failed_queries: usize,

    /// Mean elapsed time of successful executions
    pub avg_execution_time_ms: f64,
    /// Fastest successful execution
    pub min_execution_time_ms: f64,
    /// Slowest successful execution
    pub max_execution_time_ms: f64,

    /// Rows processed by successful executions
    pub total_rows_processed: u64,
    /// Bytes processed by successful executions
    pub total_bytes_processed: u64,
    /// Mean CPU time of successful executions that reported it
    pub avg_cpu_time_ms: f64,
    /// Mean peak memory of successful executions that reported it
    pub avg_peak_memory_bytes: f64,
    /// Bytes read by successful executions
    pub total_io_read_bytes: u64,
    /// Bytes written by successful executions
    pub total_io_write_bytes: u64,

    /// Successful queries per wall-clock second
    pub throughput: f64,
    /// Composite efficiency score
    pub efficiency_score: f64,
    /// Strategy that produced `efficiency_score`
    pub efficiency_strategy: String,

    /// First execution start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_start: Option<chrono::DateTime<chrono::Utc>>,
    /// Last execution end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_end: Option<chrono::DateTime<chrono::Utc>>,
}

impl BenchmarkResult {
    /// Success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total_queries > 0 {
            self.successful_queries as f64 / self.total_queries as f64
        } else {
            0.0
        }
    }

    /// Error rate (0.0 - 1.0)
    pub fn error_rate(&self) -> f64 {
        if self.total_queries > 0 {
            1.0 - self.success_rate()
        } else {
            0.0
        }
    }
}
