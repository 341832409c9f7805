//! Folding terminal executions into per-engine results
//!
//! [`ResultAggregator::aggregate`] is pure: it reads no clock and assigns no
//! ids, so aggregating the same executions twice yields equal results.

mod efficiency;

pub use efficiency::{
    scorer_for, EfficiencyInputs, EfficiencyScorer, ResourceWeighted, ThroughputOnly,
};

use crate::benchmark::{BenchmarkId, TableFormat};
use crate::config::EfficiencyStrategy;
use crate::error::{BenchError, BenchResult};
use crate::execution::{ExecutionStatus, QueryExecution};
use crate::result::BenchmarkResult;

/// Builds one [`BenchmarkResult`] per (benchmark, engine)
pub struct ResultAggregator {
    scorer: Box<dyn EfficiencyScorer>,
}

impl ResultAggregator {
    /// Aggregator using the given efficiency strategy
    pub fn new(strategy: EfficiencyStrategy) -> Self {
        Self {
            scorer: scorer_for(strategy),
        }
    }

    /// Aggregator with a custom scorer
    pub fn with_scorer(scorer: Box<dyn EfficiencyScorer>) -> Self {
        Self { scorer }
    }

    /// Name of the efficiency strategy in use
    pub fn strategy_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Aggregate the terminal executions of one engine
    ///
    /// # Errors
    /// `Precondition` if `executions` is empty, contains a non-terminal
    /// execution, or an execution of another benchmark or engine.
    pub fn aggregate(
        &self,
        benchmark_id: BenchmarkId,
        engine: &str,
        table_format: TableFormat,
        executions: &[QueryExecution],
    ) -> BenchResult<BenchmarkResult> {
        if executions.is_empty() {
            return Err(BenchError::precondition(format!(
                "no executions to aggregate for engine '{engine}'"
            )));
        }
        for execution in executions {
            if !execution.is_terminal() {
                return Err(BenchError::precondition(format!(
                    "execution {} is still {}",
                    execution.id, execution.status
                )));
            }
            if execution.benchmark_id != benchmark_id || execution.engine != engine {
                return Err(BenchError::precondition(format!(
                    "execution {} belongs to benchmark {} engine '{}', not benchmark {} engine '{}'",
                    execution.id, execution.benchmark_id, execution.engine, benchmark_id, engine
                )));
            }
        }

        let successes: Vec<_> = executions
            .iter()
            .filter(|e| e.status == ExecutionStatus::Completed)
            .filter_map(|e| e.metrics.as_ref())
            .collect();

        let total = executions.len();
        let successful = successes.len();
        let failed = total - successful;

        let elapsed: Vec<u64> = successes.iter().map(|m| m.elapsed_ms).collect();
        let (min_ms, avg_ms, max_ms) = if elapsed.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let sum: u64 = elapsed.iter().sum();
            (
                elapsed.iter().copied().min().unwrap_or(0) as f64,
                sum as f64 / elapsed.len() as f64,
                elapsed.iter().copied().max().unwrap_or(0) as f64,
            )
        };

        let total_rows_processed = successes.iter().filter_map(|m| m.rows_processed).sum();
        let total_bytes_processed = successes.iter().filter_map(|m| m.bytes_processed).sum();
        let total_io_read_bytes = successes.iter().filter_map(|m| m.io_read_bytes).sum();
        let total_io_write_bytes = successes.iter().filter_map(|m| m.io_write_bytes).sum();
        let avg_cpu_time_ms = mean(successes.iter().filter_map(|m| m.cpu_time_ms));
        let avg_peak_memory_bytes = mean(successes.iter().filter_map(|m| m.peak_memory_bytes));

        let window_start = executions.iter().filter_map(|e| e.start_time).min();
        let window_end = executions.iter().filter_map(|e| e.end_time).max();
        let window_secs = match (window_start, window_end) {
            (Some(start), Some(end)) if end > start => {
                (end - start).num_milliseconds() as f64 / 1000.0
            }
            _ => 0.0,
        };
        // A zero-length window counts as one second.
        let window_secs = if window_secs > 0.0 { window_secs } else { 1.0 };
        let throughput = successful as f64 / window_secs;

        let success_ratio = successful as f64 / total as f64;
        let efficiency_score = self.scorer.score(&EfficiencyInputs {
            throughput,
            success_ratio,
            avg_cpu_time_ms,
            avg_peak_memory_bytes,
            successful,
        });

        Ok(BenchmarkResult {
            id: None,
            benchmark_id,
            engine: engine.to_string(),
            table_format,
            total_queries: total,
            successful_queries: successful,
            failed_queries: failed,
            avg_execution_time_ms: avg_ms,
            min_execution_time_ms: min_ms,
            max_execution_time_ms: max_ms,
            total_rows_processed,
            total_bytes_processed,
            avg_cpu_time_ms,
            avg_peak_memory_bytes,
            total_io_read_bytes,
            total_io_write_bytes,
            throughput,
            efficiency_score,
            efficiency_strategy: self.scorer.name().to_string(),
            window_start,
            window_end,
        })
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new(EfficiencyStrategy::default())
    }
}

impl std::fmt::Debug for ResultAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultAggregator")
            .field("strategy", &self.scorer.name())
            .finish()
    }
}

fn mean(values: impl Iterator<Item = u64>) -> f64 {
    let (sum, count) = values.fold((0u128, 0u64), |(sum, count), v| (sum + v as u128, count + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{ExecutionId, QueryId};
    use crate::error::BenchErrorKind;
    use crate::execution::{ExecutionFailure, ExecutionMetrics, FailureKind};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn completed(id: u64, offset_ms: i64, metrics: ExecutionMetrics) -> QueryExecution {
        let mut execution =
            QueryExecution::pending(ExecutionId(id), BenchmarkId(1), QueryId(id), "trino");
        execution.status = ExecutionStatus::Completed;
        execution.start_time = Some(t0() + Duration::milliseconds(offset_ms));
        execution.end_time =
            Some(t0() + Duration::milliseconds(offset_ms + metrics.elapsed_ms as i64));
        execution.metrics = Some(metrics);
        execution
    }

    fn failed(id: u64, offset_ms: i64, duration_ms: i64, kind: FailureKind) -> QueryExecution {
        let mut execution =
            QueryExecution::pending(ExecutionId(id), BenchmarkId(1), QueryId(id), "trino");
        execution.status = ExecutionStatus::Failed;
        execution.start_time = Some(t0() + Duration::milliseconds(offset_ms));
        execution.end_time = Some(t0() + Duration::milliseconds(offset_ms + duration_ms));
        execution.failure = Some(ExecutionFailure::new(kind, "boom"));
        execution
    }

    fn full_metrics(elapsed_ms: u64, cpu: Option<u64>) -> ExecutionMetrics {
        ExecutionMetrics {
            elapsed_ms,
            rows_processed: Some(100),
            bytes_processed: Some(1_000),
            cpu_time_ms: cpu,
            peak_memory_bytes: Some(2048),
            io_read_bytes: Some(500),
            io_write_bytes: Some(0),
        }
    }

    #[test]
    fn test_aggregate_mixed_outcomes() {
        let executions = vec![
            completed(1, 0, full_metrics(1000, Some(400))),
            completed(2, 500, full_metrics(3000, None)),
            failed(3, 1000, 1000, FailureKind::Timeout),
        ];

        let result = ResultAggregator::default()
            .aggregate(BenchmarkId(1), "trino", TableFormat::Iceberg, &executions)
            .unwrap();

        assert_eq!(result.total_queries, 3);
        assert_eq!(result.successful_queries, 2);
        assert_eq!(result.failed_queries, 1);
        assert_eq!(result.min_execution_time_ms, 1000.0);
        assert_eq!(result.max_execution_time_ms, 3000.0);
        assert_eq!(result.avg_execution_time_ms, 2000.0);
        assert_eq!(result.total_rows_processed, 200);
        assert_eq!(result.total_bytes_processed, 2000);
        assert_eq!(result.total_io_read_bytes, 1000);
        // only one success reported CPU time
        assert_eq!(result.avg_cpu_time_ms, 400.0);
        assert_eq!(result.avg_peak_memory_bytes, 2048.0);
        // window: 0 ms .. 3500 ms
        assert!((result.throughput - 2.0 / 3.5).abs() < 1e-9);
        assert_eq!(result.window_start, Some(t0()));
        assert_eq!(
            result.window_end,
            Some(t0() + Duration::milliseconds(3500))
        );
        assert_eq!(result.efficiency_strategy, "resource_weighted");
        assert!(result.efficiency_score > 0.0);
        assert!(result.id.is_none());
    }

    #[test]
    fn test_aggregate_all_failed() {
        let executions = vec![
            failed(1, 0, 10, FailureKind::ExecutionFailure),
            failed(2, 0, 20, FailureKind::Cancelled),
        ];
        let result = ResultAggregator::default()
            .aggregate(BenchmarkId(1), "trino", TableFormat::Hive, &executions)
            .unwrap();

        assert_eq!(result.total_queries, 2);
        assert_eq!(result.successful_queries, 0);
        assert_eq!(result.failed_queries, 2);
        assert_eq!(result.avg_execution_time_ms, 0.0);
        assert_eq!(result.min_execution_time_ms, 0.0);
        assert_eq!(result.max_execution_time_ms, 0.0);
        assert_eq!(result.throughput, 0.0);
        assert_eq!(result.efficiency_score, 0.0);
    }

    #[test]
    fn test_zero_interval_counts_as_one_second() {
        let executions = vec![completed(1, 0, ExecutionMetrics::with_elapsed_ms(0))];
        let result = ResultAggregator::default()
            .aggregate(BenchmarkId(1), "trino", TableFormat::Hive, &executions)
            .unwrap();

        assert_eq!(result.throughput, 1.0);
        assert_eq!(result.successful_queries, 1);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let executions = vec![
            completed(1, 0, full_metrics(120, Some(50))),
            completed(2, 10, full_metrics(80, Some(70))),
            failed(3, 5, 30, FailureKind::Timeout),
        ];
        let aggregator = ResultAggregator::new(EfficiencyStrategy::ThroughputOnly);

        let first = aggregator
            .aggregate(BenchmarkId(1), "trino", TableFormat::Iceberg, &executions)
            .unwrap();
        let second = aggregator
            .aggregate(BenchmarkId(1), "trino", TableFormat::Iceberg, &executions)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(first.efficiency_score, first.throughput);
    }

    #[test]
    fn test_preconditions() {
        let aggregator = ResultAggregator::default();

        let err = aggregator
            .aggregate(BenchmarkId(1), "trino", TableFormat::Hive, &[])
            .unwrap_err();
        assert_eq!(err.kind, BenchErrorKind::Precondition);

        let running = {
            let mut e =
                QueryExecution::pending(ExecutionId(1), BenchmarkId(1), QueryId(1), "trino");
            e.status = ExecutionStatus::Running;
            e
        };
        let err = aggregator
            .aggregate(BenchmarkId(1), "trino", TableFormat::Hive, &[running])
            .unwrap_err();
        assert_eq!(err.kind, BenchErrorKind::Precondition);

        let other_engine = completed(1, 0, ExecutionMetrics::with_elapsed_ms(5));
        let err = aggregator
            .aggregate(BenchmarkId(1), "presto", TableFormat::Hive, &[other_engine.clone()])
            .unwrap_err();
        assert_eq!(err.kind, BenchErrorKind::Precondition);

        let err = aggregator
            .aggregate(BenchmarkId(2), "trino", TableFormat::Hive, &[other_engine])
            .unwrap_err();
        assert!(err.message.contains("benchmark 1"));
    }
}
