//! Cross-engine comparison built from saved results

use std::cmp::Ordering;

use lakehouse_bench_core::{BenchmarkId, BenchmarkResult, TableFormat};
use serde::{Deserialize, Serialize};

use crate::ReportError;

/// One engine's line in a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRow {
    /// Engine name
    pub engine: String,
    /// Executions aggregated
    pub total_queries: usize,
    /// Completed executions
    pub successful_queries: usize,
    /// Failed executions
    pub failed_queries: usize,
    /// Successful share of executions, in percent
    pub success_rate_percent: f64,
    /// Mean elapsed time of successful executions
    pub avg_execution_time_ms: f64,
    /// Fastest successful execution
    pub min_execution_time_ms: f64,
    /// Slowest successful execution
    pub max_execution_time_ms: f64,
    /// Successful queries per second
    pub throughput: f64,
    /// Efficiency score
    pub efficiency_score: f64,
    /// Rank by average time, 1 = fastest; `None` without successes
    pub rank_avg_time: Option<usize>,
    /// Rank by throughput, 1 = highest
    pub rank_throughput: usize,
    /// Rank by efficiency, 1 = highest
    pub rank_efficiency: usize,
}

/// Side-by-side view of every engine's result for one benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Benchmark compared
    pub benchmark_id: BenchmarkId,
    /// Table format under test
    pub table_format: TableFormat,
    /// Efficiency strategy the scores were computed with
    pub efficiency_strategy: String,
    /// Rows ordered by average-time rank, engines without successes last
    pub rows: Vec<EngineRow>,
    /// Engine with the lowest average time
    pub fastest_engine: Option<String>,
    /// Engine with the highest throughput
    pub highest_throughput: Option<String>,
    /// Engine with the highest efficiency score
    pub most_efficient: Option<String>,
}

/// Rank positions (1-based) of `rows` under `cmp`
fn ranks<F>(rows: &[EngineRow], mut cmp: F) -> Vec<usize>
where
    F: FnMut(&EngineRow, &EngineRow) -> Ordering,
{
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| cmp(&rows[a], &rows[b]).then_with(|| rows[a].engine.cmp(&rows[b].engine)));
    let mut rank = vec![0; rows.len()];
    for (position, idx) in order.into_iter().enumerate() {
        rank[idx] = position + 1;
    }
    rank
}

impl ComparisonReport {
    /// Build a comparison from the results of one benchmark
    ///
    /// # Errors
    ///
    /// Returns `EmptyResults` when there is nothing to compare and
    /// `MixedBenchmarks` when results belong to different benchmarks.
    pub fn from_results(results: &[BenchmarkResult]) -> Result<Self, ReportError> {
        let first = results.first().ok_or(ReportError::EmptyResults)?;
        if let Some(other) = results.iter().find(|r| r.benchmark_id != first.benchmark_id) {
            return Err(ReportError::MixedBenchmarks(
                first.benchmark_id,
                other.benchmark_id,
            ));
        }

        let mut rows: Vec<EngineRow> = results
            .iter()
            .map(|r| EngineRow {
                engine: r.engine.clone(),
                total_queries: r.total_queries,
                successful_queries: r.successful_queries,
                failed_queries: r.failed_queries,
                success_rate_percent: r.success_rate() * 100.0,
                avg_execution_time_ms: r.avg_execution_time_ms,
                min_execution_time_ms: r.min_execution_time_ms,
                max_execution_time_ms: r.max_execution_time_ms,
                throughput: r.throughput,
                efficiency_score: r.efficiency_score,
                rank_avg_time: None,
                rank_throughput: 0,
                rank_efficiency: 0,
            })
            .collect();

        let throughput = ranks(&rows, |a, b| b.throughput.total_cmp(&a.throughput));
        let efficiency = ranks(&rows, |a, b| b.efficiency_score.total_cmp(&a.efficiency_score));
        // Engines without successes have no meaningful average and sort last
        let avg_time = ranks(&rows, |a, b| {
            match (a.successful_queries > 0, b.successful_queries > 0) {
                (true, true) => a.avg_execution_time_ms.total_cmp(&b.avg_execution_time_ms),
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => Ordering::Equal,
            }
        });

        for (idx, row) in rows.iter_mut().enumerate() {
            row.rank_throughput = throughput[idx];
            row.rank_efficiency = efficiency[idx];
            row.rank_avg_time = (row.successful_queries > 0).then_some(avg_time[idx]);
        }
        let order = avg_time;
        let mut indexed: Vec<(usize, EngineRow)> = order.into_iter().zip(rows).collect();
        indexed.sort_by_key(|(rank, _)| *rank);
        let rows: Vec<EngineRow> = indexed.into_iter().map(|(_, row)| row).collect();

        let leader = |pick: fn(&EngineRow) -> bool| {
            rows.iter()
                .find(|row| pick(row))
                .map(|row| row.engine.clone())
        };
        let fastest_engine = leader(|row| row.rank_avg_time == Some(1));
        let highest_throughput = leader(|row| row.rank_throughput == 1 && row.successful_queries > 0);
        let most_efficient = leader(|row| row.rank_efficiency == 1 && row.successful_queries > 0);

        Ok(Self {
            benchmark_id: first.benchmark_id,
            table_format: first.table_format,
            efficiency_strategy: first.efficiency_strategy.clone(),
            rows,
            fastest_engine,
            highest_throughput,
            most_efficient,
        })
    }

    /// Row for an engine
    pub fn row(&self, engine: &str) -> Option<&EngineRow> {
        self.rows.iter().find(|row| row.engine == engine)
    }
}
