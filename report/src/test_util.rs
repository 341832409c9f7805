use lakehouse_bench_core::{BenchmarkId, BenchmarkResult, TableFormat};

pub(crate) fn result(
    engine: &str,
    total: usize,
    successful: usize,
    avg_ms: f64,
    throughput: f64,
    efficiency: f64,
) -> BenchmarkResult {
    BenchmarkResult {
        id: None,
        benchmark_id: BenchmarkId(1),
        engine: engine.to_string(),
        table_format: TableFormat::Hive,
        total_queries: total,
        successful_queries: successful,
        failed_queries: total - successful,
        avg_execution_time_ms: avg_ms,
        min_execution_time_ms: avg_ms / 2.0,
        max_execution_time_ms: avg_ms * 2.0,
        total_rows_processed: 1_000,
        total_bytes_processed: 64_000,
        avg_cpu_time_ms: 10.0,
        avg_peak_memory_bytes: 4_096.0,
        total_io_read_bytes: 32_000,
        total_io_write_bytes: 0,
        throughput,
        efficiency_score: efficiency,
        efficiency_strategy: "resource_weighted".into(),
        window_start: None,
        window_end: None,
    }
}
