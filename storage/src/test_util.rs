//! Fixtures shared by the repository tests

use lakehouse_bench_core::{
    BenchmarkId, BenchmarkResult, NewBenchmark, NewQuery, QueryType, TableFormat,
};

pub(crate) fn new_benchmark(engines: &[&str], queries: usize) -> NewBenchmark {
    NewBenchmark {
        name: "tpch-iceberg".into(),
        description: "TPC-H on Iceberg".into(),
        table_format: TableFormat::Iceberg,
        dataset_name: "tpch_sf1".into(),
        dataset_size: None,
        engines: engines.iter().map(|e| e.to_string()).collect(),
        queries: (1..=queries)
            .map(|i| NewQuery {
                name: format!("q{i}"),
                sql: format!("SELECT count(*) FROM lineitem WHERE l_linenumber = {i}"),
                query_type: Some(QueryType::Aggregation),
                complexity: None,
            })
            .collect(),
    }
}

pub(crate) fn result_for(benchmark_id: BenchmarkId, engine: &str) -> BenchmarkResult {
    BenchmarkResult {
        id: None,
        benchmark_id,
        engine: engine.to_string(),
        table_format: TableFormat::Iceberg,
        total_queries: 2,
        successful_queries: 2,
        failed_queries: 0,
        avg_execution_time_ms: 150.0,
        min_execution_time_ms: 100.0,
        max_execution_time_ms: 200.0,
        total_rows_processed: 20,
        total_bytes_processed: 2_000,
        avg_cpu_time_ms: 5.0,
        avg_peak_memory_bytes: 1_024.0,
        total_io_read_bytes: 1_000,
        total_io_write_bytes: 0,
        throughput: 10.0,
        efficiency_score: 9.5,
        efficiency_strategy: "resource_weighted".into(),
        window_start: None,
        window_end: None,
    }
}
