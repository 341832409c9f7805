//! JSON export functionality

use std::io::Write;

use lakehouse_bench_core::BenchmarkResult;
use serde_json::json;

use crate::comparison::ComparisonReport;
use crate::ReportError;

/// Writes the comparison together with the raw results
pub struct JsonExporter;

impl JsonExporter {
    /// Build the JSON document
    pub fn document(report: &ComparisonReport, results: &[BenchmarkResult]) -> serde_json::Value {
        json!({
            "summary": {
                "benchmark_id": report.benchmark_id,
                "table_format": report.table_format,
                "efficiency_strategy": report.efficiency_strategy,
                "fastest_engine": report.fastest_engine,
                "highest_throughput": report.highest_throughput,
                "most_efficient": report.most_efficient,
            },
            "engines": report.rows,
            "results": results,
        })
    }

    /// Export to any writer, pretty printed
    pub fn write<W: Write>(
        report: &ComparisonReport,
        results: &[BenchmarkResult],
        writer: W,
    ) -> Result<(), ReportError> {
        serde_json::to_writer_pretty(writer, &Self::document(report, results))?;
        Ok(())
    }

    /// Export to a string, pretty printed
    pub fn to_string(
        report: &ComparisonReport,
        results: &[BenchmarkResult],
    ) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(&Self::document(report, results))?)
    }
}
