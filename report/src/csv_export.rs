//! CSV export functionality

use std::io::Write;

use csv::Writer;

use crate::comparison::ComparisonReport;
use crate::ReportError;

/// Writes one CSV row per engine
pub struct CsvExporter;

impl CsvExporter {
    /// Export the comparison rows to any writer
    pub fn write<W: Write>(report: &ComparisonReport, writer: W) -> Result<(), ReportError> {
        let mut wtr = Writer::from_writer(writer);

        // Write headers
        wtr.write_record([
            "benchmark_id",
            "table_format",
            "engine",
            "total_queries",
            "successful_queries",
            "failed_queries",
            "success_rate_percent",
            "avg_execution_time_ms",
            "min_execution_time_ms",
            "max_execution_time_ms",
            "throughput",
            "efficiency_score",
            "rank_avg_time",
            "rank_throughput",
            "rank_efficiency",
        ])?;

        // Write data rows
        for row in &report.rows {
            wtr.write_record(&[
                report.benchmark_id.to_string(),
                report.table_format.to_string(),
                row.engine.clone(),
                row.total_queries.to_string(),
                row.successful_queries.to_string(),
                row.failed_queries.to_string(),
                format!("{:.2}", row.success_rate_percent),
                format!("{:.2}", row.avg_execution_time_ms),
                format!("{:.2}", row.min_execution_time_ms),
                format!("{:.2}", row.max_execution_time_ms),
                format!("{:.4}", row.throughput),
                format!("{:.4}", row.efficiency_score),
                row.rank_avg_time.map(|r| r.to_string()).unwrap_or_default(),
                row.rank_throughput.to_string(),
                row.rank_efficiency.to_string(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Export the comparison rows to a string
    pub fn to_string(report: &ComparisonReport) -> Result<String, ReportError> {
        let mut buf = Vec::new();
        Self::write(report, &mut buf)?;
        String::from_utf8(buf).map_err(|e| ReportError::Encoding(e.to_string()))
    }
}
