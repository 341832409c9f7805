//! Report generation for benchmark results
//!
//! This crate turns the per-engine results of one benchmark into a
//! [`ComparisonReport`] and renders it as:
//!
//! - A plain-text table
//! - CSV (one row per engine)
//! - JSON (comparison plus raw results)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod comparison;
mod csv_export;
mod json_export;
mod text;

#[cfg(test)]
mod test_util;

use std::io::Write;

use lakehouse_bench_core::{BenchmarkId, BenchmarkResult};
use serde::{Deserialize, Serialize};

pub use comparison::{ComparisonReport, EngineRow};
pub use csv_export::CsvExporter;
pub use json_export::JsonExporter;
pub use text::render_text;

/// Report errors
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// No results to compare
    #[error("no results to report")]
    EmptyResults,

    /// Results from different benchmarks were mixed
    #[error("results belong to different benchmarks ({0} and {1})")]
    MixedBenchmarks(BenchmarkId, BenchmarkId),

    /// CSV encoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output was not valid UTF-8
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Output format of a rendered report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Aligned plain-text table
    #[default]
    Text,
    /// CSV rows
    Csv,
    /// Pretty-printed JSON
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "table" | "txt" => Ok(ReportFormat::Text),
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

/// Build the comparison for `results` and write it in `format`
pub fn write_report<W: Write>(
    results: &[BenchmarkResult],
    format: ReportFormat,
    mut writer: W,
) -> Result<ComparisonReport, ReportError> {
    let report = ComparisonReport::from_results(results)?;
    match format {
        ReportFormat::Text => writer.write_all(render_text(&report).as_bytes())?,
        ReportFormat::Csv => CsvExporter::write(&report, &mut writer)?,
        ReportFormat::Json => {
            JsonExporter::write(&report, results, &mut writer)?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush()?;
    Ok(report)
}
