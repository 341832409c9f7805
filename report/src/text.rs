//! Plain-text table rendering

use std::fmt::Write;

use crate::comparison::ComparisonReport;

const HEADERS: [&str; 8] = [
    "engine", "ok/total", "success %", "avg ms", "min ms", "max ms", "qps", "efficiency",
];

/// Render the report as an aligned text table followed by the leaders
pub fn render_text(report: &ComparisonReport) -> String {
    let rows: Vec<[String; 8]> = report
        .rows
        .iter()
        .map(|row| {
            [
                row.engine.clone(),
                format!("{}/{}", row.successful_queries, row.total_queries),
                format!("{:.1}", row.success_rate_percent),
                format!("{:.2}", row.avg_execution_time_ms),
                format!("{:.2}", row.min_execution_time_ms),
                format!("{:.2}", row.max_execution_time_ms),
                format!("{:.3}", row.throughput),
                format!("{:.3}", row.efficiency_score),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Benchmark {} ({}), efficiency: {}",
        report.benchmark_id, report.table_format, report.efficiency_strategy
    );

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                // Engine name left-aligned, numbers right-aligned
                if i == 0 {
                    format!("{cell:<width$}")
                } else {
                    format!("{cell:>width$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    let headers: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    let header = line(&headers);
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{}", "-".repeat(header.len()));
    for row in &rows {
        let _ = writeln!(out, "{}", line(row));
    }

    let none = "-";
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Fastest: {}",
        report.fastest_engine.as_deref().unwrap_or(none)
    );
    let _ = writeln!(
        out,
        "Highest throughput: {}",
        report.highest_throughput.as_deref().unwrap_or(none)
    );
    let _ = writeln!(
        out,
        "Most efficient: {}",
        report.most_efficient.as_deref().unwrap_or(none)
    );
    out
}
