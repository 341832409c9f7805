//! `run` command: create a benchmark, execute it with live progress, report

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use lakehouse_bench_core::{
    Benchmark, BenchmarkRepository, InMemoryMetrics, NewBenchmark, OrchestratorBuilder,
    RunSummary,
};
use lakehouse_bench_engines::create_clients;
use lakehouse_bench_report::{write_report, ReportFormat};
use lakehouse_bench_storage::{JsonFileRepository, MemoryRepository};

use super::{open_output, STORE_FILE};
use crate::config::{AppConfig, LogFormat};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Where benchmarks and results are kept for this invocation
enum Store {
    Memory(Arc<MemoryRepository>),
    File(Arc<JsonFileRepository>),
}

impl Store {
    async fn open(data_dir: Option<PathBuf>) -> Result<Self> {
        match data_dir {
            Some(dir) => {
                let path = dir.join(STORE_FILE);
                let repository = JsonFileRepository::open(&path)
                    .await
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                Ok(Store::File(Arc::new(repository)))
            }
            None => Ok(Store::Memory(Arc::new(MemoryRepository::new()))),
        }
    }

    async fn create_benchmark(&self, def: NewBenchmark) -> Result<Benchmark> {
        let created = match self {
            Store::Memory(repo) => repo.create_benchmark(def).await,
            Store::File(repo) => repo.create_benchmark(def).await,
        };
        created.context("Failed to create benchmark")
    }

    fn repository(&self) -> Arc<dyn BenchmarkRepository> {
        match self {
            Store::Memory(repo) => repo.clone() as Arc<dyn BenchmarkRepository>,
            Store::File(repo) => repo.clone() as Arc<dyn BenchmarkRepository>,
        }
    }
}

pub(super) async fn execute(
    app: AppConfig,
    def: NewBenchmark,
    data_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    format: ReportFormat,
) -> Result<()> {
    let clients = create_clients(&app.engines).context("Failed to create engine clients")?;
    let store = Store::open(data_dir).await?;
    let benchmark = store.create_benchmark(def).await?;
    let metrics = Arc::new(InMemoryMetrics::new());

    let orchestrator = OrchestratorBuilder::new()
        .config(app.orchestrator.clone())
        .repository(store.repository())
        .engines(clients)
        .metrics(metrics.clone())
        .build()
        .context("Failed to build orchestrator")?;

    print_banner(&benchmark);

    let handle = match orchestrator.run(benchmark.id).await {
        Ok(handle) => handle,
        Err(e) => {
            orchestrator.shutdown().await;
            return Err(e).with_context(|| format!("Failed to start benchmark {}", benchmark.id));
        }
    };

    if !handle.unavailable_engines().is_empty() {
        tracing::warn!(
            benchmark_id = %benchmark.id,
            unavailable = ?handle.unavailable_engines(),
            "Some engines failed pre-flight and were excluded"
        );
    }

    let pb = if app.log_format == LogFormat::Json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(handle.planned_executions() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let token = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling benchmark");
            token.cancel();
        }
    });

    let benchmark_id = handle.benchmark_id();
    let wait = handle.wait();
    tokio::pin!(wait);
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);

    let outcome = loop {
        tokio::select! {
            summary = &mut wait => break summary,
            _ = ticker.tick() => {
                if let Ok(status) = orchestrator.get_status(benchmark_id).await {
                    pb.set_position((status.completed + status.failed) as u64);
                    pb.set_message(format!("{} running, {} failed", status.running, status.failed));
                }
            }
        }
    };

    interrupt.abort();
    pb.finish_and_clear();
    orchestrator.shutdown().await;

    let summary = outcome.with_context(|| format!("Benchmark {benchmark_id} failed"))?;
    print_summary(&summary);

    for (engine, latency) in metrics.snapshot().latency {
        tracing::debug!(
            engine = %engine,
            count = latency.count,
            p50_ms = latency.p50,
            p99_ms = latency.p99,
            "Execution latency"
        );
    }

    if summary.results.is_empty() {
        anyhow::bail!("Benchmark {benchmark_id} produced no results");
    }

    let writer = open_output(output.as_deref())?;
    write_report(&summary.results, format, writer).context("Failed to write report")?;
    if let Some(path) = output {
        eprintln!("Report written to {}", path.display());
    }
    Ok(())
}

fn print_banner(benchmark: &Benchmark) {
    eprintln!("{}", "=".repeat(70));
    eprintln!("Benchmark {}: {}", benchmark.id, benchmark.name);
    eprintln!("{}", "=".repeat(70));
    eprintln!("Table format: {}", benchmark.table_format);
    eprintln!("Dataset:      {}", benchmark.dataset_name);
    eprintln!("Engines:      {}", benchmark.engines.join(", "));
    eprintln!("Queries:      {}", benchmark.queries.len());
    eprintln!();
}

fn print_summary(summary: &RunSummary) {
    eprintln!("{}", "=".repeat(70));
    eprintln!(
        "Benchmark {} {} in {:.2}s",
        summary.benchmark_id,
        summary.status,
        summary.elapsed.as_secs_f64()
    );
    eprintln!(
        "Executions: {} planned, {} completed, {} failed, {} not dispatched",
        summary.planned, summary.completed, summary.failed, summary.never_dispatched
    );
    if summary.cancelled {
        eprintln!("Run was cancelled");
    }
    if !summary.unavailable_engines.is_empty() {
        eprintln!("Unavailable: {}", summary.unavailable_engines.join(", "));
    }
    eprintln!("{}", "=".repeat(70));
    eprintln!();
}
