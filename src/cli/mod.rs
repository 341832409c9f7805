//! CLI argument parsing and command dispatch

mod run;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use lakehouse_bench_core::{BenchmarkId, BenchmarkRepository};
use lakehouse_bench_engines::create_clients;
use lakehouse_bench_report::{write_report, ReportFormat};
use lakehouse_bench_storage::JsonFileRepository;

use crate::config::{load_benchmark, AppConfig, LogFormat};
use crate::logging;

/// File name of the JSON store inside `--data-dir`
pub(crate) const STORE_FILE: &str = "store.json";

#[derive(Parser)]
#[command(name = "lakehouse-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the log format from the config file
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a benchmark from a definition file and run it
    Run {
        /// Path to the engine/orchestrator config file
        #[arg(short, long, env = "LAKEHOUSE_BENCH_CONFIG")]
        config: PathBuf,

        /// Path to the benchmark definition file
        #[arg(short, long)]
        benchmark: PathBuf,

        /// Directory for persisted benchmarks and results (in-memory if unset)
        #[arg(short, long, env = "LAKEHOUSE_BENCH_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format (text, csv, json)
        #[arg(short, long, default_value = "text")]
        format: ReportFormat,
    },

    /// Ping every active engine and print a health table
    Ping {
        /// Path to the engine/orchestrator config file
        #[arg(short, long, env = "LAKEHOUSE_BENCH_CONFIG")]
        config: PathBuf,
    },

    /// Validate a config file and optionally a benchmark definition
    Validate {
        /// Path to the engine/orchestrator config file
        #[arg(short, long, env = "LAKEHOUSE_BENCH_CONFIG")]
        config: PathBuf,

        /// Path to a benchmark definition file
        #[arg(short, long)]
        benchmark: Option<PathBuf>,
    },

    /// Re-render the report of a stored benchmark
    Report {
        /// Directory holding the JSON store
        #[arg(short, long, env = "LAKEHOUSE_BENCH_DATA_DIR")]
        data_dir: PathBuf,

        /// Benchmark id
        #[arg(short, long)]
        benchmark_id: u64,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format (text, csv, json)
        #[arg(short, long, default_value = "text")]
        format: ReportFormat,
    },
}

impl Cli {
    /// Initialize logging and run the selected command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Run {
                config,
                benchmark,
                data_dir,
                output,
                format,
            } => {
                let app = AppConfig::load(&config)?;
                logging::init(self.log_format.unwrap_or(app.log_format), self.verbose);
                let def = load_benchmark(&benchmark)?;
                run::execute(app, def, data_dir, output, format).await
            }
            Commands::Ping { config } => {
                let app = AppConfig::load(&config)?;
                logging::init(self.log_format.unwrap_or(app.log_format), self.verbose);
                ping(&app).await
            }
            Commands::Validate { config, benchmark } => {
                logging::init(self.log_format.unwrap_or_default(), self.verbose);
                validate(&config, benchmark.as_deref())
            }
            Commands::Report {
                data_dir,
                benchmark_id,
                output,
                format,
            } => {
                logging::init(self.log_format.unwrap_or_default(), self.verbose);
                report(&data_dir, BenchmarkId(benchmark_id), output.as_deref(), format).await
            }
        }
    }
}

/// Open `path` for writing, or stdout when unset
pub(crate) fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Ok(Box::new(io::BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

async fn ping(app: &AppConfig) -> Result<()> {
    let clients = create_clients(&app.engines).context("Failed to create engine clients")?;
    let timeout = app.orchestrator.ping_timeout;

    let checks = clients.iter().map(|client| async move {
        let start = Instant::now();
        let outcome = match tokio::time::timeout(timeout, client.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("no answer within {}ms", timeout.as_millis())),
        };
        (client.engine_name().to_string(), outcome, start.elapsed())
    });
    let outcomes = join_all(checks).await;

    let width = outcomes
        .iter()
        .map(|(name, _, _)| name.len())
        .max()
        .unwrap_or(0)
        .max("engine".len());

    println!("{:<width$}  {:<6}  {:>8}  detail", "engine", "status", "ms");
    let mut healthy = 0;
    for (name, outcome, elapsed) in &outcomes {
        let ms = elapsed.as_secs_f64() * 1000.0;
        match outcome {
            Ok(()) => {
                healthy += 1;
                println!("{name:<width$}  {:<6}  {ms:>8.1}", "ok");
            }
            Err(detail) => println!("{name:<width$}  {:<6}  {ms:>8.1}  {detail}", "down"),
        }
    }

    for client in &clients {
        client.close().await;
    }

    if healthy == 0 {
        anyhow::bail!("No engine answered ping");
    }
    Ok(())
}

fn validate(config: &Path, benchmark: Option<&Path>) -> Result<()> {
    let app = AppConfig::load(config)?;
    println!(
        "Config OK: {} engine(s), {} active",
        app.engines.len(),
        app.active_engines().len()
    );

    if let Some(path) = benchmark {
        let def = load_benchmark(path)?;
        let active = app.active_engines();
        let missing: Vec<&str> = def
            .engines
            .iter()
            .map(String::as_str)
            .filter(|e| !active.contains(e))
            .collect();
        if !missing.is_empty() {
            anyhow::bail!(
                "Benchmark '{}' selects engines not active in the config: {}",
                def.name,
                missing.join(", ")
            );
        }
        println!(
            "Benchmark OK: '{}' with {} queries on {}",
            def.name,
            def.queries.len(),
            def.engines.join(", ")
        );
    }
    Ok(())
}

async fn report(
    data_dir: &Path,
    benchmark_id: BenchmarkId,
    output: Option<&Path>,
    format: ReportFormat,
) -> Result<()> {
    let store = data_dir.join(STORE_FILE);
    if !store.exists() {
        anyhow::bail!("No benchmark store at {}", store.display());
    }
    let repository = JsonFileRepository::open(&store)
        .await
        .with_context(|| format!("Failed to open {}", store.display()))?;
    let results = repository
        .list_results(benchmark_id)
        .await
        .with_context(|| format!("Failed to load results of benchmark {benchmark_id}"))?;

    let writer = open_output(output)?;
    write_report(&results, format, writer)
        .with_context(|| format!("Failed to render report of benchmark {benchmark_id}"))?;
    Ok(())
}
