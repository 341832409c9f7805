//! Orchestrator for benchmark lifecycle management
//!
//! The Orchestrator coordinates a complete benchmark run:
//! - Pre-flight pings of the selected engines
//! - Planning one execution per (query, live engine)
//! - Spawning one bounded worker pool per engine
//! - Aggregating and saving each engine's result as its pool drains
//! - Driving the benchmark status to `completed` or `failed`
//!
//! # Example
//!
//! ```ignore
//! use lakehouse_bench_core::OrchestratorBuilder;
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .repository(repository)
//!     .engines(clients)
//!     .concurrency(4)
//!     .build()?;
//!
//! let handle = orchestrator.run(benchmark_id).await?;
//! let summary = handle.wait().await?;
//! ```

mod builder;
mod executor;
mod handle;
mod plan;
mod pool;
mod preflight;

pub use builder::OrchestratorBuilder;
pub use executor::Orchestrator;
pub use handle::{BenchmarkStatusReport, RunHandle, RunSummary};

#[cfg(test)]
mod tests;
