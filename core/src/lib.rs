//! lakehouse-bench-core: Orchestration core for multi-engine SQL benchmarks
//!
//! This crate provides the engine-agnostic pieces of a benchmark run,
//! including:
//!
//! - Benchmark, query, execution and result records
//! - Core traits (EngineClient, BenchmarkRepository)
//! - The execution tracker and per-engine worker pools
//! - Result aggregation and efficiency scoring
//! - The orchestrator driving a benchmark through its lifecycle

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod benchmark;
pub mod config;
pub mod error;
pub mod execution;
pub mod metrics;
pub mod orchestrator;
pub mod result;
pub mod tracker;
pub mod traits;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use aggregator::{EfficiencyInputs, EfficiencyScorer, ResultAggregator};
pub use benchmark::*;
pub use config::*;
pub use error::*;
pub use execution::*;
pub use metrics::*;
pub use orchestrator::{BenchmarkStatusReport, Orchestrator, OrchestratorBuilder, RunHandle, RunSummary};
pub use result::*;
pub use tracker::{ExecutionTracker, TrackerError, TrackerSnapshot};
pub use traits::*;
pub use worker::{EngineRateLimiter, EngineWorker, WorkerBuilder, WorkerStats};
