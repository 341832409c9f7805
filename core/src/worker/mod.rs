//! Worker module for executing planned queries against one engine
//!
//! An [`EngineWorker`] is a tokio task in one engine's pool. Workers of the
//! same pool share the plan and a claim cursor, so every planned execution is
//! dispatched exactly once no matter how the pool is sized. Each claimed item
//! goes through the same loop:
//!
//! 1. Wait for the engine's rate limiter (if configured)
//! 2. Mark the execution `running` in the tracker
//! 3. Execute via the engine's [`EngineClient`](crate::traits::EngineClient),
//!    bounded by the per-query timeout and the run's cancellation token
//! 4. Mark the execution `completed` or `failed` and report metrics
//!
//! # Example
//!
//! ```ignore
//! use lakehouse_bench_core::worker::{EngineWorker, WorkerBuilder};
//!
//! let worker = WorkerBuilder::new(0)
//!     .client(client)
//!     .tracker(tracker)
//!     .work(plan, cursor)
//!     .query_timeout(Duration::from_secs(60))
//!     .build()?;
//!
//! let stats = worker.run(cancel).await?;
//! println!("Completed: {}", stats.completed);
//! ```

mod builder;
mod executor;
mod rate_limiter;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::EngineWorker;
pub use rate_limiter::EngineRateLimiter;
pub use stats::WorkerStats;

use crate::benchmark::{ExecutionId, QueryId};
use std::sync::Arc;

/// One unit of work in an engine's plan
#[derive(Debug, Clone)]
pub struct PlannedExecution {
    /// Execution registered in the tracker
    pub execution_id: ExecutionId,
    /// Query being executed
    pub query_id: QueryId,
    /// Query display name
    pub query_name: String,
    /// SQL text
    pub sql: Arc<str>,
}
