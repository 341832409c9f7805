//! Builder pattern for EngineWorker construction

use crate::error::{BenchError, BenchResult};
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::tracker::ExecutionTracker;
use crate::traits::EngineClient;

use super::executor::EngineWorker;
use super::rate_limiter::EngineRateLimiter;
use super::PlannedExecution;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating EngineWorker instances
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(0)
///     .client(client)
///     .tracker(tracker)
///     .work(plan, cursor)
///     .query_timeout(Duration::from_secs(30))
///     .rate_limiter(limiter)
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    client: Option<Arc<dyn EngineClient>>,
    tracker: Option<Arc<ExecutionTracker>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    work: Option<(Arc<[PlannedExecution]>, Arc<AtomicUsize>)>,
    rate_limiter: Option<Arc<EngineRateLimiter>>,
    query_timeout: Option<Duration>,
    capture_plans: bool,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            client: None,
            tracker: None,
            metrics: None,
            work: None,
            rate_limiter: None,
            query_timeout: None,
            capture_plans: false,
        }
    }

    /// Set the engine client
    pub fn client(mut self, client: Arc<dyn EngineClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the execution tracker
    pub fn tracker(mut self, tracker: Arc<ExecutionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Set the metrics sink (defaults to [`NoopMetrics`])
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set the shared plan and claim cursor
    pub fn work(mut self, work: Arc<[PlannedExecution]>, cursor: Arc<AtomicUsize>) -> Self {
        self.work = Some((work, cursor));
        self
    }

    /// Set the shared rate limiter (defaults to unlimited)
    pub fn rate_limiter(mut self, limiter: Arc<EngineRateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Set the per-query timeout
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Capture query plans after successful executions
    pub fn capture_plans(mut self, capture: bool) -> Self {
        self.capture_plans = capture;
        self
    }

    /// Build the EngineWorker
    ///
    /// # Errors
    /// Returns an error if any required field is missing.
    pub fn build(self) -> BenchResult<EngineWorker> {
        let client = self.client.ok_or(BenchError::missing_config("client"))?;
        let tracker = self.tracker.ok_or(BenchError::missing_config("tracker"))?;
        let (work, cursor) = self.work.ok_or(BenchError::missing_config("work"))?;
        let query_timeout = self
            .query_timeout
            .ok_or(BenchError::missing_config("query_timeout"))?;

        let metrics = self
            .metrics
            .unwrap_or_else(|| Arc::new(NoopMetrics) as Arc<dyn MetricsSink>);
        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| Arc::new(EngineRateLimiter::unlimited()));

        Ok(EngineWorker::new(
            self.id,
            client,
            tracker,
            metrics,
            work,
            cursor,
            rate_limiter,
            query_timeout,
        )
        .with_capture_plans(self.capture_plans))
    }
}
