//! Builder pattern for Orchestrator construction

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::aggregator::{EfficiencyScorer, ResultAggregator};
use crate::config::{EnginePoolConfig, OrchestratorConfig};
use crate::error::{BenchError, BenchResult};
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::tracker::ExecutionTracker;
use crate::traits::{BenchmarkRepository, EngineClient};

use super::executor::{Inner, Orchestrator};

/// Builder for creating an Orchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new()
///     .repository(repository)
///     .engine(trino_client)
///     .engine(starrocks_client)
///     .concurrency(4)
///     .metrics(metrics)
///     .build()?;
///
/// let summary = orchestrator.run_to_completion(benchmark_id).await?;
/// ```
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    repository: Option<Arc<dyn BenchmarkRepository>>,
    clients: HashMap<String, Arc<dyn EngineClient>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    tracker: Option<Arc<ExecutionTracker>>,
    scorer: Option<Box<dyn EfficiencyScorer>>,
    first_execution_id: u64,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default configuration
    pub fn new() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            repository: None,
            clients: HashMap::new(),
            metrics: None,
            tracker: None,
            scorer: None,
            first_execution_id: 1,
        }
    }

    /// Set the full orchestrator configuration
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default per-engine concurrency
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.default_concurrency = concurrency;
        self
    }

    /// Set the default per-query timeout
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.config.query_timeout = timeout;
        self
    }

    /// Override pool settings for one engine
    pub fn engine_pool(mut self, engine: impl Into<String>, pool: EnginePoolConfig) -> Self {
        self.config.engines.insert(engine.into(), pool);
        self
    }

    /// Set the benchmark repository
    pub fn repository(mut self, repository: Arc<dyn BenchmarkRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Register an engine client under its engine name
    pub fn engine(mut self, client: Arc<dyn EngineClient>) -> Self {
        self.clients.insert(client.engine_name().to_string(), client);
        self
    }

    /// Register several engine clients
    pub fn engines(mut self, clients: impl IntoIterator<Item = Arc<dyn EngineClient>>) -> Self {
        for client in clients {
            self = self.engine(client);
        }
        self
    }

    /// Set the metrics sink (defaults to [`NoopMetrics`])
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Share an existing execution tracker
    pub fn tracker(mut self, tracker: Arc<ExecutionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Replace the configured efficiency strategy with a custom scorer
    pub fn efficiency_scorer(mut self, scorer: Box<dyn EfficiencyScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// First execution id handed out (ids are unique per orchestrator)
    pub fn first_execution_id(mut self, id: u64) -> Self {
        self.first_execution_id = id;
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if the repository or every engine client is missing,
    /// or if configuration validation fails.
    pub fn build(self) -> BenchResult<Orchestrator> {
        let repository = self
            .repository
            .ok_or_else(|| BenchError::missing_config("repository"))?;

        if self.clients.is_empty() {
            return Err(BenchError::missing_config("engines"));
        }

        self.config.validate()?;

        let aggregator = match self.scorer {
            Some(scorer) => ResultAggregator::with_scorer(scorer),
            None => ResultAggregator::new(self.config.efficiency),
        };

        tracing::debug!(
            engines = ?self.clients.keys().collect::<Vec<_>>(),
            default_concurrency = self.config.default_concurrency,
            efficiency = aggregator.strategy_name(),
            "Orchestrator configured"
        );

        Ok(Orchestrator::from_inner(Inner {
            repository,
            clients: self.clients,
            tracker: self
                .tracker
                .unwrap_or_else(|| Arc::new(ExecutionTracker::new())),
            aggregator: Arc::new(aggregator),
            metrics: self
                .metrics
                .unwrap_or_else(|| Arc::new(NoopMetrics) as Arc<dyn MetricsSink>),
            config: self.config,
            active: Mutex::new(HashMap::new()),
            next_execution_id: AtomicU64::new(self.first_execution_id),
        }))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
