//! Orchestrator configuration types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Orchestrator configuration
///
/// Controls per-engine pool sizing, timeouts, pre-flight behaviour and the
/// efficiency strategy used when aggregating results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Worker pool size for engines without an explicit override
    pub default_concurrency: usize,

    /// Per-query timeout for engines without an explicit override
    #[serde(with = "humantime_serde")]
    pub query_timeout: Duration,

    /// Upper bound on a single pre-flight ping
    #[serde(with = "humantime_serde")]
    pub ping_timeout: Duration,

    /// Capture EXPLAIN output for successful executions
    pub capture_plans: bool,

    /// Fail the run if any selected engine fails pre-flight
    pub require_all_engines: bool,

    /// Efficiency score strategy
    pub efficiency: EfficiencyStrategy,

    /// Retry policy for pre-flight pings
    pub preflight_retry: PreflightRetry,

    /// Per-engine pool overrides, keyed by engine name
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub engines: HashMap<String, EnginePoolConfig>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_concurrency: 1,
            query_timeout: Duration::from_secs(300),
            ping_timeout: Duration::from_secs(10),
            capture_plans: false,
            require_all_engines: false,
            efficiency: EfficiencyStrategy::default(),
            preflight_retry: PreflightRetry::default(),
            engines: HashMap::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Create a new config with the given default concurrency
    pub fn new(default_concurrency: usize) -> Self {
        Self {
            default_concurrency,
            ..Default::default()
        }
    }

    /// Set the default per-query timeout
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Set the pre-flight ping timeout
    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    /// Enable or disable plan capture
    pub fn with_capture_plans(mut self, capture: bool) -> Self {
        self.capture_plans = capture;
        self
    }

    /// Require every selected engine to pass pre-flight
    pub fn with_require_all_engines(mut self, require: bool) -> Self {
        self.require_all_engines = require;
        self
    }

    /// Set the efficiency strategy
    pub fn with_efficiency(mut self, strategy: EfficiencyStrategy) -> Self {
        self.efficiency = strategy;
        self
    }

    /// Set the pre-flight retry policy
    pub fn with_preflight_retry(mut self, retry: PreflightRetry) -> Self {
        self.preflight_retry = retry;
        self
    }

    /// Override pool settings for one engine
    pub fn with_engine_pool(mut self, engine: impl Into<String>, pool: EnginePoolConfig) -> Self {
        self.engines.insert(engine.into(), pool);
        self
    }

    /// Effective pool settings for an engine
    pub fn pool_for(&self, engine: &str) -> ResolvedPool {
        let overrides = self.engines.get(engine);
        ResolvedPool {
            concurrency: overrides
                .and_then(|p| p.concurrency)
                .unwrap_or(self.default_concurrency),
            query_timeout: overrides
                .and_then(|p| p.query_timeout)
                .unwrap_or(self.query_timeout),
            rate_limit: overrides.and_then(|p| p.rate_limit),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(
                "default concurrency must be at least 1".into(),
            ));
        }

        if self.query_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "query timeout must be positive".into(),
            ));
        }

        if self.ping_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "ping timeout must be positive".into(),
            ));
        }

        if self.preflight_retry.attempts == 0 {
            return Err(ConfigError::InvalidRetry(
                "pre-flight attempts must be at least 1".into(),
            ));
        }

        for (engine, pool) in &self.engines {
            if pool.concurrency == Some(0) {
                return Err(ConfigError::InvalidConcurrency(format!(
                    "concurrency for engine '{engine}' must be at least 1"
                )));
            }
            if pool.query_timeout.is_some_and(|t| t.is_zero()) {
                return Err(ConfigError::InvalidTimeout(format!(
                    "query timeout for engine '{engine}' must be positive"
                )));
            }
            if let Some(rps) = pool.rate_limit {
                if rps <= 0.0 {
                    return Err(ConfigError::InvalidRateLimit(format!(
                        "rate limit for engine '{engine}' must be positive"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Pool overrides for a single engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnginePoolConfig {
    /// Number of concurrent executions this engine tolerates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Per-query timeout
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub query_timeout: Option<Duration>,

    /// Maximum queries per second sent to this engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<f64>,
}

impl EnginePoolConfig {
    /// Pool override with the given concurrency
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency: Some(concurrency),
            ..Default::default()
        }
    }

    /// Set the per-query timeout
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Set the rate limit
    pub fn rate_limit(mut self, rps: f64) -> Self {
        self.rate_limit = Some(rps);
        self
    }
}

/// Pool settings after applying defaults
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPool {
    /// Worker count
    pub concurrency: usize,
    /// Per-query timeout
    pub query_timeout: Duration,
    /// Optional queries-per-second limit
    pub rate_limit: Option<f64>,
}

/// How the efficiency score is computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyStrategy {
    /// Throughput scaled by success rate and divided by resource cost
    #[default]
    ResourceWeighted,
    /// Throughput only
    ThroughputOnly,
}

/// Retry policy for pre-flight pings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightRetry {
    /// Total ping attempts per engine (1 = no retry)
    pub attempts: u32,

    /// Delay between attempts
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
}

impl Default for PreflightRetry {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid concurrency value
    #[error("Invalid concurrency: {0}")]
    InvalidConcurrency(String),

    /// Invalid timeout
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    /// Invalid rate limit
    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Invalid retry policy
    #[error("Invalid retry policy: {0}")]
    InvalidRetry(String),
}
