//! Metrics sink, counters and latency percentiles
//!
//! The orchestrator never touches a process-wide registry. It reports named
//! counters and per-engine latency samples through an injected
//! [`MetricsSink`]; exporting them is the caller's concern.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

/// Counters emitted by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    /// An execution finished with metrics
    ExecutionsCompleted,
    /// An execution finished with a failure
    ExecutionsFailed,
    /// A run was accepted
    BenchmarksStarted,
    /// A run reached `completed`
    BenchmarksCompleted,
    /// A run reached `failed`
    BenchmarksFailed,
}

impl Counter {
    /// Exported counter name
    pub fn name(&self) -> &'static str {
        match self {
            Counter::ExecutionsCompleted => "executions_completed",
            Counter::ExecutionsFailed => "executions_failed",
            Counter::BenchmarksStarted => "benchmarks_started",
            Counter::BenchmarksCompleted => "benchmarks_completed",
            Counter::BenchmarksFailed => "benchmarks_failed",
        }
    }
}

/// Destination for counters and latency samples
pub trait MetricsSink: Send + Sync {
    /// Increment a counter, optionally labelled with an engine
    fn increment(&self, counter: Counter, engine: Option<&str>);

    /// Record one query latency for an engine
    fn observe_latency(&self, engine: &str, elapsed: Duration);
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _counter: Counter, _engine: Option<&str>) {}

    fn observe_latency(&self, _engine: &str, _elapsed: Duration) {}
}

/// In-process sink keeping counters and HDR latency histograms
#[derive(Default)]
pub struct InMemoryMetrics {
    counters: Mutex<HashMap<(Counter, String), u64>>,
    latencies: Mutex<HashMap<String, LatencyHistogram>>,
}

impl InMemoryMetrics {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter (engine `None` = unlabelled)
    pub fn counter(&self, counter: Counter, engine: Option<&str>) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .get(&(counter, engine.unwrap_or_default().to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of a counter over all labels
    pub fn counter_total(&self, counter: Counter) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .iter()
            .filter(|((c, _), _)| *c == counter)
            .map(|(_, v)| *v)
            .sum()
    }

    /// Copy of all counters and per-engine latency percentiles
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let counters = counters
            .iter()
            .map(|((counter, engine), value)| {
                let key = if engine.is_empty() {
                    counter.name().to_string()
                } else {
                    format!("{}{{engine=\"{}\"}}", counter.name(), engine)
                };
                (key, *value)
            })
            .collect();

        let latencies = self.latencies.lock().unwrap_or_else(|e| e.into_inner());
        let latency = latencies
            .iter()
            .map(|(engine, histogram)| (engine.clone(), histogram.percentiles()))
            .collect();

        MetricsSnapshot { counters, latency }
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment(&self, counter: Counter, engine: Option<&str>) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        *counters
            .entry((counter, engine.unwrap_or_default().to_string()))
            .or_insert(0) += 1;
    }

    fn observe_latency(&self, engine: &str, elapsed: Duration) {
        let mut latencies = self.latencies.lock().unwrap_or_else(|e| e.into_inner());
        latencies
            .entry(engine.to_string())
            .or_default()
            .record(elapsed);
    }
}

impl std::fmt::Debug for InMemoryMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMetrics")
            .field("counters", &self.snapshot().counters)
            .finish()
    }
}

/// Point-in-time copy of an [`InMemoryMetrics`] sink
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Counter values keyed by `name` or `name{engine="..."}`
    pub counters: BTreeMap<String, u64>,
    /// Latency percentiles per engine
    pub latency: BTreeMap<String, LatencyPercentiles>,
}

/// Latency percentiles (all values in milliseconds)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct LatencyPercentiles {
    /// Number of samples
    pub count: u64,
    /// Minimum value
    pub min: f64,
    /// 50th percentile (median)
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
    /// Maximum value
    pub max: f64,
    /// Mean value
    pub mean: f64,
}

/// Max trackable latency: one hour in microseconds
const MAX_LATENCY_MICROS: u64 = 3_600_000_000;

/// HdrHistogram-backed latency recorder with microsecond precision
pub struct LatencyHistogram {
    histogram: hdrhistogram::Histogram<u64>,
}

impl LatencyHistogram {
    /// Empty histogram tracking 1us to one hour
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, MAX_LATENCY_MICROS, 3)
            .expect("histogram bounds are valid constants");
        Self { histogram }
    }

    /// Record a duration (saturates at one hour)
    pub fn record(&mut self, duration: Duration) {
        let micros = (duration.as_micros() as u64).clamp(1, MAX_LATENCY_MICROS);
        let _ = self.histogram.record(micros);
    }

    /// Number of recorded values
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Percentiles in milliseconds (all zero when empty)
    pub fn percentiles(&self) -> LatencyPercentiles {
        let h = &self.histogram;
        if h.is_empty() {
            return LatencyPercentiles::default();
        }
        let ms = |micros: u64| micros as f64 / 1000.0;

        LatencyPercentiles {
            count: h.len(),
            min: ms(h.min()),
            p50: ms(h.value_at_quantile(0.50)),
            p90: ms(h.value_at_quantile(0.90)),
            p95: ms(h.value_at_quantile(0.95)),
            p99: ms(h.value_at_quantile(0.99)),
            max: ms(h.max()),
            mean: h.mean() / 1000.0,
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}
