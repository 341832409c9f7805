//! Efficiency score strategies

use crate::config::EfficiencyStrategy;

const BYTES_PER_GIB: f64 = (1u64 << 30) as f64;

/// Inputs an efficiency strategy may weigh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencyInputs {
    /// Successful queries per second
    pub throughput: f64,
    /// Successful / total
    pub success_ratio: f64,
    /// Mean CPU time of successful executions
    pub avg_cpu_time_ms: f64,
    /// Mean peak memory of successful executions
    pub avg_peak_memory_bytes: f64,
    /// Number of successful executions
    pub successful: usize,
}

/// Computes the composite efficiency score of a result
pub trait EfficiencyScorer: Send + Sync {
    /// Name stored on the result
    fn name(&self) -> &'static str;

    /// Score for the given inputs (0 when nothing succeeded)
    fn score(&self, inputs: &EfficiencyInputs) -> f64;
}

/// Throughput scaled by success ratio and divided by resource cost
///
/// `throughput * success_ratio / (1 + avg_cpu_seconds + avg_peak_memory_gib)`
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceWeighted;

impl EfficiencyScorer for ResourceWeighted {
    fn name(&self) -> &'static str {
        "resource_weighted"
    }

    fn score(&self, inputs: &EfficiencyInputs) -> f64 {
        if inputs.successful == 0 {
            return 0.0;
        }
        let cost =
            1.0 + inputs.avg_cpu_time_ms / 1000.0 + inputs.avg_peak_memory_bytes / BYTES_PER_GIB;
        inputs.throughput * inputs.success_ratio / cost
    }
}

/// Throughput alone
#[derive(Debug, Default, Clone, Copy)]
pub struct ThroughputOnly;

impl EfficiencyScorer for ThroughputOnly {
    fn name(&self) -> &'static str {
        "throughput_only"
    }

    fn score(&self, inputs: &EfficiencyInputs) -> f64 {
        if inputs.successful == 0 {
            return 0.0;
        }
        inputs.throughput
    }
}

/// Scorer for a configured strategy
pub fn scorer_for(strategy: EfficiencyStrategy) -> Box<dyn EfficiencyScorer> {
    match strategy {
        EfficiencyStrategy::ResourceWeighted => Box::new(ResourceWeighted),
        EfficiencyStrategy::ThroughputOnly => Box::new(ThroughputOnly),
    }
}
