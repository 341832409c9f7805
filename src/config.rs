//! Application configuration file

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use lakehouse_bench_core::{NewBenchmark, OrchestratorConfig};
use lakehouse_bench_engines::EngineConfig;
use serde::{Deserialize, Serialize};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line events
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

/// Contents of `--config`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log output format
    pub log_format: LogFormat,

    /// Orchestrator settings
    pub orchestrator: OrchestratorConfig,

    /// Engine connection descriptors
    pub engines: Vec<EngineConfig>,
}

impl AppConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate orchestrator settings and every engine descriptor
    pub fn validate(&self) -> Result<()> {
        self.orchestrator
            .validate()
            .context("Invalid orchestrator configuration")?;

        if self.engines.is_empty() {
            anyhow::bail!("No engines configured");
        }

        let mut names = HashSet::new();
        for engine in &self.engines {
            engine
                .validate()
                .with_context(|| format!("Invalid engine '{}'", engine.engine_name()))?;
            if !names.insert(engine.engine_name()) {
                anyhow::bail!("Duplicate engine name '{}'", engine.engine_name());
            }
        }
        Ok(())
    }

    /// Names of engines marked active
    pub fn active_engines(&self) -> Vec<&str> {
        self.engines
            .iter()
            .filter(|e| e.active)
            .map(|e| e.engine_name())
            .collect()
    }
}

/// Load and validate a benchmark definition
pub fn load_benchmark(path: &Path) -> Result<NewBenchmark> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read benchmark file: {}", path.display()))?;
    let def: NewBenchmark = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse benchmark file: {}", path.display()))?;
    def.validate()
        .map_err(|e| anyhow::anyhow!("Invalid benchmark '{}': {}", def.name, e))?;
    Ok(def)
}
