//! Engine enumeration
//!
//! Used for configuration parsing and client factory dispatch.

use serde::{Deserialize, Serialize};

/// Enumeration of supported SQL engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineKind {
    /// Trino coordinator (client protocol v1)
    #[serde(rename = "trino")]
    Trino,
    /// PrestoDB coordinator (client protocol v1)
    #[serde(rename = "presto")]
    Presto,
    /// StarRocks frontend (HTTP SQL API)
    #[serde(rename = "starrocks")]
    StarRocks,
}

impl EngineKind {
    /// Returns the display name for this engine.
    pub fn display_name(&self) -> &'static str {
        match self {
            EngineKind::Trino => "Trino",
            EngineKind::Presto => "Presto",
            EngineKind::StarRocks => "StarRocks",
        }
    }

    /// Returns the identifier string for this engine.
    pub fn id(&self) -> &'static str {
        match self {
            EngineKind::Trino => "trino",
            EngineKind::Presto => "presto",
            EngineKind::StarRocks => "starrocks",
        }
    }

    /// Default HTTP port of the coordinator or frontend.
    pub fn default_port(&self) -> u16 {
        match self {
            EngineKind::Trino | EngineKind::Presto => 8080,
            EngineKind::StarRocks => 8030,
        }
    }

    /// Whether this engine speaks the `/v1/statement` protocol.
    pub fn uses_statement_protocol(&self) -> bool {
        matches!(self, EngineKind::Trino | EngineKind::Presto)
    }

    /// Returns all supported engines.
    pub fn all() -> &'static [EngineKind] {
        &[EngineKind::Trino, EngineKind::Presto, EngineKind::StarRocks]
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trino" | "trinodb" => Ok(EngineKind::Trino),
            "presto" | "prestodb" => Ok(EngineKind::Presto),
            "starrocks" | "star_rocks" | "star-rocks" => Ok(EngineKind::StarRocks),
            _ => Err(format!("Unknown engine: {}", s)),
        }
    }
}
