//! Error types for lakehouse-bench-core

use std::fmt;

use thiserror::Error;

/// Classification of orchestration-level errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchErrorKind {
    /// Unknown benchmark or query
    NotFound,
    /// Run requested on a benchmark that is not in the `created` state
    InvalidState,
    /// No selected engine passed its pre-flight ping
    EngineUnavailable,
    /// The engine returned an error or a malformed result
    ExecutionFailure,
    /// A query exceeded its time budget
    Timeout,
    /// The run was cancelled
    Cancelled,
    /// A caller violated a documented precondition
    Precondition,
    /// The repository failed to load or persist a record
    Storage,
    /// Invalid or missing configuration
    Config,
    /// Internal orchestration fault (tracker misuse, worker panic)
    Orchestration,
}

impl fmt::Display for BenchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BenchErrorKind::NotFound => "not found",
            BenchErrorKind::InvalidState => "invalid state",
            BenchErrorKind::EngineUnavailable => "engine unavailable",
            BenchErrorKind::ExecutionFailure => "execution failure",
            BenchErrorKind::Timeout => "timeout",
            BenchErrorKind::Cancelled => "cancelled",
            BenchErrorKind::Precondition => "precondition failed",
            BenchErrorKind::Storage => "storage error",
            BenchErrorKind::Config => "configuration error",
            BenchErrorKind::Orchestration => "orchestration error",
        };
        f.write_str(name)
    }
}

/// Core error type returned by the orchestrator and aggregator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct BenchError {
    /// Error classification
    pub kind: BenchErrorKind,
    /// Human readable detail
    pub message: String,
}

impl BenchError {
    /// Create an error of the given kind
    pub fn new(kind: BenchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Unknown benchmark or query
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::NotFound, message)
    }

    /// Benchmark is not in a state that allows the operation
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::InvalidState, message)
    }

    /// No usable engine
    pub fn engine_unavailable(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::EngineUnavailable, message)
    }

    /// Documented precondition violated
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Precondition, message)
    }

    /// Repository failure
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Storage, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Config, message)
    }

    /// Required builder field was not provided
    pub fn missing_config(field: &str) -> Self {
        Self::config(format!("missing required field: {field}"))
    }

    /// Internal orchestration fault
    pub fn orchestration(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Orchestration, message)
    }

    /// Whether this error aborts a run (as opposed to a per-query failure)
    pub fn is_orchestration_fault(&self) -> bool {
        matches!(
            self.kind,
            BenchErrorKind::Storage | BenchErrorKind::Orchestration
        )
    }
}

impl From<crate::traits::RepositoryError> for BenchError {
    fn from(err: crate::traits::RepositoryError) -> Self {
        match err {
            crate::traits::RepositoryError::NotFound(what) => BenchError::not_found(what),
            crate::traits::RepositoryError::Invalid(what) => BenchError::precondition(what),
            other => BenchError::storage(other.to_string()),
        }
    }
}

impl From<crate::tracker::TrackerError> for BenchError {
    fn from(err: crate::tracker::TrackerError) -> Self {
        BenchError::orchestration(err.to_string())
    }
}

impl From<crate::config::ConfigError> for BenchError {
    fn from(err: crate::config::ConfigError) -> Self {
        BenchError::config(err.to_string())
    }
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_kind() {
        let err = BenchError::not_found("benchmark 7");
        assert_eq!(err.to_string(), "not found: benchmark 7");
    }

    #[test]
    fn test_missing_config_message() {
        let err = BenchError::missing_config("repository");
        assert_eq!(err.kind, BenchErrorKind::Config);
        assert!(err.message.contains("repository"));
    }

    #[test]
    fn test_orchestration_fault_classification() {
        assert!(BenchError::storage("disk full").is_orchestration_fault());
        assert!(BenchError::orchestration("worker panicked").is_orchestration_fault());
        assert!(!BenchError::not_found("x").is_orchestration_fault());
        assert!(!BenchError::engine_unavailable("x").is_orchestration_fault());
    }

    #[test]
    fn test_repository_not_found_maps_to_not_found() {
        let err: BenchError = crate::traits::RepositoryError::NotFound("benchmark 3".into()).into();
        assert_eq!(err.kind, BenchErrorKind::NotFound);

        let err: BenchError = crate::traits::RepositoryError::Backend("io".into()).into();
        assert_eq!(err.kind, BenchErrorKind::Storage);
    }
}
