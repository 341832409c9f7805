//! Engine connection descriptors
//!
//! An [`EngineConfig`] is everything needed to open a client for one engine.
//! The orchestrator never reads it; the factory turns it into an
//! [`EngineClient`](lakehouse_bench_core::EngineClient).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kind::EngineKind;

/// Configuration validation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// A required configuration field is missing.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A timeout value is out of acceptable range.
    #[error("invalid timeout: {0:?}")]
    InvalidTimeout(Duration),

    /// The poll interval is out of acceptable range.
    #[error("invalid poll interval: {0:?}")]
    InvalidPollInterval(Duration),
}

/// Connection descriptor for one engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name benchmarks use to select this engine (defaults to the kind id)
    #[serde(default)]
    pub name: Option<String>,

    /// Engine protocol
    pub kind: EngineKind,

    /// Coordinator or frontend host
    pub host: String,

    /// HTTP port (defaults to the kind's standard port)
    #[serde(default)]
    pub port: Option<u16>,

    /// User the queries run as
    #[serde(default = "default_user")]
    pub user: String,

    /// Password (sent as basic auth)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Environment variable holding the password
    #[serde(default)]
    pub password_env: Option<String>,

    /// Catalog (Trino/Presto connector catalog, StarRocks external catalog)
    #[serde(default)]
    pub catalog: Option<String>,

    /// Schema (Trino/Presto)
    #[serde(default)]
    pub schema: Option<String>,

    /// Database (StarRocks)
    #[serde(default)]
    pub database: Option<String>,

    /// Use HTTPS
    #[serde(default)]
    pub tls: bool,

    /// Value of the client source header
    #[serde(default = "default_source")]
    pub source: String,

    /// Request timeout
    #[serde(default = "default_request_timeout")]
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Connection timeout
    #[serde(default = "default_connect_timeout")]
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Wait between `nextUri` polls when the coordinator asks to back off
    #[serde(default = "default_poll_interval")]
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Inactive engines are skipped when clients are created
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_user() -> String {
    "admin".to_string()
}

fn default_source() -> String {
    format!("lakehouse-bench/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_active() -> bool {
    true
}

impl EngineConfig {
    /// Create a new engine config with required fields.
    pub fn new(kind: EngineKind, host: impl Into<String>) -> Self {
        Self {
            name: None,
            kind,
            host: host.into(),
            port: None,
            user: default_user(),
            password: None,
            password_env: None,
            catalog: None,
            schema: None,
            database: None,
            tls: false,
            source: default_source(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            poll_interval: default_poll_interval(),
            active: true,
        }
    }

    /// Set the engine name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the catalog.
    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Set the schema (Trino/Presto).
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the database (StarRocks).
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Enable or disable TLS.
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Mark the engine active or inactive.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Name benchmarks select this engine by.
    pub fn engine_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.id())
    }

    /// Effective port.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.kind.default_port())
    }

    /// `http(s)://host:port` without a trailing slash.
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port())
    }

    /// Password from the config, falling back to `password_env`.
    pub fn resolved_password(&self) -> Option<String> {
        self.password.clone().or_else(|| {
            self.password_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.host.is_empty() {
            return Err(ConfigValidationError::MissingField("host"));
        }
        if self.user.is_empty() {
            return Err(ConfigValidationError::MissingField("user"));
        }
        if self.name.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigValidationError::MissingField("name"));
        }

        // 1s to 1h for request, 1s to 5m for connect
        if self.request_timeout < Duration::from_secs(1)
            || self.request_timeout > Duration::from_secs(3600)
        {
            return Err(ConfigValidationError::InvalidTimeout(self.request_timeout));
        }
        if self.connect_timeout < Duration::from_secs(1)
            || self.connect_timeout > Duration::from_secs(300)
        {
            return Err(ConfigValidationError::InvalidTimeout(self.connect_timeout));
        }
        if self.poll_interval.is_zero() || self.poll_interval > Duration::from_secs(10) {
            return Err(ConfigValidationError::InvalidPollInterval(self.poll_interval));
        }

        match self.kind {
            EngineKind::StarRocks => {
                if self.database.is_none() {
                    return Err(ConfigValidationError::MissingField("database"));
                }
            }
            EngineKind::Trino | EngineKind::Presto => {
                if self.schema.is_some() && self.catalog.is_none() {
                    return Err(ConfigValidationError::MissingField("catalog"));
                }
            }
        }

        Ok(())
    }
}
