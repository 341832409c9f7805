//! Pooled HTTP client shared by every execution of one engine

use std::time::Duration;

use reqwest::Client;

use crate::config::EngineConfig;

/// Settings for the per-engine HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Idle connection timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Request timeout
    pub request_timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// TCP keepalive interval
    pub tcp_keepalive: Option<Duration>,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
            request_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            tcp_keepalive: Some(Duration::from_secs(60)),
            user_agent: format!("lakehouse-bench/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// HTTP settings derived from an engine descriptor.
    pub fn for_engine(engine: &EngineConfig) -> Self {
        Self {
            request_timeout: engine.request_timeout,
            connect_timeout: engine.connect_timeout,
            ..Default::default()
        }
    }

    /// Build the reqwest client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn build(&self) -> Result<Client, reqwest::Error> {
        let mut builder = Client::builder()
            .pool_idle_timeout(self.pool_idle_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(&self.user_agent);

        if let Some(keepalive) = self.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::EngineKind;

    #[test]
    fn test_http_config_follows_engine_timeouts() {
        let engine = EngineConfig::new(EngineKind::Trino, "trino")
            .with_request_timeout(Duration::from_secs(42));
        let http = HttpConfig::for_engine(&engine);

        assert_eq!(http.request_timeout, Duration::from_secs(42));
        assert_eq!(http.connect_timeout, engine.connect_timeout);
        assert!(http.user_agent.starts_with("lakehouse-bench/"));
        assert!(http.build().is_ok());
    }
}
