//! Trino and Presto client over the `/v1/statement` protocol
//!
//! A query is submitted with `POST /v1/statement`; the client then follows
//! `nextUri` until the coordinator stops returning one. The final `stats`
//! block carries the metrics reported for the execution.
//!
//! # Cancellation
//!
//! While a query is in flight its current `nextUri` is held by an
//! [`AbortOnDrop`] guard. If the execute future is dropped (per-query
//! timeout) or the cancel token fires, the guard sends `DELETE nextUri` so
//! the coordinator stops the query instead of running it to completion.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use lakehouse_bench_core::{EngineClient, EngineError, ExecutionMetrics};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::http::HttpConfig;
use crate::kind::EngineKind;

// ============================================================================
// Protocol types
// ============================================================================

/// Header family spoken by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `X-Trino-*` headers
    Trino,
    /// `X-Presto-*` headers
    Presto,
}

impl Dialect {
    fn header(&self, suffix: &str) -> String {
        match self {
            Dialect::Trino => format!("X-Trino-{suffix}"),
            Dialect::Presto => format!("X-Presto-{suffix}"),
        }
    }
}

/// One page of the statement protocol.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryResults {
    pub id: String,
    #[serde(default)]
    pub next_uri: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(default)]
    pub stats: Option<StatementStats>,
    #[serde(default)]
    pub error: Option<QueryError>,
}

/// Subset of the coordinator's statement statistics.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct StatementStats {
    pub state: String,
    pub processed_rows: u64,
    pub processed_bytes: u64,
    pub cpu_time_millis: u64,
    pub wall_time_millis: u64,
    pub peak_memory_bytes: u64,
    pub physical_input_bytes: Option<u64>,
    pub physical_written_bytes: Option<u64>,
}

/// Protocol `error` block.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryError {
    pub message: String,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_name: Option<String>,
}

impl QueryError {
    fn into_engine_error(self) -> EngineError {
        let code = self
            .error_name
            .or_else(|| self.error_code.map(|c| c.to_string()))
            .unwrap_or_else(|| "UNKNOWN".to_string());
        EngineError::Query {
            code,
            message: self.message,
        }
    }
}

/// Body of `GET /v1/info`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerInfo {
    #[serde(default)]
    pub starting: bool,
}

/// Normalize the last stats block into execution metrics.
///
/// Without stats only the elapsed time and the number of returned rows are
/// known.
pub(crate) fn metrics_from(
    stats: Option<&StatementStats>,
    rows_returned: u64,
    elapsed: Duration,
) -> ExecutionMetrics {
    let elapsed_ms = elapsed.as_millis() as u64;
    match stats {
        Some(stats) => ExecutionMetrics {
            elapsed_ms,
            rows_processed: Some(stats.processed_rows),
            bytes_processed: Some(stats.processed_bytes),
            cpu_time_ms: Some(stats.cpu_time_millis),
            peak_memory_bytes: Some(stats.peak_memory_bytes),
            io_read_bytes: stats.physical_input_bytes,
            io_write_bytes: stats.physical_written_bytes,
        },
        None => ExecutionMetrics {
            elapsed_ms,
            rows_processed: Some(rows_returned),
            ..Default::default()
        },
    }
}

// ============================================================================
// Abort guard
// ============================================================================

/// Sends `DELETE` to the last known `nextUri` when dropped while armed.
struct AbortOnDrop {
    http: Client,
    engine: String,
    user_header: (String, String),
    uri: Option<String>,
}

impl AbortOnDrop {
    fn arm(&mut self, uri: &str) {
        self.uri = Some(uri.to_string());
    }

    fn disarm(&mut self) {
        self.uri = None;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        let Some(uri) = self.uri.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let request = self
            .http
            .delete(&uri)
            .header(&self.user_header.0, &self.user_header.1);
        let engine = std::mem::take(&mut self.engine);
        tracing::debug!(engine = %engine, uri = %uri, "Aborting remote query");
        runtime.spawn(async move {
            if let Err(e) = request.send().await {
                tracing::warn!(engine = %engine, error = %e, "Failed to abort remote query");
            }
        });
    }
}

// ============================================================================
// Client
// ============================================================================

/// What a finished statement produced
#[derive(Debug, Default)]
struct StatementOutcome {
    stats: Option<StatementStats>,
    rows_returned: u64,
    first_column: Vec<String>,
}

/// Engine client for Trino and Presto coordinators.
pub struct StatementClient {
    name: String,
    dialect: Dialect,
    config: EngineConfig,
    password: Option<String>,
    http: Client,
}

impl StatementClient {
    /// Create a client from an engine descriptor.
    ///
    /// # Errors
    ///
    /// Returns `Config` for a StarRocks descriptor and `Http` if the HTTP
    /// client cannot be built.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let dialect = match config.kind {
            EngineKind::Trino => Dialect::Trino,
            EngineKind::Presto => Dialect::Presto,
            EngineKind::StarRocks => {
                return Err(EngineError::Config(
                    "StarRocks does not speak the statement protocol".into(),
                ))
            }
        };
        let http = HttpConfig::for_engine(&config).build()?;
        Ok(Self {
            name: config.engine_name().to_string(),
            dialect,
            password: config.resolved_password(),
            config,
            http,
        })
    }

    /// Header family this client sends.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn with_session(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request
            .header(self.dialect.header("User"), &self.config.user)
            .header(self.dialect.header("Source"), &self.config.source);
        if let Some(catalog) = &self.config.catalog {
            request = request.header(self.dialect.header("Catalog"), catalog);
        }
        if let Some(schema) = &self.config.schema {
            request = request.header(self.dialect.header("Schema"), schema);
        }
        if let Some(password) = &self.password {
            request = request.basic_auth(&self.config.user, Some(password));
        }
        request
    }

    fn abort_guard(&self) -> AbortOnDrop {
        AbortOnDrop {
            http: self.http.clone(),
            engine: self.name.clone(),
            user_header: (self.dialect.header("User"), self.config.user.clone()),
            uri: None,
        }
    }

    async fn submit(&self, sql: &str) -> Result<QueryResults, EngineError> {
        let url = format!("{}/v1/statement", self.config.base_url());
        loop {
            let response = self
                .with_session(self.http.post(&url))
                .body(sql.to_string())
                .send()
                .await?;
            match self.read_page(response).await? {
                Some(page) => return Ok(page),
                None => tokio::time::sleep(self.config.poll_interval).await,
            }
        }
    }

    async fn advance(&self, next_uri: &str) -> Result<QueryResults, EngineError> {
        loop {
            let response = self.with_session(self.http.get(next_uri)).send().await?;
            match self.read_page(response).await? {
                Some(page) => return Ok(page),
                None => tokio::time::sleep(self.config.poll_interval).await,
            }
        }
    }

    /// `None` when the coordinator asks the client to retry.
    async fn read_page(&self, response: Response) -> Result<Option<QueryResults>, EngineError> {
        let status = response.status();
        match status {
            StatusCode::OK => Ok(Some(response.json::<QueryResults>().await?)),
            StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::BAD_GATEWAY
            | StatusCode::GATEWAY_TIMEOUT => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(EngineError::Config(format!(
                "{} rejected credentials for user '{}' ({status})",
                self.name, self.config.user
            ))),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(EngineError::Protocol(format!(
                    "unexpected status {status}: {}",
                    body.trim()
                )))
            }
        }
    }

    async fn run(
        &self,
        sql: &str,
        cancel: &CancellationToken,
        collect_first_column: bool,
    ) -> Result<StatementOutcome, EngineError> {
        let mut guard = self.abort_guard();
        let mut outcome = StatementOutcome::default();

        let mut page = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            page = self.submit(sql) => page?,
        };
        tracing::debug!(engine = %self.name, query_id = %page.id, "Statement submitted");

        loop {
            if let Some(error) = page.error.take() {
                guard.disarm();
                return Err(error.into_engine_error());
            }
            if let Some(rows) = page.data.take() {
                outcome.rows_returned += rows.len() as u64;
                if collect_first_column {
                    outcome
                        .first_column
                        .extend(rows.into_iter().filter_map(|row| match row.into_iter().next() {
                            Some(serde_json::Value::String(s)) => Some(s),
                            Some(other) => Some(other.to_string()),
                            None => None,
                        }));
                }
            }
            if let Some(stats) = page.stats.take() {
                outcome.stats = Some(stats);
            }

            let Some(next_uri) = page.next_uri.take() else {
                break;
            };
            guard.arm(&next_uri);

            page = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                page = self.advance(&next_uri) => page?,
            };
        }

        guard.disarm();
        Ok(outcome)
    }
}

#[async_trait]
impl EngineClient for StatementClient {
    fn engine_name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        sql: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionMetrics, EngineError> {
        let started = Instant::now();
        let outcome = self.run(sql, cancel, false).await?;
        let metrics = metrics_from(outcome.stats.as_ref(), outcome.rows_returned, started.elapsed());
        tracing::debug!(
            engine = %self.name,
            elapsed_ms = metrics.elapsed_ms,
            rows = ?metrics.rows_processed,
            state = outcome.stats.as_ref().map(|s| s.state.as_str()).unwrap_or("UNKNOWN"),
            "Statement finished"
        );
        Ok(metrics)
    }

    async fn explain(&self, sql: &str, cancel: &CancellationToken) -> Result<String, EngineError> {
        let outcome = self.run(&format!("EXPLAIN {sql}"), cancel, true).await?;
        if outcome.first_column.is_empty() {
            return Err(EngineError::Protocol("EXPLAIN returned no plan".into()));
        }
        Ok(outcome.first_column.join("\n"))
    }

    async fn ping(&self) -> Result<(), EngineError> {
        let url = format!("{}/v1/info", self.config.base_url());
        let response = self.with_session(self.http.get(&url)).send().await?;
        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(EngineError::Unavailable(format!("{} returned {status}", self.name)));
        }
        if !status.is_success() {
            return Err(EngineError::Protocol(format!(
                "{} /v1/info returned {status}",
                self.name
            )));
        }
        let info: ServerInfo = response.json().await?;
        if info.starting {
            return Err(EngineError::Unavailable(format!(
                "{} coordinator is starting",
                self.name
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for StatementClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementClient")
            .field("name", &self.name)
            .field("dialect", &self.dialect)
            .field("base_url", &self.config.base_url())
            .field("user", &self.config.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
