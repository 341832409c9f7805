//! StarRocks client over the frontend's HTTP SQL API
//!
//! Queries are sent to
//! `POST /api/v1/catalogs/{catalog}/databases/{database}/sql` with basic
//! auth. The response is NDJSON: a `connectionId` line, a `meta` line, one
//! `data` line per row and a closing `statistics` line. Cancelling drops the
//! in-flight request, which closes the connection and stops the query.

use std::time::Instant;

use async_trait::async_trait;
use lakehouse_bench_core::{EngineClient, EngineError, ExecutionMetrics};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::http::HttpConfig;
use crate::kind::EngineKind;
use crate::ndjson::NdjsonParser;

const DEFAULT_CATALOG: &str = "default_catalog";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SqlRequest<'a> {
    query: &'a str,
}

/// One line of the NDJSON response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseLine {
    #[serde(default)]
    connection_id: Option<u64>,
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    statistics: Option<Statistics>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

/// Closing `statistics` block
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Statistics {
    pub scan_rows: u64,
    pub scan_bytes: u64,
    pub return_rows: u64,
}

/// Body of `GET /api/health`
#[derive(Debug, Deserialize)]
struct HealthStatus {
    status: String,
    #[serde(default)]
    msg: Option<String>,
}

/// Folds response lines into metrics (and EXPLAIN text)
#[derive(Debug, Default)]
pub(crate) struct ResponseAccumulator {
    pub connection_id: Option<u64>,
    pub rows_returned: u64,
    pub statistics: Option<Statistics>,
    pub first_column: Vec<String>,
    collect_first_column: bool,
}

impl ResponseAccumulator {
    pub(crate) fn new(collect_first_column: bool) -> Self {
        Self {
            collect_first_column,
            ..Default::default()
        }
    }

    pub(crate) fn accept(&mut self, line: &str) -> Result<(), EngineError> {
        let parsed: ResponseLine = serde_json::from_str(line)
            .map_err(|e| EngineError::Protocol(format!("malformed response line: {e}")))?;

        if parsed.status.as_deref() == Some("FAILED") {
            return Err(EngineError::Query {
                code: "FAILED".into(),
                message: parsed.msg.unwrap_or_else(|| "query failed".into()),
            });
        }
        if let Some(id) = parsed.connection_id {
            self.connection_id = Some(id);
        }
        if let Some(row) = parsed.data {
            self.rows_returned += 1;
            if self.collect_first_column {
                match row.into_iter().next() {
                    Some(serde_json::Value::String(s)) => self.first_column.push(s),
                    Some(other) => self.first_column.push(other.to_string()),
                    None => {}
                }
            }
        }
        if let Some(statistics) = parsed.statistics {
            self.statistics = Some(statistics);
        }
        Ok(())
    }

    pub(crate) fn metrics(&self, elapsed_ms: u64) -> ExecutionMetrics {
        match &self.statistics {
            Some(stats) => ExecutionMetrics {
                elapsed_ms,
                rows_processed: Some(stats.scan_rows.max(stats.return_rows)),
                bytes_processed: Some(stats.scan_bytes),
                io_read_bytes: Some(stats.scan_bytes),
                ..Default::default()
            },
            None => ExecutionMetrics {
                elapsed_ms,
                rows_processed: Some(self.rows_returned),
                ..Default::default()
            },
        }
    }
}

/// Engine client for a StarRocks frontend.
pub struct StarRocksClient {
    name: String,
    config: EngineConfig,
    password: String,
    sql_url: String,
    http: Client,
}

impl StarRocksClient {
    /// Create a client from an engine descriptor.
    ///
    /// # Errors
    ///
    /// Returns `Config` for a non-StarRocks descriptor or a missing database,
    /// and `Http` if the HTTP client cannot be built.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        if config.kind != EngineKind::StarRocks {
            return Err(EngineError::Config(format!(
                "{} is not a StarRocks engine",
                config.engine_name()
            )));
        }
        let database = config
            .database
            .as_deref()
            .ok_or_else(|| EngineError::Config("StarRocks requires a database".into()))?;
        let catalog = config.catalog.as_deref().unwrap_or(DEFAULT_CATALOG);
        let sql_url = format!(
            "{}/api/v1/catalogs/{catalog}/databases/{database}/sql",
            config.base_url()
        );
        let http = HttpConfig::for_engine(&config).build()?;

        Ok(Self {
            name: config.engine_name().to_string(),
            password: config.resolved_password().unwrap_or_default(),
            sql_url,
            config,
            http,
        })
    }

    async fn check_status(&self, response: Response) -> Result<Response, EngineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EngineError::Config(format!(
                "{} rejected credentials for user '{}' ({status})",
                self.name, self.config.user
            )));
        }
        let body = response.text().await.unwrap_or_default();
        // Failed statements come back as a single {"status":"FAILED"} object
        let mut accumulator = ResponseAccumulator::new(false);
        if let Err(e @ EngineError::Query { .. }) = accumulator.accept(body.trim()) {
            return Err(e);
        }
        Err(EngineError::Protocol(format!(
            "unexpected status {status}: {}",
            body.trim()
        )))
    }

    async fn stream(
        &self,
        sql: &str,
        collect_first_column: bool,
    ) -> Result<ResponseAccumulator, EngineError> {
        let response = self
            .http
            .post(&self.sql_url)
            .basic_auth(&self.config.user, Some(&self.password))
            .json(&SqlRequest { query: sql })
            .send()
            .await?;
        let mut response = self.check_status(response).await?;

        let mut parser = NdjsonParser::new();
        let mut accumulator = ResponseAccumulator::new(collect_first_column);
        while let Some(chunk) = response.chunk().await? {
            for line in parser.feed(&chunk)? {
                accumulator.accept(&line)?;
            }
        }
        if let Some(line) = parser.finish()? {
            accumulator.accept(&line)?;
        }
        Ok(accumulator)
    }

    async fn run(
        &self,
        sql: &str,
        cancel: &CancellationToken,
        collect_first_column: bool,
    ) -> Result<ResponseAccumulator, EngineError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            result = self.stream(sql, collect_first_column) => result,
        }
    }
}

#[async_trait]
impl EngineClient for StarRocksClient {
    fn engine_name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        sql: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionMetrics, EngineError> {
        let started = Instant::now();
        let accumulator = self.run(sql, cancel, false).await?;
        let metrics = accumulator.metrics(started.elapsed().as_millis() as u64);
        tracing::debug!(
            engine = %self.name,
            connection_id = ?accumulator.connection_id,
            elapsed_ms = metrics.elapsed_ms,
            rows = ?metrics.rows_processed,
            "Statement finished"
        );
        Ok(metrics)
    }

    async fn explain(&self, sql: &str, cancel: &CancellationToken) -> Result<String, EngineError> {
        let accumulator = self.run(&format!("EXPLAIN {sql}"), cancel, true).await?;
        if accumulator.first_column.is_empty() {
            return Err(EngineError::Protocol("EXPLAIN returned no plan".into()));
        }
        Ok(accumulator.first_column.join("\n"))
    }

    async fn ping(&self) -> Result<(), EngineError> {
        let url = format!("{}/api/health", self.config.base_url());
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Unavailable(format!(
                "{} /api/health returned {status}",
                self.name
            )));
        }
        let health: HealthStatus = response.json().await?;
        if health.status != "OK" {
            return Err(EngineError::Unavailable(format!(
                "{} reports {}: {}",
                self.name,
                health.status,
                health.msg.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for StarRocksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StarRocksClient")
            .field("name", &self.name)
            .field("sql_url", &self.sql_url)
            .field("user", &self.config.user)
            .finish()
    }
}
