//! Pre-flight liveness checks

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::config::PreflightRetry;
use crate::traits::{EngineClient, EngineError};

/// Which selected engines may take part in a run
#[derive(Debug, Default)]
pub(crate) struct PreflightReport {
    /// Engines that answered their ping, in selection order
    pub live: Vec<String>,
    /// Engines excluded from the run, with the reason
    pub unavailable: Vec<(String, String)>,
}

impl PreflightReport {
    /// Names of the excluded engines
    pub fn unavailable_names(&self) -> Vec<String> {
        self.unavailable.iter().map(|(name, _)| name.clone()).collect()
    }

    /// `engine: reason` pairs for error messages
    pub fn describe_unavailable(&self) -> String {
        self.unavailable
            .iter()
            .map(|(name, reason)| format!("{name}: {reason}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Ping every selected engine concurrently
pub(crate) async fn check_engines(
    selected: &[String],
    clients: &HashMap<String, Arc<dyn EngineClient>>,
    ping_timeout: Duration,
    retry: &PreflightRetry,
) -> PreflightReport {
    let checks = selected.iter().map(|name| async move {
        let outcome = match clients.get(name) {
            Some(client) => ping_with_retry(client.as_ref(), ping_timeout, retry)
                .await
                .map_err(|e| e.to_string()),
            None => Err("no client registered for this engine".to_string()),
        };
        (name.clone(), outcome)
    });

    let mut report = PreflightReport::default();
    for (name, outcome) in join_all(checks).await {
        match outcome {
            Ok(()) => report.live.push(name),
            Err(reason) => {
                tracing::warn!(engine = %name, reason = %reason, "Engine failed pre-flight ping, excluding it");
                report.unavailable.push((name, reason));
            }
        }
    }
    report
}

/// Ping with a timeout per attempt, retrying retryable failures
pub(crate) async fn ping_with_retry(
    client: &dyn EngineClient,
    ping_timeout: Duration,
    retry: &PreflightRetry,
) -> Result<(), EngineError> {
    let attempts = retry.attempts.max(1);
    let mut attempt = 1;
    loop {
        let err = match tokio::time::timeout(ping_timeout, client.ping()).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(_) => EngineError::Timeout(ping_timeout),
        };

        if attempt >= attempts || !err.is_retryable() {
            return Err(err);
        }

        tracing::debug!(
            engine = client.engine_name(),
            attempt,
            error = %err,
            "Ping failed, retrying"
        );
        attempt += 1;
        tokio::time::sleep(retry.backoff).await;
    }
}
