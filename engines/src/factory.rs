//! Client factory dispatching on [`EngineKind`]

use std::collections::HashSet;
use std::sync::Arc;

use lakehouse_bench_core::{EngineClient, EngineError};

use crate::config::EngineConfig;
use crate::kind::EngineKind;
use crate::starrocks::StarRocksClient;
use crate::statement::StatementClient;

/// Create a client for one engine descriptor.
///
/// # Errors
///
/// Returns `EngineError::Config` if the descriptor fails validation.
pub fn create_client(config: &EngineConfig) -> Result<Arc<dyn EngineClient>, EngineError> {
    config
        .validate()
        .map_err(|e| EngineError::Config(format!("{}: {e}", config.engine_name())))?;

    let client: Arc<dyn EngineClient> = match config.kind {
        EngineKind::Trino | EngineKind::Presto => Arc::new(StatementClient::new(config.clone())?),
        EngineKind::StarRocks => Arc::new(StarRocksClient::new(config.clone())?),
    };

    tracing::debug!(
        engine = %config.engine_name(),
        kind = %config.kind,
        base_url = %config.base_url(),
        "Engine client created"
    );
    Ok(client)
}

/// Create clients for every active descriptor.
///
/// # Errors
///
/// Returns `EngineError::Config` for an invalid descriptor or when two
/// active descriptors share an engine name.
pub fn create_clients(configs: &[EngineConfig]) -> Result<Vec<Arc<dyn EngineClient>>, EngineError> {
    let mut seen = HashSet::new();
    let mut clients = Vec::with_capacity(configs.len());

    for config in configs {
        if !config.active {
            tracing::info!(engine = %config.engine_name(), "Skipping inactive engine");
            continue;
        }
        if !seen.insert(config.engine_name().to_string()) {
            return Err(EngineError::Config(format!(
                "duplicate engine name '{}'",
                config.engine_name()
            )));
        }
        clients.push(create_client(config)?);
    }

    Ok(clients)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_per_kind() {
        let trino = create_client(&EngineConfig::new(EngineKind::Trino, "trino")).unwrap();
        assert_eq!(trino.engine_name(), "trino");

        let starrocks = create_client(
            &EngineConfig::new(EngineKind::StarRocks, "fe")
                .with_name("sr")
                .with_database("tpch"),
        )
        .unwrap();
        assert_eq!(starrocks.engine_name(), "sr");
    }

    #[test]
    fn test_create_client_rejects_invalid_config() {
        let Err(err) = create_client(&EngineConfig::new(EngineKind::StarRocks, "fe")) else {
            panic!("expected config error");
        };
        match err {
            EngineError::Config(message) => assert!(message.contains("database")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_clients_skips_inactive() {
        let configs = vec![
            EngineConfig::new(EngineKind::Trino, "trino"),
            EngineConfig::new(EngineKind::Presto, "presto").with_active(false),
        ];
        let clients = create_clients(&configs).unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].engine_name(), "trino");
    }

    #[test]
    fn test_create_clients_rejects_duplicate_names() {
        let configs = vec![
            EngineConfig::new(EngineKind::Trino, "a"),
            EngineConfig::new(EngineKind::Trino, "b"),
        ];
        assert!(matches!(
            create_clients(&configs),
            Err(EngineError::Config(_))
        ));
    }
}
