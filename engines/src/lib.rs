//! Engine client implementations for the lakehouse query engines
//!
//! This crate provides implementations of the `EngineClient` trait for:
//!
//! - Trino (`/v1/statement` protocol, `X-Trino-*` headers)
//! - Presto (`/v1/statement` protocol, `X-Presto-*` headers)
//! - StarRocks (frontend HTTP SQL API, NDJSON responses)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod factory;
pub mod http;
pub mod kind;
pub mod ndjson;
pub mod starrocks;
pub mod statement;

#[cfg(test)]
mod test_support;

pub use config::{ConfigValidationError, EngineConfig};
pub use factory::{create_client, create_clients};
pub use kind::EngineKind;
pub use starrocks::StarRocksClient;
pub use statement::{Dialect, StatementClient};
