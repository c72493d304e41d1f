//! MetaTrader 5 Web API gateway.
//!
//! Talks HTTP+JSON to an MT5 Web API: validates caller requests, translates
//! them into the trade server's request schema, retries transient failures
//! and maps trade server return codes onto [`gateway_core::GatewayError`].

pub mod client;
pub mod config;
pub mod health;
pub mod protocol;
pub mod retcode;
pub mod retry;
pub mod translate;

pub use client::MetaTraderGateway;
pub use config::{ConfigError, MetaTraderConfig};
pub use retcode::retcode_message;
pub use retry::{with_retry, with_retry_if, RetryPolicy};
