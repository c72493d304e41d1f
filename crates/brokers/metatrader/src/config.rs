use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Errors raised while loading or checking the gateway configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required MT5 configuration: {0}")]
    Missing(&'static str),
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for connecting to a MetaTrader 5 Web API.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaTraderConfig {
    /// Base URL of the Web API (e.g. "https://mt5.example.com/api/v1").
    pub api_url: String,
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Trade server identifier, sent as header and in every body.
    pub server_id: String,
    pub login: String,
    pub password: String,
    /// Per-call HTTP timeout in milliseconds.
    pub timeout_ms: u64,
    /// Total attempts per operation, including the first.
    pub retry_attempts: u32,
    /// Fixed pause between attempts in milliseconds.
    pub retry_delay_ms: u64,
    /// How long a successful probe is trusted, in milliseconds.
    pub connection_ttl_ms: u64,
    /// Timeout of the reachability probe in milliseconds.
    pub ping_timeout_ms: u64,
}

impl Default for MetaTraderConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            server_id: String::new(),
            login: String::new(),
            password: String::new(),
            timeout_ms: 30_000,
            retry_attempts: 3,
            retry_delay_ms: 1_000,
            connection_ttl_ms: 30_000,
            ping_timeout_ms: 5_000,
        }
    }
}

impl MetaTraderConfig {
    /// Parse a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read a TOML config file. Callers layer overrides on top and then
    /// call [`validate`](Self::validate).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Fails on the first empty required field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("api_url", &self.api_url),
            ("api_key", &self.api_key),
            ("server_id", &self.server_id),
            ("login", &self.login),
            ("password", &self.password),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn connection_ttl(&self) -> Duration {
        Duration::from_millis(self.connection_ttl_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }
}

impl fmt::Debug for MetaTraderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaTraderConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("server_id", &self.server_id)
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .field("timeout_ms", &self.timeout_ms)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("connection_ttl_ms", &self.connection_ttl_ms)
            .field("ping_timeout_ms", &self.ping_timeout_ms)
            .finish()
    }
}
