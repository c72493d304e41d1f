use crate::models::*;
use crate::validation::ValidationError;
use async_trait::async_trait;
use std::fmt;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The broker operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Ping,
    AccountInfo,
    Positions,
    Trade,
    Close,
    SymbolInfo,
    MarketData,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Ping => "Ping",
            Operation::AccountInfo => "Account Info",
            Operation::Positions => "Positions",
            Operation::Trade => "Trade",
            Operation::Close => "Close",
            Operation::SymbolInfo => "Symbol Info",
            Operation::MarketData => "Market Data",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur during gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A required setting is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Caller input was rejected before any network access.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The broker could not be reached.
    #[error("{operation} Error: cannot reach broker: {message}")]
    Connection { operation: Operation, message: String },
    /// The broker answered with `success=false` or without data.
    #[error("{operation} Error: {message}")]
    Broker { operation: Operation, message: String },
    /// The trade server returned a retcode other than "request completed".
    #[error("{operation} failed with code {retcode}: {message}")]
    TradeRejected {
        operation: Operation,
        retcode: u32,
        message: String,
    },
    #[error("Position {0} not found")]
    PositionNotFound(u64),
    /// Any other HTTP or decoding failure.
    #[error("{operation} Error: {message}")]
    Transport { operation: Operation, message: String },
}

impl GatewayError {
    /// Whether the retry wrapper may attempt the operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Connection { .. }
                | GatewayError::Broker { .. }
                | GatewayError::Transport { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Gateway Trait
// ---------------------------------------------------------------------------

/// The inbound surface of a trading gateway.
///
/// One instance is constructed at startup and shared by every consumer.
/// Authorization and rate limiting happen before a call reaches it.
#[async_trait]
pub trait TradingGateway: Send + Sync {
    /// Fetch a fresh account snapshot.
    async fn get_account(&self) -> Result<AccountSnapshot, GatewayError>;

    /// Fetch all open positions in broker order.
    async fn get_all_positions(&self) -> Result<Vec<Position>, GatewayError>;

    /// Validate, translate and submit a market order.
    async fn execute_trade(&self, payload: &TradeRequestPayload)
        -> Result<TradeResult, GatewayError>;

    /// Close all or part of an open position.
    async fn execute_close(
        &self,
        payload: &ClosePositionPayload,
    ) -> Result<TradeResult, GatewayError>;

    /// Report broker reachability, probing only when the cached state is stale.
    async fn check_connection(&self) -> bool;

    /// Last observed reachability without probing.
    fn connection_status(&self) -> ConnectionStatus;
}
