use async_trait::async_trait;
use chrono::Utc;
use gateway_core::*;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::MetaTraderConfig;
use crate::health::ConnectionHealth;
use crate::protocol::*;
use crate::retcode::interpret;
use crate::retry::{with_retry_if, RetryPolicy};
use crate::translate;

const USER_AGENT: &str = concat!("mt5-gateway/", env!("CARGO_PKG_VERSION"));

/// Gateway to a MetaTrader 5 Web API.
///
/// Construct once at startup and share it (e.g. behind an `Arc`). Every call
/// re-sends the static credential triple; no broker session is cached.
pub struct MetaTraderGateway {
    http: Client,
    base_url: String,
    login: String,
    password: String,
    server_id: String,
    ping_timeout: Duration,
    retry: RetryPolicy,
    health: ConnectionHealth,
}

fn header_value(field: &str, value: &str) -> Result<HeaderValue, GatewayError> {
    HeaderValue::from_str(value)
        .map_err(|_| GatewayError::Config(format!("{} contains invalid header characters", field)))
}

fn transport_error(operation: Operation, err: reqwest::Error) -> GatewayError {
    if err.is_connect() || err.is_timeout() {
        GatewayError::Connection {
            operation,
            message: err.to_string(),
        }
    } else {
        GatewayError::Transport {
            operation,
            message: err.to_string(),
        }
    }
}

fn default_failure(operation: Operation) -> &'static str {
    match operation {
        Operation::Ping => "Connection check failed",
        Operation::AccountInfo => "Failed to fetch account info",
        Operation::Positions => "Failed to fetch positions",
        Operation::Trade => "Trade execution failed",
        Operation::Close => "Position close failed",
        Operation::SymbolInfo => "Failed to fetch symbol info",
        Operation::MarketData => "Failed to fetch market prices",
    }
}

fn require<T>(operation: Operation, envelope: Envelope<T>) -> Result<T, GatewayError> {
    match envelope.data {
        Some(data) => Ok(data),
        None => Err(GatewayError::Broker {
            operation,
            message: envelope
                .failure_text()
                .unwrap_or(default_failure(operation))
                .to_string(),
        }),
    }
}

impl MetaTraderGateway {
    /// Build the gateway from a configuration. Fails on missing settings.
    pub fn new(config: &MetaTraderConfig) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header_value("api_key", &format!("Bearer {}", config.api_key))?,
        );
        headers.insert("X-MT5-Server", header_value("server_id", &config.server_id)?);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            api_url = %config.api_url,
            server = %config.server_id,
            retry_attempts = config.retry_attempts,
            "MT5 gateway initialised"
        );

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            login: config.login.clone(),
            password: config.password.clone(),
            server_id: config.server_id.clone(),
            ping_timeout: config.ping_timeout(),
            retry: config.retry_policy(),
            health: ConnectionHealth::new(config.connection_ttl()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a credential body and decode the shared envelope.
    ///
    /// Returns the envelope only when `success` is true.
    async fn post<X, T>(
        &self,
        operation: Operation,
        path: &str,
        extra: X,
    ) -> Result<Envelope<T>, GatewayError>
    where
        X: Serialize,
        T: DeserializeOwned,
    {
        let body = CredentialBody {
            login: &self.login,
            password: &self.password,
            server: &self.server_id,
            extra,
        };

        info!(method = "POST", path, "MT5 API request");
        let response = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(operation, e))?;
        info!(status = status.as_u16(), path, size = bytes.len(), "MT5 API response");

        let decoded = serde_json::from_slice::<Envelope<T>>(&bytes);
        if !status.is_success() {
            let message = decoded
                .ok()
                .and_then(|env| env.failure_text().map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(GatewayError::Transport { operation, message });
        }

        let envelope = decoded.map_err(|e| GatewayError::Transport {
            operation,
            message: format!("Invalid response body: {}", e),
        })?;

        if !envelope.success {
            return Err(GatewayError::Broker {
                operation,
                message: envelope
                    .failure_text()
                    .unwrap_or(default_failure(operation))
                    .to_string(),
            });
        }
        Ok(envelope)
    }

    async fn retried<T, F, Fut>(&self, operation: Operation, op: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        with_retry_if(self.retry, operation.name(), GatewayError::is_retryable, op).await
    }

    async fn probe(&self) -> bool {
        match self
            .http
            .get(self.url("/ping"))
            .timeout(self.ping_timeout)
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                warn!(status = response.status().as_u16(), "MT5 ping returned non-OK status");
                false
            }
            Err(e) => {
                error!(error = %e, "MT5 connection check failed");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Single attempts
    // -----------------------------------------------------------------------

    async fn fetch_account(&self) -> Result<AccountSnapshot, GatewayError> {
        info!("Fetching MT5 account information");
        let envelope = self
            .post(Operation::AccountInfo, "/account/info", NoExtra {})
            .await?;
        let account: AccountSnapshot = require(Operation::AccountInfo, envelope)?;
        info!(
            login = account.login,
            balance = account.balance,
            equity = account.equity,
            "Account info retrieved"
        );
        Ok(account)
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, GatewayError> {
        info!("Fetching MT5 open positions");
        let envelope: Envelope<Vec<Position>> = self
            .post(Operation::Positions, "/positions/get", NoExtra {})
            .await?;
        let positions = envelope.data.unwrap_or_default();
        info!(
            count = positions.len(),
            total_profit = positions.iter().map(|p| p.profit).sum::<f64>(),
            "Positions retrieved"
        );
        Ok(positions)
    }

    async fn submit(
        &self,
        operation: Operation,
        request: &BrokerTradeRequest,
    ) -> Result<TradeResult, GatewayError> {
        let envelope = self
            .post(operation, "/trade/send", TradeExtra { request })
            .await?;
        require(operation, envelope)
    }

    async fn place_trade(&self, payload: &TradeRequestPayload) -> Result<TradeResult, GatewayError> {
        let order = validate_trade(payload)?;
        info!(
            symbol = %order.symbol,
            volume = order.volume,
            side = order.side.as_str(),
            "Placing MT5 trade order"
        );

        let request = translate::trade_request(&order);
        let result = self
            .retried(Operation::Trade, || self.submit(Operation::Trade, &request))
            .await?;
        let result = interpret(Operation::Trade, result)?;

        info!(
            deal = ?result.deal,
            order = ?result.order,
            volume = ?result.volume,
            price = ?result.price,
            symbol = %order.symbol,
            "Trade executed"
        );
        Ok(result)
    }

    async fn close_position(
        &self,
        payload: &ClosePositionPayload,
    ) -> Result<TradeResult, GatewayError> {
        let close = validate_close(payload)?;
        info!(position_id = close.ticket, volume = ?close.volume, "Closing MT5 position");

        let positions = self
            .retried(Operation::Positions, || self.fetch_positions())
            .await?;
        let position = positions
            .iter()
            .find(|p| p.ticket == close.ticket)
            .ok_or(GatewayError::PositionNotFound(close.ticket))?;

        let request = translate::close_request(position, close.volume)?;
        let result = self
            .retried(Operation::Close, || self.submit(Operation::Close, &request))
            .await?;
        let result = interpret(Operation::Close, result)?;

        info!(
            deal = ?result.deal,
            position_id = close.ticket,
            volume = ?result.volume,
            price = ?result.price,
            "Position closed"
        );
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Reference data
    // -----------------------------------------------------------------------

    /// Fetch the specification of one symbol.
    pub async fn get_symbol_info(&self, symbol: &str) -> Result<SymbolInfo, GatewayError> {
        if symbol.trim().is_empty() {
            return Err(ValidationError::new("symbol", "must be a non-empty string").into());
        }
        self.retried(Operation::SymbolInfo, || async {
            let envelope: Envelope<SymbolInfo> = self
                .post(Operation::SymbolInfo, "/symbol/info", SymbolExtra { symbol })
                .await?;
            require(Operation::SymbolInfo, envelope)
        })
        .await
        .inspect_err(|e| error!(error = %e, symbol, "Failed to get symbol info"))
    }

    /// Fetch the latest ticks for `symbols`. A missing payload means no ticks.
    pub async fn get_market_prices(&self, symbols: &[String]) -> Result<Vec<Tick>, GatewayError> {
        self.retried(Operation::MarketData, || async {
            let envelope: Envelope<Vec<Tick>> = self
                .post(Operation::MarketData, "/market/ticks", SymbolsExtra { symbols })
                .await?;
            Ok::<_, GatewayError>(envelope.data.unwrap_or_default())
        })
        .await
        .inspect_err(|e| error!(error = %e, ?symbols, "Failed to get market prices"))
    }
}

#[async_trait]
impl TradingGateway for MetaTraderGateway {
    async fn get_account(&self) -> Result<AccountSnapshot, GatewayError> {
        self.retried(Operation::AccountInfo, || self.fetch_account())
            .await
            .inspect_err(|e| error!(error = %e, "Failed to get account info"))
    }

    async fn get_all_positions(&self) -> Result<Vec<Position>, GatewayError> {
        self.retried(Operation::Positions, || self.fetch_positions())
            .await
            .inspect_err(|e| error!(error = %e, "Failed to get positions"))
    }

    async fn execute_trade(
        &self,
        payload: &TradeRequestPayload,
    ) -> Result<TradeResult, GatewayError> {
        self.place_trade(payload).await.inspect_err(|e| match e {
            GatewayError::Validation(_) => warn!(error = %e, "Trade request rejected"),
            _ => error!(error = %e, symbol = %payload.symbol, "Failed to place trade"),
        })
    }

    async fn execute_close(
        &self,
        payload: &ClosePositionPayload,
    ) -> Result<TradeResult, GatewayError> {
        self.close_position(payload).await.inspect_err(|e| match e {
            GatewayError::Validation(_) => warn!(error = %e, "Close request rejected"),
            _ => error!(error = %e, position_id = payload.position_id, "Failed to close position"),
        })
    }

    async fn check_connection(&self) -> bool {
        let now = Utc::now().timestamp_millis();
        if let Some(connected) = self.health.cached(now) {
            return connected;
        }

        info!("Checking MT5 server connection");
        let connected = self.probe().await;
        self.health.record(connected, now);
        info!(connected, "MT5 connection check result");
        connected
    }

    fn connection_status(&self) -> ConnectionStatus {
        self.health.status()
    }
}
