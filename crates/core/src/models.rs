use serde::{Deserialize, Serialize};

/// Retcode the trade server returns when a request was executed in full.
pub const RETCODE_DONE: u32 = 10009;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Account figures as reported by the broker. Fetched fresh per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountSnapshot {
    pub login: u64,
    pub name: String,
    pub server: String,
    pub currency: String,
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub free_margin: f64,
    pub margin_level: f64,
    pub profit: f64,
    pub credit: f64,
    pub leverage: u32,
    pub trade_allowed: bool,
    pub company: String,
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Order side as requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

/// Direction of an open position, encoded by the broker as `0` (buy) or `1` (sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PositionType {
    Buy,
    Sell,
}

impl PositionType {
    pub fn side(&self) -> Side {
        match self {
            PositionType::Buy => Side::Buy,
            PositionType::Sell => Side::Sell,
        }
    }
}

impl TryFrom<u8> for PositionType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PositionType::Buy),
            1 => Ok(PositionType::Sell),
            other => Err(format!("unknown position type {}", other)),
        }
    }
}

impl From<PositionType> for u8 {
    fn from(value: PositionType) -> Self {
        match value {
            PositionType::Buy => 0,
            PositionType::Sell => 1,
        }
    }
}

/// An open position owned by the broker. The gateway only reads it and
/// references it by ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub ticket: u64,
    pub symbol: String,
    #[serde(rename = "type")]
    pub position_type: PositionType,
    pub volume: f64,
    pub price_open: f64,
    pub price_current: f64,
    pub profit: f64,
    #[serde(default)]
    pub sl: f64,
    #[serde(default)]
    pub tp: f64,
    #[serde(default)]
    pub swap: f64,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub time_update: i64,
    #[serde(default)]
    pub magic: u64,
    #[serde(default)]
    pub identifier: u64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub external_id: String,
}

// ---------------------------------------------------------------------------
// Caller payloads
// ---------------------------------------------------------------------------

/// Simplified trade request as submitted by a caller.
///
/// `side` stays a free-form string here; it only becomes a [`Side`] once the
/// payload passes validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequestPayload {
    pub symbol: String,
    pub volume: f64,
    pub side: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Request to close (fully or partially) an open position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosePositionPayload {
    pub position_id: i64,
    /// Partial close volume. `None` closes the whole position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

// ---------------------------------------------------------------------------
// Trade results
// ---------------------------------------------------------------------------

/// Outcome of one submitted trade or close request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResult {
    pub retcode: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retcode_external: Option<i64>,
}

impl TradeResult {
    /// Partial completion counts as a failure.
    pub fn is_done(&self) -> bool {
        self.retcode == RETCODE_DONE
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Last observed broker reachability. `last_check` is epoch milliseconds,
/// `0` when no probe has run yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    pub last_check: i64,
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// Symbol specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SymbolInfo {
    pub name: String,
    pub description: String,
    pub category: String,
    pub currency: String,
    pub currency_profit: String,
    pub currency_margin: String,
    pub digits: u32,
    #[serde(rename = "trade")]
    pub trade_mode: u8,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub point: f64,
    pub trade_contract_size: f64,
    pub trade_tick_size: f64,
    pub trade_tick_value: f64,
    pub volume_min: f64,
    pub volume_max: f64,
    pub volume_step: f64,
    pub swap_long: f64,
    pub swap_short: f64,
}

/// Latest quote for a symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tick {
    pub symbol: String,
    pub time: i64,
    pub time_ms: i64,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub volume: f64,
    pub volume_real: f64,
    pub flags: u32,
}
