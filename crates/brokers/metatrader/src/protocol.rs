use serde::{Deserialize, Serialize};

/// Allowed slippage in points for every market order.
pub const DEVIATION_POINTS: u32 = 5;
/// Tag attached to every order this gateway submits.
pub const GATEWAY_MAGIC: u64 = 123_456;
pub const DEFAULT_TRADE_COMMENT: &str = "Gateway Trade";
pub const CLOSE_COMMENT: &str = "Gateway Close";

/// Trade operation type (`TRADE_ACTION_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TradeAction {
    Deal,
    Pending,
    Sltp,
    Modify,
    Remove,
    CloseBy,
}

impl From<TradeAction> for u8 {
    fn from(action: TradeAction) -> Self {
        match action {
            TradeAction::Deal => 1,
            TradeAction::Pending => 5,
            TradeAction::Sltp => 6,
            TradeAction::Modify => 7,
            TradeAction::Remove => 8,
            TradeAction::CloseBy => 10,
        }
    }
}

impl TryFrom<u8> for TradeAction {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TradeAction::Deal),
            5 => Ok(TradeAction::Pending),
            6 => Ok(TradeAction::Sltp),
            7 => Ok(TradeAction::Modify),
            8 => Ok(TradeAction::Remove),
            10 => Ok(TradeAction::CloseBy),
            other => Err(format!("unknown trade action {}", other)),
        }
    }
}

/// Order type (`ORDER_TYPE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OrderType {
    Buy,
    Sell,
    BuyLimit,
    SellLimit,
    BuyStop,
    SellStop,
    BuyStopLimit,
    SellStopLimit,
    CloseBy,
}

impl From<OrderType> for u8 {
    fn from(order_type: OrderType) -> Self {
        match order_type {
            OrderType::Buy => 0,
            OrderType::Sell => 1,
            OrderType::BuyLimit => 2,
            OrderType::SellLimit => 3,
            OrderType::BuyStop => 4,
            OrderType::SellStop => 5,
            OrderType::BuyStopLimit => 6,
            OrderType::SellStopLimit => 7,
            OrderType::CloseBy => 8,
        }
    }
}

impl TryFrom<u8> for OrderType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OrderType::Buy),
            1 => Ok(OrderType::Sell),
            2 => Ok(OrderType::BuyLimit),
            3 => Ok(OrderType::SellLimit),
            4 => Ok(OrderType::BuyStop),
            5 => Ok(OrderType::SellStop),
            6 => Ok(OrderType::BuyStopLimit),
            7 => Ok(OrderType::SellStopLimit),
            8 => Ok(OrderType::CloseBy),
            other => Err(format!("unknown order type {}", other)),
        }
    }
}

/// A trade request in the broker's wire schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerTradeRequest {
    pub action: TradeAction,
    pub symbol: String,
    pub volume: f64,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stoplimit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tp: Option<f64>,
    pub deviation: u32,
    pub magic: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Ticket of the position this order closes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_by: Option<u64>,
}

/// Response envelope shared by every Web API endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Best available failure text from the broker.
    pub fn failure_text(&self) -> Option<&str> {
        self.error.as_deref().or(self.message.as_deref())
    }
}

/// Request body: the static credential triple plus call-specific fields.
#[derive(Debug, Serialize)]
pub struct CredentialBody<'a, X: Serialize> {
    pub login: &'a str,
    pub password: &'a str,
    pub server: &'a str,
    #[serde(flatten)]
    pub extra: X,
}

#[derive(Debug, Serialize)]
pub struct NoExtra {}

#[derive(Debug, Serialize)]
pub struct TradeExtra<'a> {
    pub request: &'a BrokerTradeRequest,
}

#[derive(Debug, Serialize)]
pub struct SymbolExtra<'a> {
    pub symbol: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SymbolsExtra<'a> {
    pub symbols: &'a [String],
}
