//! Translation of validated caller requests into the broker wire schema.

use gateway_core::{Position, Side, TradeOrder, ValidationError};

use crate::protocol::*;

fn market_order_type(side: Side) -> OrderType {
    match side {
        Side::Buy => OrderType::Buy,
        Side::Sell => OrderType::Sell,
    }
}

/// Build the market deal for a new trade.
pub fn trade_request(order: &TradeOrder) -> BrokerTradeRequest {
    BrokerTradeRequest {
        action: TradeAction::Deal,
        symbol: order.symbol.clone(),
        volume: order.volume,
        order_type: market_order_type(order.side),
        price: order.price,
        stoplimit: None,
        sl: order.stop_loss,
        tp: order.take_profit,
        deviation: DEVIATION_POINTS,
        magic: GATEWAY_MAGIC,
        comment: Some(
            order
                .comment
                .clone()
                .unwrap_or_else(|| DEFAULT_TRADE_COMMENT.to_string()),
        ),
        position_by: None,
    }
}

/// Build the opposing deal that closes `position`.
///
/// `volume` defaults to the full open volume and may not exceed it.
pub fn close_request(
    position: &Position,
    volume: Option<f64>,
) -> Result<BrokerTradeRequest, ValidationError> {
    let volume = match volume {
        Some(v) if v > position.volume => {
            return Err(ValidationError::new(
                "volume",
                format!(
                    "close volume {} exceeds open volume {} of position {}",
                    v, position.volume, position.ticket
                ),
            ));
        }
        Some(v) => v,
        None => position.volume,
    };

    Ok(BrokerTradeRequest {
        action: TradeAction::Deal,
        symbol: position.symbol.clone(),
        volume,
        order_type: market_order_type(position.position_type.side().opposite()),
        price: None,
        stoplimit: None,
        sl: None,
        tp: None,
        deviation: DEVIATION_POINTS,
        magic: GATEWAY_MAGIC,
        comment: Some(CLOSE_COMMENT.to_string()),
        position_by: Some(position.ticket),
    })
}
