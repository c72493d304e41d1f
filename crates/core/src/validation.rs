use crate::models::*;

/// Smallest tradeable volume in lots.
pub const MIN_VOLUME: f64 = 0.01;
/// Largest volume accepted in a single request.
pub const MAX_VOLUME: f64 = 100.0;
/// Maximum comment length in characters.
pub const MAX_COMMENT_LEN: usize = 64;

/// A caller payload that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field}: {message}")]
pub struct ValidationError {
    /// Payload field that broke a constraint (wire name).
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validated requests
// ---------------------------------------------------------------------------

/// A trade request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOrder {
    pub symbol: String,
    pub volume: f64,
    pub side: Side,
    pub price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub comment: Option<String>,
}

/// A close request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseOrder {
    pub ticket: u64,
    pub volume: Option<f64>,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn check_volume(field: &'static str, volume: f64) -> Result<f64, ValidationError> {
    if !volume.is_finite() || !(MIN_VOLUME..=MAX_VOLUME).contains(&volume) {
        return Err(ValidationError::new(
            field,
            format!(
                "must be a finite number between {} and {} (got {})",
                MIN_VOLUME, MAX_VOLUME, volume
            ),
        ));
    }
    Ok(volume)
}

fn check_finite(field: &'static str, value: Option<f64>) -> Result<Option<f64>, ValidationError> {
    match value {
        Some(v) if !v.is_finite() => Err(ValidationError::new(
            field,
            format!("must be a finite number (got {})", v),
        )),
        other => Ok(other),
    }
}

fn parse_side(side: &str) -> Result<Side, ValidationError> {
    match side {
        "buy" => Ok(Side::Buy),
        "sell" => Ok(Side::Sell),
        other => Err(ValidationError::new(
            "side",
            format!("must be either \"buy\" or \"sell\" (got \"{}\")", other),
        )),
    }
}

/// Check a trade payload and turn it into a [`TradeOrder`].
///
/// Fields are checked in declaration order and the first failure wins.
pub fn validate_trade(payload: &TradeRequestPayload) -> Result<TradeOrder, ValidationError> {
    if payload.symbol.trim().is_empty() {
        return Err(ValidationError::new("symbol", "must be a non-empty string"));
    }
    let volume = check_volume("volume", payload.volume)?;
    let side = parse_side(&payload.side)?;
    let price = check_finite("price", payload.price)?;
    let stop_loss = check_finite("stopLoss", payload.stop_loss)?;
    let take_profit = check_finite("takeProfit", payload.take_profit)?;

    if let Some(comment) = &payload.comment {
        let len = comment.chars().count();
        if len > MAX_COMMENT_LEN {
            return Err(ValidationError::new(
                "comment",
                format!("must be {} characters or less (got {})", MAX_COMMENT_LEN, len),
            ));
        }
    }

    Ok(TradeOrder {
        symbol: payload.symbol.clone(),
        volume,
        side,
        price,
        stop_loss,
        take_profit,
        comment: payload.comment.clone(),
    })
}

/// Check a close payload and turn it into a [`CloseOrder`].
pub fn validate_close(payload: &ClosePositionPayload) -> Result<CloseOrder, ValidationError> {
    if payload.position_id <= 0 {
        return Err(ValidationError::new(
            "positionId",
            format!("must be a positive integer (got {})", payload.position_id),
        ));
    }
    let volume = payload
        .volume
        .map(|v| check_volume("volume", v))
        .transpose()?;

    Ok(CloseOrder {
        ticket: payload.position_id as u64,
        volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(volume: f64, side: &str) -> TradeRequestPayload {
        TradeRequestPayload {
            symbol: "EURUSD".to_string(),
            volume,
            side: side.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_accepts_volume_range_and_both_sides() {
        for volume in [0.01, 0.5, 1.0, 42.0, 99.99, 100.0] {
            for side in ["buy", "sell"] {
                let order = validate_trade(&trade(volume, side)).unwrap();
                assert_eq!(order.volume, volume);
            }
        }
        assert_eq!(validate_trade(&trade(1.0, "sell")).unwrap().side, Side::Sell);
    }

    #[test]
    fn test_rejects_bad_volume() {
        for volume in [0.0, -1.0, 0.009, 100.01, f64::NAN, f64::INFINITY] {
            let err = validate_trade(&trade(volume, "buy")).unwrap_err();
            assert_eq!(err.field, "volume");
            assert!(err.to_string().starts_with("Invalid volume:"));
        }
    }

    #[test]
    fn test_rejects_unknown_side() {
        for side in ["", "BUY", "hold", "short"] {
            let err = validate_trade(&trade(1.0, side)).unwrap_err();
            assert_eq!(err.field, "side");
        }
    }

    #[test]
    fn test_rejects_empty_symbol() {
        let mut payload = trade(1.0, "buy");
        payload.symbol = "   ".to_string();
        let err = validate_trade(&payload).unwrap_err();
        assert_eq!(err.field, "symbol");
    }

    #[test]
    fn test_optional_prices_must_be_finite() {
        let mut payload = trade(1.0, "buy");
        payload.stop_loss = Some(f64::NAN);
        assert_eq!(validate_trade(&payload).unwrap_err().field, "stopLoss");

        let mut payload = trade(1.0, "buy");
        payload.take_profit = Some(f64::NEG_INFINITY);
        assert_eq!(validate_trade(&payload).unwrap_err().field, "takeProfit");

        let mut payload = trade(1.0, "buy");
        payload.price = Some(1.2345);
        payload.stop_loss = Some(1.2);
        assert!(validate_trade(&payload).is_ok());
    }

    #[test]
    fn test_comment_length_limit() {
        let mut payload = trade(1.0, "buy");
        payload.comment = Some("x".repeat(64));
        assert!(validate_trade(&payload).is_ok());

        payload.comment = Some("x".repeat(65));
        assert_eq!(validate_trade(&payload).unwrap_err().field, "comment");
    }

    #[test]
    fn test_close_validation() {
        let ok = validate_close(&ClosePositionPayload {
            position_id: 7,
            volume: Some(0.1),
        })
        .unwrap();
        assert_eq!(ok.ticket, 7);
        assert_eq!(ok.volume, Some(0.1));

        for id in [0, -5] {
            let err = validate_close(&ClosePositionPayload {
                position_id: id,
                volume: None,
            })
            .unwrap_err();
            assert_eq!(err.field, "positionId");
        }

        let err = validate_close(&ClosePositionPayload {
            position_id: 7,
            volume: Some(150.0),
        })
        .unwrap_err();
        assert_eq!(err.field, "volume");
    }
}
