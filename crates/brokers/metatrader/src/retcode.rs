//! Trade server return codes.

use gateway_core::{GatewayError, Operation, TradeResult, RETCODE_DONE};
use std::borrow::Cow;

/// Known trade server return codes, sorted by code.
static RETCODE_MESSAGES: &[(u32, &str)] = &[
    (10004, "Requote"),
    (10006, "Request rejected"),
    (10007, "Request canceled by trader"),
    (10008, "Order placed"),
    (RETCODE_DONE, "Request completed"),
    (10010, "Only part of the request was completed"),
    (10011, "Request processing error"),
    (10012, "Request canceled by timeout"),
    (10013, "Invalid request"),
    (10014, "Invalid volume in the request"),
    (10015, "Invalid price in the request"),
    (10016, "Invalid stops in the request"),
    (10017, "Trade is disabled"),
    (10018, "Market is closed"),
    (10019, "There is not enough money to complete the request"),
    (10020, "Prices changed"),
    (10021, "There are no quotes to process the request"),
    (10022, "Invalid request expiration"),
    (10023, "Order state changed"),
    (10024, "Too frequent requests"),
    (10025, "No changes in request"),
    (10026, "Autotrading disabled by server"),
    (10027, "Autotrading disabled by client terminal"),
    (10028, "Request locked for processing"),
    (10029, "Order or position frozen"),
    (10030, "Invalid order filling type"),
    (10031, "No connection with the trade server"),
    (10032, "Operation is allowed only for live accounts"),
    (10033, "The number of pending orders has reached the limit"),
    (10034, "The volume of orders and positions for the symbol has reached the limit"),
    (10035, "Incorrect or prohibited order type"),
    (10036, "Position with the specified identifier has already been closed"),
];

/// Human-readable message for a return code.
pub fn retcode_message(retcode: u32) -> Cow<'static, str> {
    match RETCODE_MESSAGES.binary_search_by_key(&retcode, |(code, _)| *code) {
        Ok(idx) => Cow::Borrowed(RETCODE_MESSAGES[idx].1),
        Err(_) => Cow::Owned(format!("Unknown error code: {}", retcode)),
    }
}

/// Accept a result only when the request completed in full.
pub fn interpret(operation: Operation, result: TradeResult) -> Result<TradeResult, GatewayError> {
    if result.is_done() {
        return Ok(result);
    }
    Err(GatewayError::TradeRejected {
        operation,
        retcode: result.retcode,
        message: retcode_message(result.retcode).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(retcode: u32) -> TradeResult {
        TradeResult {
            retcode,
            deal: Some(1),
            order: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn test_table_sorted_and_sized() {
        assert_eq!(RETCODE_MESSAGES.len(), 32);
        assert!(RETCODE_MESSAGES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_done_is_success() {
        let ok = interpret(Operation::Trade, result(10009)).unwrap();
        assert_eq!(ok.deal, Some(1));
    }

    #[test]
    fn test_known_failure_message() {
        assert_eq!(
            retcode_message(10019),
            "There is not enough money to complete the request"
        );
        assert_eq!(retcode_message(10018), "Market is closed");

        match interpret(Operation::Close, result(10019)).unwrap_err() {
            GatewayError::TradeRejected {
                operation,
                retcode,
                message,
            } => {
                assert_eq!(operation, Operation::Close);
                assert_eq!(retcode, 10019);
                assert_eq!(message, "There is not enough money to complete the request");
            }
            other => panic!("Expected TradeRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_fill_is_failure() {
        assert!(interpret(Operation::Trade, result(10010)).is_err());
    }

    #[test]
    fn test_unmapped_code_fallback() {
        assert_eq!(retcode_message(42424), "Unknown error code: 42424");
        let err = interpret(Operation::Trade, result(42424)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Trade failed with code 42424: Unknown error code: 42424"
        );
    }
}
