use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, OriginalUri, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use gateway_core::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/account", get(get_account))
        .route("/positions", get(get_positions))
        .route("/trade", post(place_trade))
        .route("/close", post(close_position))
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Response body shared by every endpoint.
#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u16>,
    timestamp: String,
    path: String,
}

fn success<T: Serialize>(path: &str, data: T) -> Response {
    let body = ApiResponse {
        success: true,
        data: Some(data),
        error: None,
        code: None,
        timestamp: Utc::now().to_rfc3339(),
        path: path.to_string(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn failure(path: &str, status: StatusCode, message: impl Into<String>) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(message.into()),
        code: Some(status.as_u16()),
        timestamp: Utc::now().to_rfc3339(),
        path: path.to_string(),
    };
    (status, Json(body)).into_response()
}

fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
        GatewayError::PositionNotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::TradeRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        GatewayError::Connection { .. } => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Broker { .. } | GatewayError::Transport { .. } => StatusCode::BAD_GATEWAY,
        GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn gateway_failure(path: &str, err: GatewayError) -> Response {
    let status = status_for(&err);
    error!(path, status = status.as_u16(), error = %err, "Request failed");
    failure(path, status, err.to_string())
}

fn disconnected(path: &str) -> Response {
    warn!(path, "MT5 server unreachable, request refused");
    failure(path, StatusCode::SERVICE_UNAVAILABLE, "MT5 server connection failed")
}

fn invalid(path: &str, err: ValidationError) -> Response {
    warn!(path, error = %err, "Request validation failed");
    failure(path, StatusCode::BAD_REQUEST, format!("Validation failed: {}", err))
}

pub async fn not_found(method: Method, uri: Uri) -> Response {
    warn!(%method, path = uri.path(), "Route not found");
    failure(
        uri.path(),
        StatusCode::NOT_FOUND,
        format!("Route {} {} not found", method, uri.path()),
    )
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthStatus {
    mt5_connected: bool,
    last_connection_check: i64,
    server_time: String,
    uptime_secs: u64,
}

async fn health_check(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let connected = state.gateway.check_connection().await;
    let status = state.gateway.connection_status();
    success(
        uri.path(),
        HealthStatus {
            mt5_connected: connected,
            last_connection_check: status.last_check,
            server_time: Utc::now().to_rfc3339(),
            uptime_secs: state.started_at.elapsed().as_secs(),
        },
    )
}

// ---------------------------------------------------------------------------
// Account & positions
// ---------------------------------------------------------------------------

async fn get_account(State(state): State<Arc<AppState>>, OriginalUri(uri): OriginalUri) -> Response {
    let path = uri.path();
    if !state.gateway.check_connection().await {
        return disconnected(path);
    }
    match state.gateway.get_account().await {
        Ok(account) => {
            info!(balance = account.balance, equity = account.equity, "Account info sent");
            success(path, account)
        }
        Err(e) => gateway_failure(path, e),
    }
}

async fn get_positions(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let path = uri.path();
    if !state.gateway.check_connection().await {
        return disconnected(path);
    }
    match state.gateway.get_all_positions().await {
        Ok(positions) => {
            info!(count = positions.len(), "Positions sent");
            success(path, positions)
        }
        Err(e) => gateway_failure(path, e),
    }
}

// ---------------------------------------------------------------------------
// Trading
// ---------------------------------------------------------------------------

async fn place_trade(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    payload: Result<Json<TradeRequestPayload>, JsonRejection>,
) -> Response {
    let path = uri.path();
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return failure(path, rejection.status(), rejection.body_text());
        }
    };
    if let Err(e) = validate_trade(&payload) {
        return invalid(path, e);
    }
    if !state.gateway.check_connection().await {
        return disconnected(path);
    }

    info!(symbol = %payload.symbol, volume = payload.volume, side = %payload.side, "Trade request received");
    match state.gateway.execute_trade(&payload).await {
        Ok(result) => success(path, result),
        Err(e) => gateway_failure(path, e),
    }
}

async fn close_position(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    payload: Result<Json<ClosePositionPayload>, JsonRejection>,
) -> Response {
    let path = uri.path();
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return failure(path, rejection.status(), rejection.body_text());
        }
    };
    if let Err(e) = validate_close(&payload) {
        return invalid(path, e);
    }
    if !state.gateway.check_connection().await {
        return disconnected(path);
    }

    info!(position_id = payload.position_id, volume = ?payload.volume, "Close request received");
    match state.gateway.execute_close(&payload).await {
        Ok(result) => success(path, result),
        Err(e) => gateway_failure(path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// In-memory gateway with a fixed connection state and canned results.
    struct StubGateway {
        connected: bool,
        positions: Vec<Position>,
        trade_retcode: u32,
        calls: AtomicUsize,
    }

    impl StubGateway {
        fn new(connected: bool) -> Self {
            Self {
                connected,
                positions: Vec::new(),
                trade_retcode: RETCODE_DONE,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TradingGateway for StubGateway {
        async fn get_account(&self) -> Result<AccountSnapshot, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccountSnapshot {
                login: 42,
                currency: "USD".to_string(),
                balance: 1000.0,
                equity: 1010.0,
                ..Default::default()
            })
        }

        async fn get_all_positions(&self) -> Result<Vec<Position>, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.positions.clone())
        }

        async fn execute_trade(
            &self,
            _payload: &TradeRequestPayload,
        ) -> Result<TradeResult, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.trade_retcode == RETCODE_DONE {
                Ok(TradeResult {
                    retcode: RETCODE_DONE,
                    deal: Some(7),
                    ..Default::default()
                })
            } else {
                Err(GatewayError::TradeRejected {
                    operation: Operation::Trade,
                    retcode: self.trade_retcode,
                    message: "Market is closed".to_string(),
                })
            }
        }

        async fn execute_close(
            &self,
            payload: &ClosePositionPayload,
        ) -> Result<TradeResult, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::PositionNotFound(payload.position_id as u64))
        }

        async fn check_connection(&self) -> bool {
            self.connected
        }

        fn connection_status(&self) -> ConnectionStatus {
            ConnectionStatus {
                connected: self.connected,
                last_check: 1_700_000_000_000,
            }
        }
    }

    async fn send(
        gateway: Arc<StubGateway>,
        request: Request<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let app = crate::build_router(gateway);
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_connection() {
        let (status, body) = send(Arc::new(StubGateway::new(true)), get_req("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["mt5Connected"], true);
        assert_eq!(body["data"]["lastConnectionCheck"], 1_700_000_000_000i64);
        assert_eq!(body["path"], "/api/health");
    }

    #[tokio::test]
    async fn test_account_refused_when_disconnected() {
        let gateway = Arc::new(StubGateway::new(false));
        let (status, body) = send(gateway.clone(), get_req("/api/account")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "MT5 server connection failed");
        assert_eq!(body["code"], 503);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_account_success_envelope() {
        let (status, body) = send(Arc::new(StubGateway::new(true)), get_req("/api/account")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["login"], 42);
        assert_eq!(body["data"]["equity"], 1010.0);
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_positions_listed() {
        let mut stub = StubGateway::new(true);
        stub.positions = vec![Position {
            ticket: 9,
            symbol: "EURUSD".to_string(),
            position_type: PositionType::Buy,
            volume: 1.0,
            price_open: 1.08,
            price_current: 1.09,
            profit: 100.0,
            sl: 0.0,
            tp: 0.0,
            swap: 0.0,
            time: 0,
            time_update: 0,
            magic: 0,
            identifier: 9,
            comment: String::new(),
            external_id: String::new(),
        }];
        let (status, body) = send(Arc::new(stub), get_req("/api/positions")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["ticket"], 9);
        assert_eq!(body["data"][0]["type"], 0);
    }

    #[tokio::test]
    async fn test_invalid_trade_rejected_before_gateway() {
        let gateway = Arc::new(StubGateway::new(true));
        let (status, body) = send(
            gateway.clone(),
            post_json(
                "/api/trade",
                serde_json::json!({ "symbol": "EURUSD", "volume": 250.0, "side": "buy" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid volume"));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_wrapped_in_envelope() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/trade")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(Arc::new(StubGateway::new(true)), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_missing_content_type_keeps_415() {
        let gateway = Arc::new(StubGateway::new(true));
        let request = Request::builder()
            .method("POST")
            .uri("/api/close")
            .body(Body::from(r#"{"positionId":1}"#))
            .unwrap();
        let (status, body) = send(gateway.clone(), request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["code"], 415);
        assert_eq!(body["success"], false);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_trade_success_and_rejection() {
        let trade = serde_json::json!({ "symbol": "EURUSD", "volume": 1.0, "side": "sell" });

        let (status, body) =
            send(Arc::new(StubGateway::new(true)), post_json("/api/trade", trade.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["retcode"], 10009);
        assert_eq!(body["data"]["deal"], 7);

        let mut stub = StubGateway::new(true);
        stub.trade_retcode = 10018;
        let (status, body) = send(Arc::new(stub), post_json("/api/trade", trade)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Trade failed with code 10018: Market is closed");
    }

    #[tokio::test]
    async fn test_close_unknown_position_is_404() {
        let (status, body) = send(
            Arc::new(StubGateway::new(true)),
            post_json("/api/close", serde_json::json!({ "positionId": 999999 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Position 999999 not found");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, body) = send(Arc::new(StubGateway::new(true)), get_req("/api/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route GET /api/nope not found");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&GatewayError::Connection {
                operation: Operation::Ping,
                message: String::new(),
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&GatewayError::Broker {
                operation: Operation::AccountInfo,
                message: String::new(),
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&ValidationError::new("side", "bad").into()),
            StatusCode::BAD_REQUEST
        );
    }
}
