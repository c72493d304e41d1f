pub mod routes;
pub mod state;

use axum::Router;
use gateway_core::TradingGateway;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum application router.
pub fn build_router(gateway: Arc<dyn TradingGateway>) -> Router {
    let app_state = Arc::new(state::AppState::new(gateway));

    Router::new()
        .nest("/api", routes::api_routes())
        .fallback(routes::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Start the API server and run until Ctrl-C.
pub async fn start_server(gateway: Arc<dyn TradingGateway>, bind_addr: &str) -> anyhow::Result<()> {
    let app = build_router(gateway);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("API server listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
