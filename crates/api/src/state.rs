use gateway_core::TradingGateway;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    /// The single gateway instance built at startup.
    pub gateway: Arc<dyn TradingGateway>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(gateway: Arc<dyn TradingGateway>) -> Self {
        Self {
            gateway,
            started_at: Instant::now(),
        }
    }
}
