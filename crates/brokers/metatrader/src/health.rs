use gateway_core::ConnectionStatus;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

/// Time-boxed cache of broker reachability.
///
/// Only a positive result is trusted for `ttl`; while disconnected every
/// check probes again. Reads and writes are independent atomics, so two
/// concurrent probes may overwrite each other's timestamp. Probes are
/// idempotent and the last writer wins.
#[derive(Debug)]
pub struct ConnectionHealth {
    connected: AtomicBool,
    last_check_ms: AtomicI64,
    ttl: Duration,
}

impl ConnectionHealth {
    pub fn new(ttl: Duration) -> Self {
        Self {
            connected: AtomicBool::new(false),
            last_check_ms: AtomicI64::new(0),
            ttl,
        }
    }

    /// `Some(true)` when a successful probe at `now_ms` is still fresh.
    pub fn cached(&self, now_ms: i64) -> Option<bool> {
        if !self.connected.load(Ordering::Acquire) {
            return None;
        }
        let age = now_ms.saturating_sub(self.last_check_ms.load(Ordering::Acquire));
        let ttl = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        (age < ttl).then_some(true)
    }

    /// Store a probe outcome. The timestamp is updated either way.
    pub fn record(&self, connected: bool, now_ms: i64) {
        self.last_check_ms.store(now_ms, Ordering::Release);
        self.connected.store(connected, Ordering::Release);
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            connected: self.connected.load(Ordering::Acquire),
            last_check: self.last_check_ms.load(Ordering::Acquire),
        }
    }
}
