//! Outbound rate limiting between artifact syncs.
//!
//! The engine calls [`RateGate::throttle`] once after every sync attempt
//! that reached the metadata store, whether it succeeded or failed. The
//! gate decides how long to hold the caller before the next artifact.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait RateGate: Send + Sync {
    async fn throttle(&self);
}

/// Sleeps for a fixed delay on every call.
#[derive(Debug)]
pub struct FixedDelay {
    delay: Duration,
    calls: AtomicU64,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicU64::new(0),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Number of times the gate has been passed through.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RateGate for FixedDelay {
    async fn throttle(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Never waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unthrottled;

#[async_trait]
impl RateGate for Unthrottled {
    async fn throttle(&self) {}
}

/// Build the gate described by `[sync] delay_ms`.
pub fn from_delay_ms(delay_ms: u64) -> Box<dyn RateGate> {
    if delay_ms == 0 {
        Box::new(Unthrottled)
    } else {
        Box::new(FixedDelay::from_millis(delay_ms))
    }
}
