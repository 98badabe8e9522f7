//! Shared rate-limit flag for UI consumption.

use contextloop_core::storage::RateLimitSink;
use std::sync::atomic::{AtomicBool, Ordering};

/// An atomic flag UI surfaces can poll to show a "rate limited" state.
///
/// Implements [`RateLimitSink`] so the quota limiter can flip it without
/// knowing who reads it.
#[derive(Default)]
pub struct SharedRateLimitFlag {
    limited: AtomicBool,
}

impl SharedRateLimitFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_rate_limited(&self) -> bool {
        self.limited.load(Ordering::Relaxed)
    }
}

impl RateLimitSink for SharedRateLimitFlag {
    fn set_rate_limited(&self, limited: bool) {
        self.limited.store(limited, Ordering::Relaxed);
    }
}
