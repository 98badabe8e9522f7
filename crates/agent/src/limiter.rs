//! Time-decayed usage quota for agentic review runs.
//!
//! The quota replenishes linearly over a day rather than resetting at a fixed
//! boundary: after `elapsed` milliseconds, `daily * elapsed / one_day` units
//! flow back, capped at the daily allowance. Each granted run consumes one
//! unit. Denials are cached in memory so repeated attempts inside the wait
//! window skip the store read.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use contextloop_core::error::Error;
use contextloop_core::event::{DomainEvent, EventBus};
use contextloop_core::storage::{QuotaStore, RateLimitSink};

const ONE_DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Gates how often a caller may start a review run.
pub struct QuotaLimiter {
    base_quota: f64,
    multiplier: f64,
    store: Arc<dyn QuotaStore>,
    sink: Arc<dyn RateLimitSink>,
    event_bus: Arc<EventBus>,
    /// Last-used time of the most recent denial; lets repeat attempts be
    /// answered without a store round-trip until a day has passed.
    last_used_cache: Mutex<Option<DateTime<Utc>>>,
}

impl QuotaLimiter {
    pub fn new(
        base_quota: f64,
        multiplier: f64,
        store: Arc<dyn QuotaStore>,
        sink: Arc<dyn RateLimitSink>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            base_quota,
            multiplier,
            store,
            sink,
            event_bus,
            last_used_cache: Mutex::new(None),
        }
    }

    fn daily_quota(&self) -> f64 {
        self.base_quota * self.multiplier
    }

    /// Check the quota, consuming one unit when available.
    ///
    /// Returns `None` when the run may proceed, or `Some(seconds)` the caller
    /// must wait. A non-positive daily quota disables limiting entirely.
    pub async fn is_at_limit(&self) -> Option<u64> {
        let daily = self.daily_quota();
        if daily <= 0.0 {
            return None;
        }

        let now = Utc::now();

        {
            let mut cache = self.last_used_cache.lock().await;
            if let Some(cached) = *cache {
                let elapsed = (now - cached).num_milliseconds().max(0);
                if elapsed < ONE_DAY_MS {
                    let wait = ((ONE_DAY_MS - elapsed) / 1000) as u64;
                    debug!(wait_secs = wait, "Quota denial answered from cache");
                    return Some(wait);
                }
                *cache = None;
            }
        }

        let usage = match self.store.usage().await {
            Ok(usage) => usage,
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "Quota read failed; assuming fresh");
                Default::default()
            }
        };

        // A record with a quota but no timestamp cannot replenish; repair it
        // by granting and restamping.
        if usage.quota.is_some() && usage.last_used.is_none() {
            self.persist(daily - 1.0, now).await;
            return None;
        }

        let last_used = usage.last_used.unwrap_or(now);
        let elapsed = (now - last_used).num_milliseconds().max(0);
        let current = usage.quota.unwrap_or(daily);
        let replenished = daily * elapsed as f64 / ONE_DAY_MS as f64;
        let new_quota = daily.min(current + replenished);

        if new_quota >= 1.0 {
            self.persist(new_quota - 1.0, now).await;
            // Exactly one unit left before this consumption means the next
            // attempt is the last one that could replenish in time.
            if new_quota == 1.0 {
                self.event_bus.publish(DomainEvent::QuotaNearlyExhausted {
                    timestamp: Utc::now(),
                });
            }
            self.sink.set_rate_limited(new_quota == 1.0);
            return None;
        }

        *self.last_used_cache.lock().await = Some(last_used);
        let wait = ((ONE_DAY_MS - elapsed) / 1000) as u64;
        self.event_bus.publish(DomainEvent::QuotaDenied {
            retry_after_secs: wait,
            timestamp: Utc::now(),
        });
        Some(wait)
    }

    /// The error a denied caller should surface.
    pub fn rate_limit_error(&self, retry_after_secs: u64) -> Error {
        Error::RateLimited {
            feature: "Agentic Chat".to_string(),
            retry_after_secs,
        }
    }

    async fn persist(&self, quota: f64, last_used: DateTime<Utc>) {
        if let Err(e) = self.store.set_usage(quota, last_used).await {
            warn!(store = self.store.name(), error = %e, "Quota write failed");
        }
    }
}
