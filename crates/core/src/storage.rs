//! Quota persistence: the external key-value record behind the rate limiter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// The persisted quota record.
///
/// Invariant: `0 <= quota <= daily_quota`. `last_used` is stored as an
/// RFC-3339 timestamp. Both fields are absent until first use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

/// Persistent store for the quota record.
///
/// A single external key-value record. Concurrent writers (e.g. multiple IDE
/// windows) are not synchronized by this trait; the read-modify-write race is
/// an accepted limitation of the quota design.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    async fn usage(&self) -> Result<QuotaUsage, StorageError>;

    async fn set_usage(&self, quota: f64, last_used: DateTime<Utc>)
    -> Result<(), StorageError>;
}

/// Sink for the shared "currently rate limited" flag consumed by UI surfaces.
///
/// Injected explicitly rather than reached through a module-level singleton.
pub trait RateLimitSink: Send + Sync {
    fn set_rate_limited(&self, limited: bool);
}
