//! In-memory quota store, useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contextloop_core::error::StorageError;
use contextloop_core::storage::{QuotaStore, QuotaUsage};
use tokio::sync::RwLock;

/// A quota store that keeps the record in memory.
#[derive(Default)]
pub struct InMemoryQuotaStore {
    usage: RwLock<QuotaUsage>,
}

impl InMemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing record.
    pub fn with_usage(quota: f64, last_used: DateTime<Utc>) -> Self {
        Self {
            usage: RwLock::new(QuotaUsage {
                quota: Some(quota),
                last_used: Some(last_used),
            }),
        }
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuotaStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn usage(&self) -> Result<QuotaUsage, StorageError> {
        Ok(self.usage.read().await.clone())
    }

    async fn set_usage(
        &self,
        quota: f64,
        last_used: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        *self.usage.write().await = QuotaUsage {
            quota: Some(quota),
            last_used: Some(last_used),
        };
        Ok(())
    }
}
