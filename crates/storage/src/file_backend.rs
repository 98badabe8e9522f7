//! File-based quota store: a single JSON record on disk.
//!
//! Storage location: `~/.contextloop/quota.json`
//!
//! The record is read into memory on creation and flushed to disk on every
//! write. A corrupted record is discarded with a warning rather than
//! propagated; quota accounting is best-effort and must never block a chat
//! turn. Concurrent writers (multiple IDE windows) are not synchronized; the
//! read-modify-write race is an accepted limitation of the quota design.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contextloop_core::error::StorageError;
use contextloop_core::storage::{QuotaStore, QuotaUsage};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A quota store backed by a single JSON file.
pub struct FileQuotaStore {
    path: PathBuf,
    usage: RwLock<QuotaUsage>,
}

impl FileQuotaStore {
    /// Create a store at the given path, loading the record if one exists.
    pub fn new(path: PathBuf) -> Self {
        let usage = Self::load_from_disk(&path);
        debug!(path = %path.display(), "File quota store loaded");
        Self {
            path,
            usage: RwLock::new(usage),
        }
    }

    /// Default path: `~/.contextloop/quota.json`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".contextloop").join("quota.json")
    }

    fn load_from_disk(path: &PathBuf) -> QuotaUsage {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            // File doesn't exist yet, start empty
            Err(_) => return QuotaUsage::default(),
        };

        match serde_json::from_str::<QuotaUsage>(&content) {
            Ok(usage) => usage,
            Err(e) => {
                warn!(error = %e, "Discarding corrupted quota record");
                QuotaUsage::default()
            }
        }
    }

    async fn flush(&self, usage: &QuotaUsage) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Write(e.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(usage).map_err(|e| StorageError::Write(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| StorageError::Write(e.to_string()))
    }
}

#[async_trait]
impl QuotaStore for FileQuotaStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn usage(&self) -> Result<QuotaUsage, StorageError> {
        Ok(self.usage.read().await.clone())
    }

    async fn set_usage(
        &self,
        quota: f64,
        last_used: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let usage = QuotaUsage {
            quota: Some(quota),
            last_used: Some(last_used),
        };
        self.flush(&usage).await?;
        *self.usage.write().await = usage;
        Ok(())
    }
}
