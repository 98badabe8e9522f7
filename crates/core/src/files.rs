//! File-path resolution collaborator.

use async_trait::async_trait;

use crate::context::ContextItem;

/// Resolves a workspace-relative path into a materialized context item.
#[async_trait]
pub trait FileResolver: Send + Sync {
    /// Returns `None` when the path does not resolve. Ordinary not-found must
    /// never surface as an error; callers fall back to whatever unmaterialized
    /// item they already hold.
    async fn context_from_relative_path(&self, name: &str) -> Option<ContextItem>;
}
