//! Workspace file resolution: relative path to materialized context item.

use async_trait::async_trait;
use contextloop_core::context::{ContextItem, ContextItemSource};
use contextloop_core::files::FileResolver;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Resolves workspace-relative paths against a root directory.
///
/// Paths escaping the root (absolute paths or `..` traversal) do not resolve.
pub struct WorkspaceFileResolver {
    root: PathBuf,
}

impl WorkspaceFileResolver {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn is_safe_relative(path: &Path) -> bool {
        !path.is_absolute()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    }
}

#[async_trait]
impl FileResolver for WorkspaceFileResolver {
    async fn context_from_relative_path(&self, name: &str) -> Option<ContextItem> {
        let relative = Path::new(name.trim());
        if !Self::is_safe_relative(relative) {
            debug!(name, "Rejected non-relative context path");
            return None;
        }

        let full = self.root.join(relative);
        let content = tokio::fs::read_to_string(&full).await.ok()?;
        Some(
            ContextItem::new(
                format!("file://{}", full.display()),
                name.trim(),
                ContextItemSource::Unspecified,
            )
            .with_content(content),
        )
    }
}
