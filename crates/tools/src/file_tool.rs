//! File tool: retrieves full file contents the model asks for by name.

use async_trait::async_trait;
use contextloop_core::context::{ContextItem, ContextItemSource};
use contextloop_core::error::ToolError;
use contextloop_core::files::FileResolver;
use contextloop_core::text::RawTextProcessor;
use contextloop_core::tool::{ContextTool, ToolStatusCallback};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub const FILE_TAG: &str = "file";

/// Resolves file names the model emitted under `<file>` into materialized
/// context items. Names may be separated by newlines or commas.
pub struct FileTool {
    resolver: Arc<dyn FileResolver>,
    buffer: Mutex<RawTextProcessor>,
}

impl FileTool {
    pub fn new(resolver: Arc<dyn FileResolver>) -> Self {
        Self {
            resolver,
            buffer: Mutex::new(RawTextProcessor::new()),
        }
    }

    fn parse_names(content: &str) -> Vec<String> {
        content
            .split(['\n', ','])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl ContextTool for FileTool {
    fn tag(&self) -> &str {
        FILE_TAG
    }

    fn instruction(&self) -> String {
        format!(
            "To retrieve the full content of a codebase file, enclose its relative path in <{FILE_TAG}></{FILE_TAG}> tags, one path per line."
        )
    }

    async fn stream(&self, content: &str) {
        self.buffer.lock().unwrap().append(content);
    }

    async fn run(&self, status: &dyn ToolStatusCallback) -> Result<Vec<ContextItem>, ToolError> {
        let content = self.buffer.lock().unwrap().consume_and_clear();
        let names = Self::parse_names(&content);
        if names.is_empty() {
            return Ok(vec![]);
        }

        let mut items = Vec::with_capacity(names.len());
        for name in &names {
            match self.resolver.context_from_relative_path(name).await {
                Some(item) => {
                    status.on_stream(FILE_TAG, name);
                    items.push(item.with_source(ContextItemSource::Agentic));
                }
                None => {
                    debug!(name, "File tool could not resolve path");
                    status.on_stream(FILE_TAG, &format!("not found: {name}"));
                }
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::WorkspaceFileResolver;
    use contextloop_core::tool::NullStatusCallback;
    use std::io::Write;

    fn tool_over_workspace(files: &[(&str, &str)]) -> (tempfile::TempDir, FileTool) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            let mut f = std::fs::File::create(&path).unwrap();
            write!(f, "{content}").unwrap();
        }
        let resolver = Arc::new(WorkspaceFileResolver::new(dir.path().to_path_buf()));
        (dir, FileTool::new(resolver))
    }

    #[tokio::test]
    async fn resolves_streamed_names() {
        let (_dir, tool) = tool_over_workspace(&[("a.rs", "aaa"), ("b.rs", "bbb")]);
        tool.stream("a.rs\n").await;
        tool.stream("b.rs").await;

        let items = tool.run(&NullStatusCallback).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source, ContextItemSource::Agentic);
        assert_eq!(items[0].content.as_deref(), Some("aaa"));
        assert_eq!(items[1].content.as_deref(), Some("bbb"));
    }

    #[tokio::test]
    async fn missing_names_are_skipped() {
        let (_dir, tool) = tool_over_workspace(&[("a.rs", "aaa")]);
        tool.stream("a.rs, nope.rs").await;

        let items = tool.run(&NullStatusCallback).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "a.rs");
    }

    #[tokio::test]
    async fn empty_buffer_yields_nothing() {
        let (_dir, tool) = tool_over_workspace(&[]);
        let items = tool.run(&NullStatusCallback).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn run_consumes_buffer() {
        let (_dir, tool) = tool_over_workspace(&[("a.rs", "aaa")]);
        tool.stream("a.rs").await;
        assert_eq!(tool.run(&NullStatusCallback).await.unwrap().len(), 1);
        // Second run sees an empty buffer.
        assert!(tool.run(&NullStatusCallback).await.unwrap().is_empty());
    }
}
