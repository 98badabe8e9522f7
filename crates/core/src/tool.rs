//! ContextTool trait: the abstraction over context-gathering capabilities.
//!
//! Tools are what let the review agent retrieve content on its own:
//! read files, run commands, issue searches. Each tool owns a markup tag;
//! the model addresses a tool by emitting `<tag>...</tag>` spans, which the
//! response multiplexer streams into the tool between rounds.

use async_trait::async_trait;

use crate::context::ContextItem;
use crate::error::ToolError;

/// A pluggable context-gathering capability.
///
/// Lifecycle within one review round:
/// 1. [`stream`](ContextTool::stream) is called with each fragment of content
///    the model emitted under this tool's tag; the tool accumulates it
///    privately.
/// 2. Once the streaming phase ends, [`run`](ContextTool::run) parses the
///    accumulated content and produces zero or more context items. All tools
///    run concurrently; a failure here is isolated to this tool.
/// 3. On a turn that yielded no tool work,
///    [`process_response`](ContextTool::process_response) gives the tool a
///    chance to finalize.
#[async_trait]
pub trait ContextTool: Send + Sync {
    /// The markup tag this tool listens on (e.g. `"file"` for `<file>` spans).
    fn tag(&self) -> &str;

    /// One instruction line telling the model how to address this tool.
    fn instruction(&self) -> String;

    /// Accumulate a fragment of streamed tag content.
    async fn stream(&self, content: &str);

    /// Parse accumulated content into context items.
    async fn run(&self, status: &dyn ToolStatusCallback) -> Result<Vec<ContextItem>, ToolError>;

    /// Finalize a turn that produced no tool work.
    async fn process_response(&self) {}
}

/// Fire-and-forget sink for tool progress reporting.
///
/// Called frequently during a review; implementations must not block and
/// must never fail.
pub trait ToolStatusCallback: Send + Sync {
    /// A review run is starting.
    fn on_start(&self);

    /// Progress text for the given label (a tool tag or a loop phase name).
    fn on_stream(&self, label: &str, content: &str);

    /// The labeled step finished, with an error when it failed.
    fn on_complete(&self, label: &str, error: Option<&ToolError>);
}

/// A status sink that discards everything.
pub struct NullStatusCallback;

impl ToolStatusCallback for NullStatusCallback {
    fn on_start(&self) {}
    fn on_stream(&self, _label: &str, _content: &str) {}
    fn on_complete(&self, _label: &str, _error: Option<&ToolError>) {}
}
