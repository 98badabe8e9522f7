//! Built-in context tool implementations for contextloop.
//!
//! Each tool implements [`ContextTool`](contextloop_core::ContextTool): it
//! owns a markup tag, accumulates the content the model streams under that
//! tag, and on `run` turns the accumulated content into context items.
//! The review loop runs all tools concurrently and isolates their failures.

pub mod cli_tool;
pub mod file_tool;
pub mod resolver;

pub use cli_tool::CliTool;
pub use file_tool::FileTool;
pub use resolver::WorkspaceFileResolver;
