//! # Contextloop Core
//!
//! Domain types, traits, and error definitions for the contextloop agentic
//! context engine. This crate has **zero framework dependencies**: it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the review loop consumes is defined as a trait here:
//! the chat-completion stream source, the pluggable context tools, the prompt
//! assembler, the file resolver, and the quota store. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod chat;
pub mod context;
pub mod error;
pub mod event;
pub mod files;
pub mod prompt;
pub mod storage;
pub mod text;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use chat::{ChatClient, ChatOptions, Message, Speaker, StreamEvent};
pub use context::{ContextItem, ContextItemSource, dedupe_by_locator};
pub use error::{ChatError, Error, Result, StorageError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use files::FileResolver;
pub use prompt::{EmptyTranscript, PromptMixin, Prompter, TranscriptSource};
pub use storage::{QuotaStore, QuotaUsage, RateLimitSink};
pub use text::RawTextProcessor;
pub use tool::{ContextTool, NullStatusCallback, ToolStatusCallback};
