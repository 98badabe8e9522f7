//! Error types for the contextloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all contextloop operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Chat stream errors ---
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Quota ---
    #[error("{feature} is rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        feature: String,
        retry_after_secs: u64,
    },

    // --- Cancellation (flow control, not a failure) ---
    #[error("Operation aborted")]
    Aborted,

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors raised by the chat-completion stream source.
///
/// `Clone` because a stream error travels inside a [`StreamEvent`] before it
/// is surfaced to the loop controller.
///
/// [`StreamEvent`]: crate::chat::StreamEvent
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool execution failed: {tag}: {reason}")]
    ExecutionFailed { tag: String, reason: String },

    #[error("Tool timed out: {tag} after {timeout_secs}s")]
    Timeout { tag: String, timeout_secs: u64 },

    #[error("Permission denied: {tag}: {reason}")]
    PermissionDenied { tag: String, reason: String },

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    Read(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Corrupted record: {0}")]
    Corrupted(String),
}
