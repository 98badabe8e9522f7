//! Chat-completion stream source: the abstraction over the model backend.
//!
//! A [`ChatClient`] knows how to send a prompt to a language model and stream
//! the response back as a sequence of [`StreamEvent`]s over a channel.
//! Implementations live outside this workspace (the hosting chat pipeline
//! provides one); the review loop only depends on this contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ChatError;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Human,
    Assistant,
    System,
}

/// A single prompt message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub speaker: Speaker,
    pub text: String,
}

impl Message {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Human,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::System,
            text: text.into(),
        }
    }
}

/// Per-request options for a chat call.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Model override; `None` uses the backend default.
    pub model: Option<String>,
    /// Maximum tokens to sample.
    pub max_tokens: u32,
}

/// One event in a streaming chat response.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The **cumulative** response text so far. Consumers slice off the
    /// prefix they have already seen.
    Change { text: String },
    /// The turn finished normally.
    Complete,
    /// The stream failed mid-flight.
    Error { error: ChatError },
}

/// The chat-completion stream source.
///
/// `chat` returns a receiver the caller drains fragment-by-fragment. The
/// backend must observe `cancel` and close the channel promptly once it is
/// triggered.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(
        &self,
        messages: Vec<Message>,
        options: ChatOptions,
        cancel: CancellationToken,
        request_id: &str,
    ) -> Result<mpsc::Receiver<StreamEvent>, ChatError>;
}
