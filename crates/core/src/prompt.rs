//! Prompt-assembly collaborators.
//!
//! The review loop never builds prompt text itself; it hands its current
//! context to a [`Prompter`] supplied by the hosting chat pipeline.

use crate::chat::Message;
use crate::context::ContextItem;

/// An instruction block mixed into the system portion of a prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMixin(String);

impl PromptMixin {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

/// Builds the model prompt from the current context. Pure function of its
/// inputs.
pub trait Prompter: Send + Sync {
    /// `explicit` holds user-added mentions, `implicit` everything the agent
    /// has gathered (already truncated to the most recent window by the
    /// caller).
    fn make_prompt(
        &self,
        explicit: &[ContextItem],
        implicit: &[ContextItem],
        mixins: &[PromptMixin],
    ) -> Vec<Message>;
}

/// Source of context previously attached to transcript messages.
pub trait TranscriptSource: Send + Sync {
    /// Per-message context items, most-recent-first.
    fn prior_context(&self) -> Vec<ContextItem>;
}

/// A transcript with no history.
pub struct EmptyTranscript;

impl TranscriptSource for EmptyTranscript {
    fn prior_context(&self) -> Vec<ContextItem> {
        Vec::new()
    }
}
