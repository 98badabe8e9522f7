//! Context items: references to retrievable content.
//!
//! A [`ContextItem`] points at a file, symbol, search result, or user-added
//! snippet. Identity is the locator: multiple review rounds may produce the
//! same locator and are merged by [`dedupe_by_locator`].

use serde::{Deserialize, Serialize};

/// Provenance of a context item.
///
/// Distinguishes explicit user selections (which must survive context
/// replacement) from agent-discovered content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextItemSource {
    /// Explicitly added by the user (an @-mention or attached file).
    User,
    /// Taken from the user's editor selection.
    Selection,
    /// Discovered by the review agent.
    Agentic,
    /// Produced by a tool run.
    Tool,
    /// Origin unknown.
    Unspecified,
}

/// A reference to retrievable content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    /// Unique URI-like locator. The identity of the item.
    pub locator: String,

    /// Human-readable title.
    pub title: String,

    /// Where the item came from.
    pub source: ContextItemSource,

    /// Materialized content, present once fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ContextItem {
    pub fn new(
        locator: impl Into<String>,
        title: impl Into<String>,
        source: ContextItemSource,
    ) -> Self {
        Self {
            locator: locator.into(),
            title: title.into(),
            source,
            content: None,
        }
    }

    /// Attach materialized content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Re-tag the provenance of this item.
    pub fn with_source(mut self, source: ContextItemSource) -> Self {
        self.source = source;
        self
    }

    /// Whether this item was explicitly added by the user.
    pub fn is_user_added(&self) -> bool {
        matches!(
            self.source,
            ContextItemSource::User | ContextItemSource::Selection
        )
    }
}

/// Merge duplicate locators, keeping the first occurrence.
///
/// When a later duplicate carries materialized content and the kept item does
/// not, the content is adopted.
pub fn dedupe_by_locator(items: Vec<ContextItem>) -> Vec<ContextItem> {
    let mut out: Vec<ContextItem> = Vec::with_capacity(items.len());
    for item in items {
        if let Some(existing) = out.iter_mut().find(|e| e.locator == item.locator) {
            if existing.content.is_none() && item.content.is_some() {
                existing.content = item.content;
            }
        } else {
            out.push(item);
        }
    }
    out
}
