//! Response multiplexer: routes one streamed model response to per-tag
//! subscribers.
//!
//! The model addresses tools by wrapping content in `<tag>...</tag>` spans.
//! Fragments arrive in arbitrary pieces, so a tag marker may be split across
//! fragment boundaries; the multiplexer holds back any buffer suffix that
//! could still grow into a marker. Content outside subscribed tags is
//! discarded.
//!
//! Single-writer discipline: `publish` takes `&mut self` and must see
//! fragments in stream order. A fragment is fully routed before `publish`
//! returns.

use async_trait::async_trait;
use contextloop_core::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Receiver side of one tag channel.
#[async_trait]
pub trait TagSubscriber: Send + Sync {
    /// A piece of the inner content of this tag.
    async fn on_response(&self, content: &str) -> Result<()>;

    /// The streaming turn ended (normally or aborted).
    async fn on_turn_complete(&self) -> Result<()>;
}

/// Demultiplexes a single text stream into per-tag channels.
#[derive(Default)]
pub struct ResponseMultiplexer {
    subs: HashMap<String, Arc<dyn TagSubscriber>>,
    /// Unrouted stream text carried across `publish` calls.
    buffer: String,
    /// The tag whose span we are currently inside, if any.
    open: Option<String>,
}

impl ResponseMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the subscriber for a tag. Re-subscribing an existing tag
    /// overwrites the previous subscriber (last wins).
    pub fn subscribe(&mut self, tag: impl Into<String>, subscriber: Arc<dyn TagSubscriber>) {
        self.subs.insert(tag.into(), subscriber);
    }

    /// Route the next fragment of the raw stream.
    ///
    /// Suspends while subscriber handlers run; a subscriber error propagates
    /// to the caller. Must not be invoked concurrently with itself on the
    /// same instance.
    pub async fn publish(&mut self, fragment: &str) -> Result<()> {
        self.buffer.push_str(fragment);

        loop {
            if let Some(tag) = self.open.clone() {
                let close = format!("</{tag}>");
                if let Some(idx) = self.buffer.find(&close) {
                    let inner: String = self.buffer[..idx].to_string();
                    self.buffer.drain(..idx + close.len());
                    self.open = None;
                    if !inner.is_empty() {
                        self.route(&tag, &inner).await?;
                    }
                    continue;
                }

                // No close marker yet: route everything that cannot be the
                // start of one.
                let hold = suffix_prefix_overlap(&self.buffer, &close);
                let safe_end = self.buffer.len() - hold;
                if safe_end > 0 {
                    let inner: String = self.buffer[..safe_end].to_string();
                    self.buffer.drain(..safe_end);
                    self.route(&tag, &inner).await?;
                }
                return Ok(());
            }

            match self.find_earliest_open() {
                Some((idx, tag, marker_len)) => {
                    trace!(tag, "Entering tag span");
                    // Text before a subscribed tag has no channel; drop it.
                    self.buffer.drain(..idx + marker_len);
                    self.open = Some(tag);
                }
                None => {
                    // Keep only a tail that could still become an open marker.
                    let hold = self.open_marker_holdback();
                    let cut = self.buffer.len() - hold;
                    self.buffer.drain(..cut);
                    return Ok(());
                }
            }
        }
    }

    /// Signal the end of a streaming turn.
    ///
    /// Flushes any still-open span's buffered content to its subscriber (the
    /// stream ended mid-tag), then notifies every subscriber. Safe to call
    /// when no tags matched, and safe to call more than once per turn.
    pub async fn notify_turn_complete(&mut self) -> Result<()> {
        if let Some(tag) = self.open.take() {
            let inner = std::mem::take(&mut self.buffer);
            if !inner.is_empty() {
                self.route(&tag, &inner).await?;
            }
        } else {
            self.buffer.clear();
        }

        for sub in self.subs.values() {
            sub.on_turn_complete().await?;
        }
        Ok(())
    }

    async fn route(&self, tag: &str, content: &str) -> Result<()> {
        if let Some(sub) = self.subs.get(tag) {
            sub.on_response(content).await?;
        }
        Ok(())
    }

    /// Earliest `<tag>` marker of any subscribed tag in the buffer.
    fn find_earliest_open(&self) -> Option<(usize, String, usize)> {
        let mut earliest: Option<(usize, String, usize)> = None;
        for tag in self.subs.keys() {
            let marker = format!("<{tag}>");
            if let Some(idx) = self.buffer.find(&marker) {
                if earliest.as_ref().is_none_or(|(best, _, _)| idx < *best) {
                    earliest = Some((idx, tag.clone(), marker.len()));
                }
            }
        }
        earliest
    }

    /// Longest buffer suffix that is a proper prefix of any subscribed open
    /// marker.
    fn open_marker_holdback(&self) -> usize {
        self.subs
            .keys()
            .map(|tag| suffix_prefix_overlap(&self.buffer, &format!("<{tag}>")))
            .max()
            .unwrap_or(0)
    }
}

/// Length of the longest proper prefix of `marker` that is a suffix of
/// `buffer`.
fn suffix_prefix_overlap(buffer: &str, marker: &str) -> usize {
    let max = marker.len().saturating_sub(1).min(buffer.len());
    for k in (1..=max).rev() {
        if marker.is_char_boundary(k) && buffer.ends_with(&marker[..k]) {
            return k;
        }
    }
    0
}
