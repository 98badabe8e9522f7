//! Raw text buffering and tag extraction for streamed model output.
//!
//! [`RawTextProcessor`] accumulates incrementally-arriving fragments and
//! supports destructive consumption plus XML-style tag extraction from the
//! markup the model emits to address tools.

use regex::Regex;

/// Accumulates streamed text fragments.
///
/// Fragments are stored as-is; the full string is only materialized by
/// [`consume_and_clear`](RawTextProcessor::consume_and_clear). Length is
/// tracked incrementally so `len` stays O(1).
#[derive(Debug, Default)]
pub struct RawTextProcessor {
    parts: Vec<String>,
    len: usize,
}

impl RawTextProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. O(1) amortized.
    pub fn append(&mut self, fragment: &str) {
        self.len += fragment.len();
        self.parts.push(fragment.to_string());
    }

    /// Sum of all buffered fragment lengths in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Destructive read: concatenates all fragments, clears the buffer, and
    /// returns the joined string. A second call returns the empty string.
    pub fn consume_and_clear(&mut self) -> String {
        let joined = self.parts.concat();
        self.parts.clear();
        self.len = 0;
        joined
    }

    /// Extract the inner contents of every non-overlapping `<tag>...</tag>`
    /// span, in order. Matching is non-greedy and spans newlines. Malformed
    /// or unclosed tags yield no match for that span.
    pub fn extract(text: &str, tag: &str) -> Vec<String> {
        let pattern = format!("(?s)<{tag}>(.*?)</{tag}>", tag = regex::escape(tag));
        let Ok(re) = Regex::new(&pattern) else {
            return Vec::new();
        };
        re.captures_iter(text).map(|c| c[1].to_string()).collect()
    }

    /// Join string-like values with a connector.
    pub fn join<S: AsRef<str>>(parts: &[S], connector: &str) -> String {
        parts
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(connector)
    }

    /// Join string-like values with the default newline connector.
    pub fn join_lines<S: AsRef<str>>(parts: &[S]) -> String {
        Self::join(parts, "\n")
    }
}
