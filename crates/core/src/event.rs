//! Domain event system: one-way emission of review and quota events.
//!
//! Events are published when something interesting happens in the engine.
//! Telemetry and UI components subscribe and react without any handle back
//! into controller state. Publishing is best-effort: a missing subscriber or
//! a lagging receiver never affects the review loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A context review run started.
    ReviewStarted {
        request_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A context review run finished.
    ReviewCompleted {
        request_id: String,
        /// Number of review rounds run.
        loops: u32,
        /// Number of context items fetched via tools.
        fetched: usize,
        /// Final context size handed back to the caller.
        context_items: usize,
        duration_ms: u64,
        model: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A tool finished its run phase.
    ToolExecuted {
        tag: String,
        success: bool,
        duration_ms: u64,
        items: usize,
        timestamp: DateTime<Utc>,
    },

    /// The second-to-last quota unit was just consumed.
    QuotaNearlyExhausted { timestamp: DateTime<Utc> },

    /// A review run was denied by the quota limiter.
    QuotaDenied {
        retry_after_secs: u64,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred somewhere in the engine.
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Components can subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
