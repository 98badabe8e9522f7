//! Storage backends for the contextloop quota record.
//!
//! The quota limiter persists a single `{quota, last_used}` record through
//! the [`QuotaStore`](contextloop_core::QuotaStore) trait. Two backends are
//! provided: an in-memory store for tests and ephemeral sessions, and a
//! JSON-file store for durable per-user state.

pub mod file_backend;
pub mod flag;
pub mod in_memory;

pub use file_backend::FileQuotaStore;
pub use flag::SharedRateLimitFlag;
pub use in_memory::InMemoryQuotaStore;
