//! The agentic context-review loop, the heart of contextloop.
//!
//! A review run follows an iterative **stream → dispatch → merge** cycle:
//!
//! 1. **Build a prompt** from the accumulated context (user selections stay
//!    explicit, agent-gathered items are truncated to a recent window)
//! 2. **Stream** the model response, demultiplexing tagged spans to the
//!    tools that own them
//! 3. **Run all tools concurrently** and resolve any `<context>` file
//!    requests against known context
//! 4. **Merge** the results and decide whether another round is warranted
//!
//! The loop stops on convergence (no new items, or nothing novel), on the
//! round limit, or on cancellation. The [`QuotaLimiter`] gates how often a
//! caller may start a run at all.

pub mod limiter;
pub mod multiplexer;
pub mod prompts;
pub mod review;

pub use limiter::QuotaLimiter;
pub use multiplexer::{ResponseMultiplexer, TagSubscriber};
pub use prompts::{DefaultPrompter, build_review_mixin, is_ready_to_answer, tags};
pub use review::{ReviewAgent, ReviewStats};
