//! The context-review controller.
//!
//! [`ReviewAgent`] drives the bounded review loop: prompt the model with the
//! current context, stream its response through the multiplexer, run every
//! addressed tool concurrently, resolve `<context>` keep-requests, merge, and
//! decide whether another round is warranted. A failed round degrades to "no
//! new context"; the caller always gets a usable context list back.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use async_trait::async_trait;
use contextloop_config::AgentConfig;
use contextloop_core::chat::{ChatClient, ChatOptions, StreamEvent};
use contextloop_core::context::{ContextItem, ContextItemSource, dedupe_by_locator};
use contextloop_core::error::{Error, Result};
use contextloop_core::event::{DomainEvent, EventBus};
use contextloop_core::files::FileResolver;
use contextloop_core::prompt::{PromptMixin, Prompter, TranscriptSource};
use contextloop_core::text::RawTextProcessor;
use contextloop_core::tool::{ContextTool, ToolStatusCallback};

use crate::multiplexer::{ResponseMultiplexer, TagSubscriber};
use crate::prompts::{self, TOOL_CONTEXT_TITLE, build_review_mixin, is_ready_to_answer, tags};

/// Counters for one review run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReviewStats {
    /// Context items fetched by tools across the run.
    pub fetched: usize,
    /// Review rounds entered.
    pub loops: u32,
}

/// What caused the latest batch of new context, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundTrigger {
    Initial,
    ToolResults,
    ContextResolution,
    UserContext,
}

impl RoundTrigger {
    fn from_new_items(items: &[ContextItem]) -> Self {
        if items.is_empty() {
            Self::Initial
        } else if items.iter().all(ContextItem::is_user_added) {
            Self::UserContext
        } else if items.iter().any(|i| i.source == ContextItemSource::Agentic) {
            Self::ContextResolution
        } else {
            Self::ToolResults
        }
    }
}

/// Forwards one tag channel of the multiplexed stream into its tool.
struct ToolSubscriber(Arc<dyn ContextTool>);

#[async_trait]
impl TagSubscriber for ToolSubscriber {
    async fn on_response(&self, content: &str) -> Result<()> {
        self.0.stream(content).await;
        Ok(())
    }

    async fn on_turn_complete(&self) -> Result<()> {
        Ok(())
    }
}

/// The agentic context-review loop.
pub struct ReviewAgent {
    chat: Arc<dyn ChatClient>,
    prompter: Arc<dyn Prompter>,
    transcript: Arc<dyn TranscriptSource>,
    files: Arc<dyn FileResolver>,
    tools: Vec<Arc<dyn ContextTool>>,
    multiplexer: ResponseMultiplexer,
    mixins: Vec<PromptMixin>,
    status: Arc<dyn ToolStatusCallback>,
    event_bus: Arc<EventBus>,
    model: Option<String>,
    max_tokens: u32,
    max_loops: u32,
    max_search_items: usize,
    context: Vec<ContextItem>,
    stats: ReviewStats,
}

impl ReviewAgent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chat: Arc<dyn ChatClient>,
        prompter: Arc<dyn Prompter>,
        transcript: Arc<dyn TranscriptSource>,
        files: Arc<dyn FileResolver>,
        tools: Vec<Arc<dyn ContextTool>>,
        status: Arc<dyn ToolStatusCallback>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let mut multiplexer = ResponseMultiplexer::new();
        for tool in &tools {
            multiplexer.subscribe(tool.tag(), Arc::new(ToolSubscriber(Arc::clone(tool))));
        }
        let mixins = vec![build_review_mixin(&tools)];

        Self {
            chat,
            prompter,
            transcript,
            files,
            tools,
            multiplexer,
            mixins,
            status,
            event_bus,
            model: None,
            max_tokens: 4000,
            max_loops: 2,
            max_search_items: 30,
            context: Vec::new(),
            stats: ReviewStats::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_loops(mut self, max_loops: u32) -> Self {
        self.max_loops = max_loops.max(1);
        self
    }

    pub fn with_max_search_items(mut self, max_search_items: usize) -> Self {
        self.max_search_items = max_search_items;
        self
    }

    pub fn with_config(mut self, config: &AgentConfig) -> Self {
        self.model = config.model.clone();
        self.max_tokens = config.max_tokens;
        self.max_loops = config.max_loops.max(1);
        self.max_search_items = config.max_search_items;
        self
    }

    pub fn stats(&self) -> ReviewStats {
        self.stats
    }

    /// Run the full review and hand back the refined context.
    ///
    /// Never fails: any round-level error is logged and treated as
    /// convergence, so the caller can always proceed with what was gathered.
    pub async fn get_context(
        &mut self,
        request_id: &str,
        cancel: CancellationToken,
        context: Vec<ContextItem>,
    ) -> Vec<ContextItem> {
        let started = Instant::now();
        self.context = context;
        self.stats = ReviewStats::default();

        self.status.on_start();
        self.event_bus.publish(DomainEvent::ReviewStarted {
            request_id: request_id.to_string(),
            timestamp: Utc::now(),
        });

        self.review_loop(request_id, cancel).await;

        self.event_bus.publish(DomainEvent::ReviewCompleted {
            request_id: request_id.to_string(),
            loops: self.stats.loops,
            fetched: self.stats.fetched,
            context_items: self.context.len(),
            duration_ms: started.elapsed().as_millis() as u64,
            model: self.model.clone(),
            timestamp: Utc::now(),
        });
        self.status.on_stream("Sending final request", "");

        std::mem::take(&mut self.context)
    }

    async fn review_loop(&mut self, request_id: &str, cancel: CancellationToken) {
        for _ in 0..self.max_loops {
            if cancel.is_cancelled() {
                break;
            }
            self.stats.loops += 1;
            self.status.on_stream("Agentic context reflection", "");

            let new = self.review(request_id, &cancel).await;
            if new.is_empty() {
                self.status.on_complete("Agentic context reflection", None);
                break;
            }
            debug!(
                round = self.stats.loops,
                new_items = new.len(),
                trigger = ?RoundTrigger::from_new_items(&new),
                "Review round produced context"
            );

            let valid: Vec<ContextItem> = new
                .iter()
                .filter(|i| i.title != TOOL_CONTEXT_TITLE)
                .cloned()
                .collect();
            self.stats.fetched += valid.len();

            let mut merged = std::mem::take(&mut self.context);
            merged.extend(valid);
            self.context = dedupe_by_locator(merged);

            // Only user-added items means the model asked for nothing new.
            if new.iter().all(ContextItem::is_user_added) {
                break;
            }
        }
    }

    /// One review round. Errors degrade to an empty result.
    async fn review(&mut self, request_id: &str, cancel: &CancellationToken) -> Vec<ContextItem> {
        match self.try_review(request_id, cancel).await {
            Ok(items) => items,
            Err(e) => {
                debug!(error = %e, "Review round failed; treating as converged");
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: "review".to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                if let Err(e) = self.multiplexer.notify_turn_complete().await {
                    warn!(error = %e, "Turn-complete notification failed");
                }
                Vec::new()
            }
        }
    }

    async fn try_review(
        &mut self,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContextItem>> {
        let messages = self.build_round_prompt();
        let response = self.process_stream(messages, request_id, cancel).await?;
        let trimmed = response.trim();

        if trimmed.is_empty() || is_ready_to_answer(trimmed) {
            for tool in &self.tools {
                tool.process_response().await;
            }
            return Ok(Vec::new());
        }

        // All addressed tools run concurrently; one failing tool never
        // poisons the round.
        let runs = self.tools.iter().map(|tool| {
            let tool = Arc::clone(tool);
            let status = Arc::clone(&self.status);
            let bus = Arc::clone(&self.event_bus);
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return Vec::new();
                }
                let started = Instant::now();
                match tool.run(status.as_ref()).await {
                    Ok(items) => {
                        bus.publish(DomainEvent::ToolExecuted {
                            tag: tool.tag().to_string(),
                            success: true,
                            duration_ms: started.elapsed().as_millis() as u64,
                            items: items.len(),
                            timestamp: Utc::now(),
                        });
                        items
                    }
                    Err(e) => {
                        warn!(tag = tool.tag(), error = %e, "Tool run failed");
                        status.on_complete(tool.tag(), Some(&e));
                        bus.publish(DomainEvent::ToolExecuted {
                            tag: tool.tag().to_string(),
                            success: false,
                            duration_ms: started.elapsed().as_millis() as u64,
                            items: 0,
                            timestamp: Utc::now(),
                        });
                        Vec::new()
                    }
                }
            }
        });
        let results = join_all(runs).await;

        self.resolve_kept_context(trimmed).await;

        let new_fetched: Vec<ContextItem> = results.into_iter().flatten().collect();
        self.stats.fetched += new_fetched.len();
        Ok(new_fetched)
    }

    /// Re-resolve the names the model listed under `<context>` and rebuild
    /// the working context from them plus the user-added items. Known items
    /// the model did not re-list are dropped.
    async fn resolve_kept_context(&mut self, response: &str) {
        let names = RawTextProcessor::extract(response, tags::CONTEXT);
        if names.is_empty() {
            return;
        }

        let mut current = self.context.clone();
        current.extend(self.transcript.prior_context());

        let mut reviewed = Vec::new();
        for name in names.iter().flat_map(|n| n.lines()) {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if let Some(item) = current.iter().find(|i| i.locator.ends_with(name)) {
                let resolved = match self.files.context_from_relative_path(name).await {
                    Some(fresh) => fresh,
                    None => item.clone(),
                };
                reviewed.push(resolved.with_source(ContextItemSource::Agentic));
            }
        }

        if reviewed.is_empty() {
            return;
        }

        let selected: Vec<ContextItem> = self
            .context
            .iter()
            .filter(|i| i.is_user_added())
            .cloned()
            .collect();
        let removed = self.context.len() as i64 - reviewed.len() as i64;
        let note = if removed > 0 {
            format!("removed {removed} fetched context")
        } else {
            format!("added {} context", reviewed.len())
        };
        self.status.on_stream("Reviewing context", &note);

        reviewed.extend(selected);
        self.context = reviewed;
    }

    fn build_round_prompt(&self) -> Vec<contextloop_core::chat::Message> {
        let (explicit, implicit): (Vec<ContextItem>, Vec<ContextItem>) = self
            .context
            .iter()
            .cloned()
            .partition(|i| i.is_user_added());
        // Keep the prompt bounded: only the most recent gathered items.
        let start = implicit.len().saturating_sub(self.max_search_items);
        self.prompter
            .make_prompt(&explicit, &implicit[start..], &self.mixins)
    }

    /// Drain one streamed model turn through the multiplexer.
    ///
    /// Fragments arrive as cumulative text; only the unseen suffix is routed.
    /// The turn-complete notification fires on every exit path so tools and
    /// the multiplexer never carry state into the next round.
    async fn process_stream(
        &mut self,
        messages: Vec<contextloop_core::chat::Message>,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let round_cancel = cancel.child_token();
        let options = ChatOptions {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
        };
        let mut rx = self
            .chat
            .chat(messages, options, round_cancel.clone(), request_id)
            .await
            .map_err(Error::Chat)?;

        let mut accumulated = RawTextProcessor::new();
        let mut failure: Option<Error> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    round_cancel.cancel();
                    break;
                }
                event = rx.recv() => match event {
                    None => break,
                    Some(StreamEvent::Change { text }) => {
                        let delta = text.get(accumulated.len()..).unwrap_or("");
                        if delta.is_empty() {
                            continue;
                        }
                        accumulated.append(delta);
                        if let Err(e) = self.multiplexer.publish(delta).await {
                            failure = Some(e);
                            break;
                        }
                    }
                    Some(StreamEvent::Complete) => break,
                    Some(StreamEvent::Error { error }) => {
                        failure = Some(Error::Chat(error));
                        break;
                    }
                },
            }
        }

        if let Err(e) = self.multiplexer.notify_turn_complete().await {
            warn!(error = %e, "Turn-complete notification failed");
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(accumulated.consume_and_clear()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contextloop_core::error::{ChatError, ToolError};
    use contextloop_core::prompt::EmptyTranscript;
    use contextloop_core::tool::NullStatusCallback;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Plays back one scripted event sequence per chat call.
    struct MockChatClient {
        scripts: Mutex<VecDeque<Vec<StreamEvent>>>,
        calls: AtomicUsize,
    }

    impl MockChatClient {
        fn new(scripts: Vec<Vec<StreamEvent>>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
                calls: AtomicUsize::new(0),
            })
        }

        /// Script a round whose response streams in the given cumulative
        /// snapshots and then completes.
        fn round(snapshots: &[&str]) -> Vec<StreamEvent> {
            let mut events: Vec<StreamEvent> = snapshots
                .iter()
                .map(|s| StreamEvent::Change {
                    text: s.to_string(),
                })
                .collect();
            events.push(StreamEvent::Complete);
            events
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatClient for MockChatClient {
        async fn chat(
            &self,
            _messages: Vec<contextloop_core::chat::Message>,
            _options: ChatOptions,
            _cancel: CancellationToken,
            _request_id: &str,
        ) -> std::result::Result<mpsc::Receiver<StreamEvent>, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| vec![StreamEvent::Complete]);
            let (tx, rx) = mpsc::channel(16);
            tokio::spawn(async move {
                for event in script {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            });
            Ok(rx)
        }
    }

    /// Streams into a buffer; `run` yields canned items or a canned failure.
    struct MockTool {
        tag: &'static str,
        items: Vec<ContextItem>,
        fail: bool,
        streamed: Mutex<String>,
        runs: AtomicUsize,
    }

    impl MockTool {
        fn yielding(tag: &'static str, items: Vec<ContextItem>) -> Arc<Self> {
            Arc::new(Self {
                tag,
                items,
                fail: false,
                streamed: Mutex::new(String::new()),
                runs: AtomicUsize::new(0),
            })
        }

        fn failing(tag: &'static str) -> Arc<Self> {
            Arc::new(Self {
                tag,
                items: Vec::new(),
                fail: true,
                streamed: Mutex::new(String::new()),
                runs: AtomicUsize::new(0),
            })
        }

        fn run_count(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContextTool for MockTool {
        fn tag(&self) -> &str {
            self.tag
        }

        fn instruction(&self) -> String {
            format!("Use <{0}></{0}>.", self.tag)
        }

        async fn stream(&self, content: &str) {
            self.streamed.lock().unwrap().push_str(content);
        }

        async fn run(
            &self,
            _status: &dyn ToolStatusCallback,
        ) -> std::result::Result<Vec<ContextItem>, ToolError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ToolError::ExecutionFailed {
                    tag: self.tag.to_string(),
                    reason: "boom".to_string(),
                });
            }
            Ok(self.items.clone())
        }
    }

    /// Records every status callback for assertions.
    #[derive(Default)]
    struct RecordingStatus {
        completes: Mutex<Vec<(String, bool)>>,
    }

    impl ToolStatusCallback for RecordingStatus {
        fn on_start(&self) {}
        fn on_stream(&self, _label: &str, _content: &str) {}
        fn on_complete(&self, label: &str, error: Option<&ToolError>) {
            self.completes
                .lock()
                .unwrap()
                .push((label.to_string(), error.is_some()));
        }
    }

    struct NoFiles;

    #[async_trait]
    impl FileResolver for NoFiles {
        async fn context_from_relative_path(&self, _name: &str) -> Option<ContextItem> {
            None
        }
    }

    fn agent_with(
        chat: Arc<MockChatClient>,
        tools: Vec<Arc<dyn ContextTool>>,
        status: Arc<dyn ToolStatusCallback>,
    ) -> ReviewAgent {
        ReviewAgent::new(
            chat,
            Arc::new(prompts::DefaultPrompter),
            Arc::new(EmptyTranscript),
            Arc::new(NoFiles),
            tools,
            status,
            Arc::new(EventBus::default()),
        )
    }

    fn user_item(name: &str) -> ContextItem {
        ContextItem::new(format!("file:///{name}"), name, ContextItemSource::User)
            .with_content("user content")
    }

    fn tool_item(name: &str) -> ContextItem {
        ContextItem::new(format!("cli://{name}"), name, ContextItemSource::Tool)
            .with_content("tool output")
    }

    #[tokio::test]
    async fn ready_marker_ends_review_with_context_unchanged() {
        let chat = MockChatClient::new(vec![MockChatClient::round(&["<done>"])]);
        let tool = MockTool::yielding("file", vec![tool_item("x")]);
        let mut agent = agent_with(
            chat.clone(),
            vec![tool.clone()],
            Arc::new(NullStatusCallback),
        );

        let initial = vec![user_item("main.rs")];
        let out = agent
            .get_context("req-1", CancellationToken::new(), initial.clone())
            .await;

        assert_eq!(out, initial);
        assert_eq!(agent.stats().loops, 1);
        assert_eq!(chat.call_count(), 1);
        assert_eq!(tool.run_count(), 0);
    }

    #[tokio::test]
    async fn loop_stops_at_round_limit() {
        // Every round asks for more; the bound must cut it off.
        let script = MockChatClient::round(&["<file>a.rs", "<file>a.rs</file>"]);
        let chat = MockChatClient::new(vec![script.clone(), script.clone(), script]);
        let tool = MockTool::yielding("file", vec![tool_item("a.rs")]);
        let mut agent = agent_with(chat.clone(), vec![tool], Arc::new(NullStatusCallback));

        agent
            .get_context("req-2", CancellationToken::new(), Vec::new())
            .await;

        assert_eq!(chat.call_count(), 2);
        assert_eq!(agent.stats().loops, 2);
    }

    #[tokio::test]
    async fn streamed_tag_content_reaches_the_tool() {
        let chat = MockChatClient::new(vec![
            MockChatClient::round(&["<file>a.rs", "<file>a.rs</file>"]),
            MockChatClient::round(&["<done>"]),
        ]);
        let tool = MockTool::yielding("file", vec![]);
        let mut agent = agent_with(chat, vec![tool.clone()], Arc::new(NullStatusCallback));

        agent
            .get_context("req-3", CancellationToken::new(), Vec::new())
            .await;

        assert_eq!(tool.streamed.lock().unwrap().as_str(), "a.rs");
        assert_eq!(tool.run_count(), 1);
    }

    #[tokio::test]
    async fn user_added_context_survives_the_merge() {
        let chat = MockChatClient::new(vec![
            MockChatClient::round(&["<file>a.rs</file>"]),
            MockChatClient::round(&["<done>"]),
        ]);
        let tool = MockTool::yielding("file", vec![tool_item("a.rs")]);
        let mut agent = agent_with(chat, vec![tool], Arc::new(NullStatusCallback));

        let out = agent
            .get_context(
                "req-4",
                CancellationToken::new(),
                vec![user_item("main.rs")],
            )
            .await;

        assert!(out.iter().any(|i| i.title == "main.rs"));
        assert!(out.iter().any(|i| i.title == "a.rs"));
    }

    #[tokio::test]
    async fn failing_tool_is_contained() {
        let chat = MockChatClient::new(vec![
            MockChatClient::round(&["<a>x</a><b>y</b><c>z</c>"]),
            MockChatClient::round(&["<done>"]),
        ]);
        let t1 = MockTool::yielding("a", vec![tool_item("from-a")]);
        let t2 = MockTool::failing("b");
        let t3 = MockTool::yielding("c", vec![tool_item("from-c")]);
        let status = Arc::new(RecordingStatus::default());
        let mut agent = agent_with(
            chat,
            vec![t1, t2.clone(), t3],
            status.clone() as Arc<dyn ToolStatusCallback>,
        );

        let out = agent
            .get_context("req-5", CancellationToken::new(), Vec::new())
            .await;

        assert!(out.iter().any(|i| i.title == "from-a"));
        assert!(out.iter().any(|i| i.title == "from-c"));
        assert_eq!(t2.run_count(), 1);

        let failures: Vec<_> = status
            .completes
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, failed)| *failed)
            .cloned()
            .collect();
        assert_eq!(failures, vec![("b".to_string(), true)]);
    }

    #[tokio::test]
    async fn stream_error_degrades_to_no_new_context() {
        let chat = MockChatClient::new(vec![vec![
            StreamEvent::Change {
                text: "<file>a.rs".to_string(),
            },
            StreamEvent::Error {
                error: ChatError::StreamInterrupted("connection reset".to_string()),
            },
        ]]);
        let tool = MockTool::yielding("file", vec![tool_item("a.rs")]);
        let mut agent = agent_with(chat, vec![tool.clone()], Arc::new(NullStatusCallback));

        let initial = vec![user_item("main.rs")];
        let out = agent
            .get_context("req-6", CancellationToken::new(), initial.clone())
            .await;

        assert_eq!(out, initial);
        assert_eq!(tool.run_count(), 0);
    }

    #[tokio::test]
    async fn pre_cancelled_run_returns_input_unchanged() {
        let chat = MockChatClient::new(vec![]);
        let tool = MockTool::yielding("file", vec![]);
        let mut agent = agent_with(chat.clone(), vec![tool], Arc::new(NullStatusCallback));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let initial = vec![user_item("main.rs")];
        let out = agent.get_context("req-7", cancel, initial.clone()).await;

        assert_eq!(out, initial);
        assert_eq!(chat.call_count(), 0);
        assert_eq!(agent.stats().loops, 0);
    }

    #[tokio::test]
    async fn mid_stream_cancellation_unwinds_cleanly() {
        // A stream that never completes; cancellation must end the run.
        struct HangingChat {
            keepalive: Mutex<Option<mpsc::Sender<StreamEvent>>>,
        }

        #[async_trait]
        impl ChatClient for HangingChat {
            async fn chat(
                &self,
                _messages: Vec<contextloop_core::chat::Message>,
                _options: ChatOptions,
                _cancel: CancellationToken,
                _request_id: &str,
            ) -> std::result::Result<mpsc::Receiver<StreamEvent>, ChatError> {
                let (tx, rx) = mpsc::channel(16);
                tx.send(StreamEvent::Change {
                    text: "<file>a.rs".to_string(),
                })
                .await
                .ok();
                *self.keepalive.lock().unwrap() = Some(tx);
                Ok(rx)
            }
        }

        let chat = Arc::new(HangingChat {
            keepalive: Mutex::new(None),
        });
        let tool = MockTool::yielding("file", vec![]);
        let mut agent = ReviewAgent::new(
            chat,
            Arc::new(prompts::DefaultPrompter),
            Arc::new(EmptyTranscript),
            Arc::new(NoFiles),
            vec![tool],
            Arc::new(NullStatusCallback),
            Arc::new(EventBus::default()),
        );

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        let handle = tokio::spawn(async move {
            agent
                .get_context("req-8", cancel, vec![user_item("main.rs")])
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();

        let out = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("run must end after cancellation")
            .unwrap();
        assert!(out.iter().any(|i| i.title == "main.rs"));
    }

    #[tokio::test]
    async fn kept_context_resolution_drops_unlisted_items() {
        // The model re-lists only a.rs; the previously fetched b.rs is
        // dropped while the user item stays.
        let chat = MockChatClient::new(vec![MockChatClient::round(&[
            "<file>c.rs</file><context>a.rs</context>",
        ])]);
        let tool = MockTool::yielding("file", vec![]);
        let mut agent = agent_with(chat, vec![tool], Arc::new(NullStatusCallback));

        let initial = vec![
            user_item("main.rs"),
            ContextItem::new("file:///a.rs", "a.rs", ContextItemSource::Tool).with_content("a"),
            ContextItem::new("file:///b.rs", "b.rs", ContextItemSource::Tool).with_content("b"),
        ];
        let out = agent
            .get_context("req-9", CancellationToken::new(), initial)
            .await;

        assert!(out.iter().any(|i| i.title == "main.rs"));
        let a = out.iter().find(|i| i.title == "a.rs").unwrap();
        assert_eq!(a.source, ContextItemSource::Agentic);
        assert!(!out.iter().any(|i| i.title == "b.rs"));
    }
}
