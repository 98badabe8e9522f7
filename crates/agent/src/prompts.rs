//! Review-round prompt assembly.

use contextloop_core::context::ContextItem;
use contextloop_core::prompt::{PromptMixin, Prompter};
use contextloop_core::text::RawTextProcessor;
use contextloop_core::tool::ContextTool;
use std::sync::Arc;

/// Well-known tags in the review protocol.
pub mod tags {
    /// Wraps locators of context the model wants kept for the final answer.
    pub const CONTEXT: &str = "context";
    /// Emitted alone when the model has enough context to answer.
    pub const ANSWER: &str = "done";
}

/// Title marking a pseudo-item that carries tool output back into the next
/// round's prompt without counting as real context.
pub const TOOL_CONTEXT_TITLE: &str = "toolcontext";

/// The literal the model must emit, as a whole response, to end the review.
pub fn answer_marker() -> String {
    format!("<{}>", tags::ANSWER)
}

/// True when a full response consists of exactly the answer marker.
pub fn is_ready_to_answer(text: &str) -> bool {
    text == answer_marker()
}

const REVIEW_PROMPT: &str = "\
Review the shared context and decide whether it is enough to answer the \
user's request. You may use the following actions to gather more:
{tool_instructions}
To keep a shared context item for the final answer, enclose its name in \
<context></context> tags, one per line. Items you do not re-list are dropped.
If the context is already sufficient, respond with exactly {answer_marker} \
and nothing else.";

/// Build the review instruction mixin from the registered tools.
pub fn build_review_mixin(tools: &[Arc<dyn ContextTool>]) -> PromptMixin {
    let instructions: Vec<String> = tools.iter().map(|t| t.instruction()).collect();
    let joined = if instructions.is_empty() {
        "(no retrieval actions available)".to_string()
    } else {
        format!("- {}", RawTextProcessor::join(&instructions, "\n- "))
    };
    PromptMixin::new(
        REVIEW_PROMPT
            .replace("{tool_instructions}", &joined)
            .replace("{answer_marker}", &answer_marker()),
    )
}

/// Default prompt assembly: mixins become the system message, context items
/// are listed in the human message with user-added items first.
#[derive(Default)]
pub struct DefaultPrompter;

impl Prompter for DefaultPrompter {
    fn make_prompt(
        &self,
        explicit: &[ContextItem],
        implicit: &[ContextItem],
        mixins: &[PromptMixin],
    ) -> Vec<contextloop_core::chat::Message> {
        use contextloop_core::chat::Message;

        let mut messages = Vec::with_capacity(2);
        if !mixins.is_empty() {
            let texts: Vec<String> = mixins.iter().map(|m| m.text().to_string()).collect();
            messages.push(Message::system(RawTextProcessor::join_lines(&texts)));
        }

        let mut body = String::from("Shared context:\n");
        for item in explicit.iter().chain(implicit) {
            body.push_str(&render_item(item));
        }
        if explicit.is_empty() && implicit.is_empty() {
            body.push_str("(none)\n");
        }
        messages.push(Message::human(body));
        messages
    }
}

fn render_item(item: &ContextItem) -> String {
    match &item.content {
        Some(content) => format!("<item name=\"{}\">\n{}\n</item>\n", item.title, content),
        None => format!("<item name=\"{}\" (content not loaded)/>\n", item.title),
    }
}
