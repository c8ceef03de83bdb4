//! History compaction service.
//!
//! [`HistoryCompactor`] bridges the pure planning in the domain layer and
//! the model-generated summary text: the domain decides *where* to cut,
//! the gateway writes *what* stands in for the removed turns, and the
//! conversation swaps the two atomically.
//!
//! Compaction runs before each model request. When the history fits the
//! budget it is a no-op and the gateway is never contacted.

use ragops_domain::{CharCost, Conversation, ConversationTurn, plan_compression};
use tracing::{debug, info};

use crate::ports::model_gateway::{GatewayError, ModelGateway};

const SUMMARY_INSTRUCTION: &str = "Summarize the conversation below so it can replace those turns \
in an ongoing session. Preserve user goals, decisions, file paths, tool results, and any facts \
later turns may rely on. Reply with the summary text only.";

/// Compresses a conversation against a character budget.
pub struct HistoryCompactor {
    budget_chars: usize,
    cost: CharCost,
}

impl HistoryCompactor {
    pub fn new(budget_chars: usize) -> Self {
        Self {
            budget_chars,
            cost: CharCost::default(),
        }
    }

    /// Compresses the conversation if it exceeds the budget.
    ///
    /// Returns how many turns were replaced, or `None` when no compression
    /// was needed or possible. On gateway failure the conversation is left
    /// untouched and the error propagates to the caller.
    pub async fn compress_if_needed(
        &self,
        conversation: &mut Conversation,
        gateway: &dyn ModelGateway,
    ) -> Result<Option<usize>, GatewayError> {
        let Some(plan) = plan_compression(conversation.turns(), self.budget_chars, &self.cost)
        else {
            return Ok(None);
        };

        let prefix = &conversation.turns()[..plan.prefix_len()];
        debug!(
            "History over budget ({} chars): summarizing {} turns",
            self.budget_chars,
            prefix.len()
        );

        let request = format!("{}\n\n{}", SUMMARY_INSTRUCTION, render_turns(prefix));
        let reply = gateway
            .complete(&[ConversationTurn::user(request)], &[])
            .await?;
        let summary = match reply.content {
            Some(text) if !text.trim().is_empty() => text,
            _ => "(earlier conversation elided)".to_string(),
        };

        let replaced = plan.prefix_len();
        conversation.apply_compression(&plan, summary);
        info!("Compressed {} turns into a summary", replaced);
        Ok(Some(replaced))
    }
}

/// Renders turns as plain text for the summarization request.
fn render_turns(turns: &[ConversationTurn]) -> String {
    let mut rendered = String::new();
    for turn in turns {
        match turn {
            ConversationTurn::User { content } => {
                rendered.push_str("User: ");
                rendered.push_str(content);
            }
            ConversationTurn::Model {
                content,
                tool_calls,
            } => {
                rendered.push_str("Assistant: ");
                if let Some(text) = content {
                    rendered.push_str(text);
                }
                for call in tool_calls {
                    rendered.push_str(&format!(
                        "\n  [called {} with {}]",
                        call.name, call.arguments
                    ));
                }
            }
            ConversationTurn::ToolResult {
                tool_name,
                content,
                is_error,
                ..
            } => {
                let status = if *is_error { "failed" } else { "returned" };
                rendered.push_str(&format!("Tool {} {}: {}", tool_name, status, content));
            }
            ConversationTurn::Summary { content, .. } => {
                rendered.push_str("Summary of earlier conversation: ");
                rendered.push_str(content);
            }
        }
        rendered.push('\n');
    }
    rendered
}
