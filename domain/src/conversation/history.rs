//! Append-validated conversation history.
//!
//! [`Conversation`] owns the ordered turn list and the set of tool calls
//! still awaiting a result. Appends are checked so the invariant "every
//! tool result answers exactly one call opened by an earlier model turn"
//! cannot be violated, whatever order the agent loop delivers results in.

use std::collections::HashSet;

use thiserror::Error;

use super::compression::CompressionPlan;
use super::turn::ConversationTurn;
use crate::tool::invocation::CallId;

/// Errors raised while appending to a [`Conversation`].
#[derive(Debug, Error, PartialEq)]
pub enum HistoryError {
    /// A tool result arrived for a call id that is not pending: either it
    /// was never opened by a model turn, or it was already answered.
    #[error("orphan tool result: call '{call_id}' for tool '{tool_name}' has no pending call")]
    OrphanResult { call_id: CallId, tool_name: String },
}

/// Ordered conversation history with causal bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
    /// Call ids opened by model turns and not yet answered.
    pending_calls: HashSet<CallId>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn, updating the pending-call set.
    ///
    /// Model turns open their call ids; tool-result turns must close one,
    /// otherwise the append is rejected and the history is unchanged.
    pub fn append(&mut self, turn: ConversationTurn) -> Result<(), HistoryError> {
        if let ConversationTurn::ToolResult {
            call_id, tool_name, ..
        } = &turn
            && !self.pending_calls.remove(call_id)
        {
            return Err(HistoryError::OrphanResult {
                call_id: call_id.clone(),
                tool_name: tool_name.clone(),
            });
        }
        for call in turn.opened_calls() {
            self.pending_calls.insert(call.id.clone());
        }
        self.turns.push(turn);
        Ok(())
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Whether any opened tool call is still awaiting its result.
    pub fn has_open_calls(&self) -> bool {
        !self.pending_calls.is_empty()
    }

    pub fn open_call_count(&self) -> usize {
        self.pending_calls.len()
    }

    /// Replaces the planned prefix with a single summary turn.
    ///
    /// The new history is assembled in full before the swap, so the
    /// conversation is never observable in a half-compressed state. The
    /// pending-call set is rebuilt from the retained turns.
    pub fn apply_compression(&mut self, plan: &CompressionPlan, summary: impl Into<String>) {
        let prefix_len = plan.prefix_len().min(self.turns.len());
        if prefix_len == 0 {
            return;
        }

        let mut compressed = Vec::with_capacity(self.turns.len() - prefix_len + 1);
        compressed.push(ConversationTurn::summary(summary, prefix_len));
        compressed.extend(self.turns[prefix_len..].iter().cloned());

        let mut pending = HashSet::new();
        for turn in &compressed {
            for call in turn.opened_calls() {
                pending.insert(call.id.clone());
            }
            if let Some(call_id) = turn.closes_call() {
                pending.remove(call_id);
            }
        }

        self.turns = compressed;
        self.pending_calls = pending;
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.pending_calls.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::compression::{CharCost, plan_compression};
    use crate::tool::invocation::ToolCall;
    use serde_json::json;

    fn result_turn(call_id: &str, tool_name: &str) -> ConversationTurn {
        ConversationTurn::ToolResult {
            call_id: CallId::new(call_id),
            tool_name: tool_name.to_string(),
            content: "ok".to_string(),
            is_error: false,
        }
    }

    #[test]
    fn test_append_tracks_pending_calls() {
        let mut conversation = Conversation::new();
        conversation.append(ConversationTurn::user("go")).unwrap();
        conversation
            .append(ConversationTurn::model_calls(
                None,
                vec![
                    ToolCall::new("c1", "time_now", json!({})),
                    ToolCall::new("c2", "read_file", json!({"path": "a.txt"})),
                ],
            ))
            .unwrap();
        assert_eq!(conversation.open_call_count(), 2);

        conversation.append(result_turn("c1", "time_now")).unwrap();
        assert_eq!(conversation.open_call_count(), 1);

        conversation.append(result_turn("c2", "read_file")).unwrap();
        assert!(!conversation.has_open_calls());
        assert_eq!(conversation.len(), 4);
    }

    #[test]
    fn test_orphan_result_rejected() {
        let mut conversation = Conversation::new();
        conversation.append(ConversationTurn::user("go")).unwrap();

        let err = conversation
            .append(result_turn("ghost", "time_now"))
            .unwrap_err();
        assert_eq!(
            err,
            HistoryError::OrphanResult {
                call_id: CallId::new("ghost"),
                tool_name: "time_now".to_string(),
            }
        );
        // Rejected append leaves the history untouched
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn test_duplicate_result_rejected() {
        let mut conversation = Conversation::new();
        conversation
            .append(ConversationTurn::model_calls(
                None,
                vec![ToolCall::new("c1", "search", json!({"query": "x"}))],
            ))
            .unwrap();

        conversation.append(result_turn("c1", "search")).unwrap();
        // Second answer for the same call id is an orphan
        assert!(conversation.append(result_turn("c1", "search")).is_err());
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn test_apply_compression_swaps_prefix_for_summary() {
        let mut conversation = Conversation::new();
        conversation
            .append(ConversationTurn::user("first question"))
            .unwrap();
        conversation
            .append(ConversationTurn::model_text("first answer"))
            .unwrap();
        conversation
            .append(ConversationTurn::user("second question"))
            .unwrap();

        let plan = CompressionPlan::new(2);
        conversation.apply_compression(&plan, "we discussed the first question");

        assert_eq!(conversation.len(), 2);
        match &conversation.turns()[0] {
            ConversationTurn::Summary {
                content,
                replaced_turns,
            } => {
                assert_eq!(content, "we discussed the first question");
                assert_eq!(*replaced_turns, 2);
            }
            other => panic!("expected summary, got {other:?}"),
        }
        assert_eq!(
            conversation.turns()[1],
            ConversationTurn::user("second question")
        );
    }

    #[test]
    fn test_compression_rebuilds_pending_set() {
        let mut conversation = Conversation::new();
        conversation.append(ConversationTurn::user("go")).unwrap();
        conversation
            .append(ConversationTurn::model_calls(
                None,
                vec![ToolCall::new("c1", "search", json!({}))],
            ))
            .unwrap();
        conversation.append(result_turn("c1", "search")).unwrap();
        conversation
            .append(ConversationTurn::user("and now?"))
            .unwrap();
        conversation
            .append(ConversationTurn::model_calls(
                None,
                vec![ToolCall::new("c2", "search", json!({}))],
            ))
            .unwrap();

        // Compress away the first completed exchange; c2 stays open
        conversation.apply_compression(&CompressionPlan::new(3), "searched once already");
        assert_eq!(conversation.open_call_count(), 1);

        conversation.append(result_turn("c2", "search")).unwrap();
        assert!(!conversation.has_open_calls());
        // The already-answered c1 stays answered after the swap
        assert!(conversation.append(result_turn("c1", "search")).is_err());
    }

    #[test]
    fn test_compression_plan_from_real_history() {
        let mut conversation = Conversation::new();
        conversation
            .append(ConversationTurn::user("x".repeat(200)))
            .unwrap();
        conversation
            .append(ConversationTurn::model_text("y".repeat(200)))
            .unwrap();
        conversation
            .append(ConversationTurn::user("latest"))
            .unwrap();

        let plan = plan_compression(conversation.turns(), 300, &CharCost::default())
            .expect("history over budget should yield a plan");
        conversation.apply_compression(&plan, "short digest");

        // Most recent user turn always survives
        assert!(
            conversation
                .turns()
                .iter()
                .any(|t| matches!(t, ConversationTurn::User { content } if content == "latest"))
        );
    }
}
