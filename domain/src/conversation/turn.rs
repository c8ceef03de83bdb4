//! The turn variants a conversation is built from.

use serde::{Deserialize, Serialize};

use crate::tool::invocation::{CallId, ToolCall, ToolOutcome};

/// One entry in a conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ConversationTurn {
    /// Input from the human operator.
    User { content: String },
    /// Model output: prose, tool calls, or both.
    Model {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// Outcome of one tool call, correlated by id.
    ToolResult {
        call_id: CallId,
        tool_name: String,
        content: String,
        is_error: bool,
    },
    /// Model-generated digest standing in for a compressed prefix.
    Summary {
        content: String,
        /// How many turns this summary replaced.
        replaced_turns: usize,
    },
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Model turn carrying prose only.
    pub fn model_text(content: impl Into<String>) -> Self {
        Self::Model {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Model turn requesting tool calls, with optional accompanying prose.
    pub fn model_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Model {
            content,
            tool_calls,
        }
    }

    /// Tool-result turn rendered from a dispatch outcome.
    pub fn from_outcome(outcome: &ToolOutcome) -> Self {
        Self::ToolResult {
            call_id: outcome.call_id.clone(),
            tool_name: outcome.tool_name.clone(),
            content: outcome.render_content(),
            is_error: !outcome.is_success(),
        }
    }

    pub fn summary(content: impl Into<String>, replaced_turns: usize) -> Self {
        Self::Summary {
            content: content.into(),
            replaced_turns,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    /// Tool calls opened by this turn (empty for non-model turns).
    pub fn opened_calls(&self) -> &[ToolCall] {
        match self {
            Self::Model { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// The call id this turn closes, if it is a tool result.
    pub fn closes_call(&self) -> Option<&CallId> {
        match self {
            Self::ToolResult { call_id, .. } => Some(call_id),
            _ => None,
        }
    }
}
