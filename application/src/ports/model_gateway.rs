//! Model gateway port
//!
//! Defines the interface for requesting completions from LLM providers.

use async_trait::async_trait;
use ragops_domain::{ConversationTurn, ToolCall, ToolContract};
use thiserror::Error;

/// Errors that can occur during model gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The provider cannot serve requests right now (auth, network, outage).
    #[error("Model unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with something the adapter cannot interpret.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// One model reply: prose text, tool calls, or both.
///
/// A reply with no tool calls is final for the current turn; the agent
/// loop stops iterating when it sees one.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content,
            tool_calls,
        }
    }

    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// Gateway for model completions
///
/// This port defines how the application layer talks to LLM providers.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Request one completion over the full conversation, advertising the
    /// given tool contracts. Tool ordering must be preserved as passed.
    async fn complete(
        &self,
        turns: &[ConversationTurn],
        tools: &[ToolContract],
    ) -> Result<ModelReply, GatewayError>;
}
