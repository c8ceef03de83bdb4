//! Type definitions for the RunAgent use case.

use ragops_domain::{Conversation, HistoryError};
use thiserror::Error;

use crate::ports::model_gateway::GatewayError;

/// Errors that can occur during agent execution.
///
/// Individual tool failures are not errors at this level; they are
/// reported back to the model as failed tool results and the loop goes
/// on. Only conditions that end the run appear here.
#[derive(Error, Debug)]
pub enum RunAgentError {
    /// The model kept requesting tools past the per-input call budget.
    #[error("Turn budget exceeded: {limit} model calls without a final reply")]
    TurnBudgetExceeded { limit: usize },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] GatewayError),

    /// The conversation rejected an append. Indicates a correlation bug
    /// upstream (a result for a call the model never made).
    #[error("History rejected a turn: {0}")]
    History(#[from] HistoryError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RunAgentError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunAgentError::Cancelled)
    }
}

/// Input for the RunAgent use case
#[derive(Debug, Clone)]
pub struct RunAgentInput {
    /// The user's prompt
    pub prompt: String,
}

impl RunAgentInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// Output from the RunAgent use case
#[derive(Debug)]
pub struct RunAgentOutput {
    /// The model's final prose reply
    pub reply: String,
    /// Full conversation, including tool traffic
    pub conversation: Conversation,
}
