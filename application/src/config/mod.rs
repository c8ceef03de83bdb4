//! Application configuration: loop control parameters.
//!
//! [`LoopParams`] groups the static parameters that control the agent
//! loop in [`RunAgentUseCase`](crate::use_cases::run_agent::RunAgentUseCase).
//! These are application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};

/// Agent loop control parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopParams {
    /// Maximum model calls per user input before the run is aborted.
    pub max_turns: usize,
    /// Maximum tool calls executed concurrently within one batch.
    pub max_concurrent_tool_calls: usize,
    /// Character budget for the history; `None` disables compression.
    pub history_budget_chars: Option<usize>,
}

impl Default for LoopParams {
    fn default() -> Self {
        Self {
            max_turns: 50,
            max_concurrent_tool_calls: 4,
            history_budget_chars: None,
        }
    }
}

impl LoopParams {
    // ==================== Builder Methods ====================

    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    pub fn with_max_concurrent_tool_calls(mut self, max: usize) -> Self {
        self.max_concurrent_tool_calls = max;
        self
    }

    pub fn with_history_budget_chars(mut self, budget: Option<usize>) -> Self {
        self.history_budget_chars = budget;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = LoopParams::default();
        assert_eq!(params.max_turns, 50);
        assert_eq!(params.max_concurrent_tool_calls, 4);
        assert!(params.history_budget_chars.is_none());
    }

    #[test]
    fn test_builder() {
        let params = LoopParams::default()
            .with_max_turns(10)
            .with_max_concurrent_tool_calls(1)
            .with_history_budget_chars(Some(50_000));

        assert_eq!(params.max_turns, 10);
        assert_eq!(params.max_concurrent_tool_calls, 1);
        assert_eq!(params.history_budget_chars, Some(50_000));
    }
}
