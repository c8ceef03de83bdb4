//! Agent execution progress port.
//!
//! [`AgentProgress`] is an **output port** that the presentation layer
//! implements to display real-time agent execution progress to the user.
//! All callback argument types come from the domain layer.
//!
//! All methods have default no-op implementations, so implementers only
//! need to override the callbacks they care about.

use ragops_domain::{ToolCall, ToolOutcome};

/// Progress notifier for agent execution.
pub trait AgentProgress: Send + Sync {
    /// Called when a model request is about to be sent.
    fn on_model_request(&self, _turn: usize) {}

    /// Called when the model replies with prose content.
    fn on_model_content(&self, _content: &str) {}

    /// Called when a tool call begins execution.
    fn on_tool_call(&self, _call: &ToolCall) {}

    /// Called when a tool call finishes (success or failure).
    fn on_tool_outcome(&self, _outcome: &ToolOutcome) {}

    /// Called after the history was compressed before a model request.
    fn on_compression(&self, _replaced_turns: usize) {}
}

/// No-op implementation for when progress isn't needed
pub struct NoAgentProgress;

impl AgentProgress for NoAgentProgress {}
