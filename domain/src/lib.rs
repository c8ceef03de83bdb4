//! Domain layer for ragops-agent
//!
//! This crate contains the core orchestration types and logic: tool
//! contracts and their registry, tool invocations and outcomes, and the
//! conversation history with its compression rules. It has no dependencies
//! on infrastructure or runtime concerns.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! Every capability the agent can invoke is described by a [`ToolContract`]:
//! a name, a description, a parameter schema, and a [`ToolSource`] telling
//! the dispatcher whether the tool runs in-process or on a remote tool
//! server. Remote tools are namespaced with their server id so contracts
//! from different sources never collide.
//!
//! ## Conversation
//!
//! A [`Conversation`] is an append-only sequence of [`ConversationTurn`]s.
//! Tool-result turns must answer a live tool call (causal validity), and a
//! prefix of old turns can be swapped for a single summary turn without
//! ever leaving a dangling call reference.

pub mod conversation;
pub mod tool;

// Re-export commonly used types
pub use conversation::{
    compression::{CharCost, CompressionPlan, TurnCost, plan_compression},
    history::{Conversation, HistoryError},
    turn::ConversationTurn,
};
pub use tool::{
    contract::{ToolContract, ToolSource, namespaced},
    invocation::{CallId, FailureKind, ToolCall, ToolFailure, ToolOutcome},
    registry::{RegistryError, ToolRegistry},
    schema::{ParameterField, ParameterSchema},
};
