//! Conversation history: turns, causal bookkeeping, and compression.
//!
//! The conversation is the single source of truth for a session. Every
//! model request is rendered from it, so its invariants are enforced at
//! the append site rather than trusted to callers:
//!
//! ```text
//! User ──► Model(tool_calls) ──► ToolResult* ──► Model(text) ──► ...
//!               │                    ▲
//!               └── opens call ids ──┘  (every result must close one)
//! ```
//!
//! # Submodules
//!
//! - [`turn`]: the [`ConversationTurn`] variants that make up a history
//! - [`history`]: [`Conversation`], append validation, atomic compression swap
//! - [`compression`]: pure boundary planning under a size budget
//!
//! # Invariants
//!
//! - A tool-result turn must answer a tool call opened by an earlier model
//!   turn in the same history (no orphans, no duplicates).
//! - Compression never removes the most recent user turn and never
//!   separates a model turn from its tool results.

pub mod compression;
pub mod history;
pub mod turn;

pub use compression::{CharCost, CompressionPlan, TurnCost, plan_compression};
pub use history::{Conversation, HistoryError};
pub use turn::ConversationTurn;
