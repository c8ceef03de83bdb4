//! Tool domain module
//!
//! Defines how the agent describes, registers, and accounts for every
//! capability it can invoke, in-process host functions and remote
//! server-exposed tools alike, behind one contract shape.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolRegistry │───▶│ ToolCall     │───▶│ ToolOutcome  │
//! │ (contracts)  │    │ (invocation) │    │ (result)     │
//! └──────┬───────┘    └──────────────┘    └──────────────┘
//!        │
//!        ├─ "read_file"          → ToolSource::InProcess
//!        └─ "planner__make_plan" → ToolSource::Remote { server: "planner" }
//! ```
//!
//! # Key Types
//!
//! - [`ToolContract`]: immutable description of one tool (name, params, source)
//! - [`ToolRegistry`]: name → contract map with a deterministic snapshot
//! - [`ParameterSchema`]: JSON-schema-like argument contract + validation
//! - [`ToolCall`] / [`ToolOutcome`]: an invocation request and its single outcome
//! - [`ToolFailure`]: structured failure (kind + message + detail)
//!
//! The registry holds no invocation logic. Routing a call to its handler or
//! server session is the application layer's job; this module only answers
//! "what tools exist and what arguments do they accept".

pub mod contract;
pub mod invocation;
pub mod registry;
pub mod schema;

pub use contract::{ToolContract, ToolSource, namespaced};
pub use invocation::{CallId, FailureKind, ToolCall, ToolFailure, ToolOutcome};
pub use registry::{RegistryError, ToolRegistry};
pub use schema::{ParameterField, ParameterSchema};
