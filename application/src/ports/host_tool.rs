//! Host tool port
//!
//! Defines the interface for tools that run inside the agent process.
//! Handlers are synchronous: host tools are quick local operations
//! (clock reads, file access). A fault is reported through the `Result`;
//! the dispatcher maps it to a structured execution failure.

use ragops_domain::ParameterSchema;
use serde_json::Value;
use thiserror::Error;

/// Failure reported by a host tool handler.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct HostToolError(String);

impl HostToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<std::io::Error> for HostToolError {
    fn from(error: std::io::Error) -> Self {
        Self(error.to_string())
    }
}

/// Port for a tool executed in-process
pub trait HostTool: Send + Sync {
    /// Exposed (registry) name.
    fn name(&self) -> &str;

    /// One-line description shown to the model.
    fn description(&self) -> &str;

    /// Argument schema used for validation and advertisement.
    fn parameters(&self) -> ParameterSchema;

    /// Executes the tool with already-validated arguments.
    fn call(&self, arguments: &Value) -> Result<Value, HostToolError>;
}
