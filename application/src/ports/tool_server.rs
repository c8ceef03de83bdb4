//! Tool server port
//!
//! Defines the interface for external tool servers: subprocesses that
//! advertise tools at startup and execute calls over a private transport.
//! The dispatcher treats a server as a black box behind this port; spawn,
//! handshake, and session health all live in the infrastructure adapter.

use async_trait::async_trait;
use ragops_domain::{FailureKind, ToolFailure};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during tool server operations
#[derive(Error, Debug)]
pub enum ToolServerError {
    /// The subprocess could not be spawned or did not complete its
    /// handshake within the startup timeout.
    #[error("Server '{server}' failed to start: {reason}")]
    StartupFailed { server: String, reason: String },

    /// A call exceeded its per-call timeout. The server may still answer
    /// later; that late answer is discarded by the adapter.
    #[error("Call to '{tool}' timed out after {timeout_ms}ms")]
    CallTimeout { tool: String, timeout_ms: u64 },

    /// The server session is closed or degraded beyond recovery.
    #[error("Server '{server}' unavailable: {reason}")]
    Unavailable { server: String, reason: String },

    /// The stream to a live server produced something unusable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server executed the tool and reported an application failure.
    #[error("Tool '{tool}' reported failure: {message}")]
    RemoteFailure { tool: String, message: String },
}

impl From<ToolServerError> for ToolFailure {
    fn from(error: ToolServerError) -> Self {
        let kind = match &error {
            ToolServerError::StartupFailed { .. } => FailureKind::StartupFailed,
            ToolServerError::CallTimeout { .. } => FailureKind::Timeout,
            ToolServerError::Unavailable { .. } => FailureKind::ServerUnavailable,
            ToolServerError::Transport(_) => FailureKind::Transport,
            ToolServerError::RemoteFailure { .. } => FailureKind::ExecutionFailed,
        };
        ToolFailure::new(kind, error.to_string())
    }
}

/// A tool advertised by a server, before namespacing.
#[derive(Debug, Clone)]
pub struct RemoteToolInfo {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments, as sent by the server.
    pub input_schema: Value,
}

/// Port for an external tool server
///
/// One instance per configured server. Implementations must deliver
/// exactly one outcome per `invoke`, whatever happens to the subprocess.
#[async_trait]
pub trait ToolServerPort: Send + Sync {
    /// Stable identifier used to namespace this server's tools.
    fn server_id(&self) -> &str;

    /// Starts the server if needed and returns its advertised tools.
    async fn discover(&self) -> Result<Vec<RemoteToolInfo>, ToolServerError>;

    /// Executes one tool call by the server's own (un-namespaced) name.
    async fn invoke(&self, tool: &str, arguments: Value) -> Result<Value, ToolServerError>;

    /// Graceful shutdown; forces termination if the process lingers.
    async fn shutdown(&self);
}
