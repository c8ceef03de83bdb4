//! Error types for the MCP transport

use thiserror::Error;

/// Result type alias for MCP transport operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors that can occur when communicating with an MCP server process
#[derive(Error, Debug)]
pub enum McpError {
    #[error("I/O failure on server channel: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to parse server message: {error}\nRaw message: {raw}")]
    Parse { error: String, raw: String },

    #[error("JSON-RPC error (code {code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Transport degraded: {0}")]
    Degraded(String),

    #[error("Transport closed")]
    Closed,
}
