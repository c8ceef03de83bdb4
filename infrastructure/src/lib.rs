//! Infrastructure layer for ragops-agent
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the MCP subprocess transport, the
//! OpenAI-compatible model gateway, built-in host tools, the JSONL
//! transcript logger, and configuration file loading.

pub mod config;
pub mod llm;
pub mod logging;
pub mod mcp;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileAgentConfig, FileConfig, FileLoggingConfig,
    FileModelConfig, FileServerConfig,
};
pub use llm::OpenAiGateway;
pub use logging::JsonlTranscriptLogger;
pub use mcp::{
    error::{McpError, Result},
    server::{McpServerSettings, McpToolServer},
};
pub use tools::builtin_tools;
