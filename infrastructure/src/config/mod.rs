//! Configuration loading and file formats
//!
//! A full config file:
//!
//! ```toml
//! [model]
//! model = "gpt-4o-mini"
//! base_url = "https://api.openai.com/v1"
//! api_key_env = "RAGOPS_OPENAI_API_KEY"
//!
//! [agent]
//! max_turns = 50
//! max_concurrent_tool_calls = 4
//! history_budget_chars = 120000
//!
//! [logging]
//! transcript_file = "ragops.transcript.jsonl"
//!
//! # One block per MCP server to launch, e.g. the RagOps pipeline servers:
//! [[servers]]
//! name = "planner"
//! command = "ragops-rag-planner"
//!
//! [[servers]]
//! name = "reader"
//! command = "ragops-read-engine"
//! startup_timeout_secs = 30
//! ```
//!
//! No server is launched unless configured here.

pub mod file_config;
pub mod loader;

pub use file_config::{
    ConfigValidationError, FileAgentConfig, FileConfig, FileLoggingConfig, FileModelConfig,
    FileServerConfig,
};
pub use loader::ConfigLoader;
