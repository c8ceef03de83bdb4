//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly; `validate` catches the mistakes TOML
//! cannot (empty names, zero timeouts, duplicate servers).

use crate::mcp::McpServerSettings;
use ragops_application::LoopParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("server name cannot be empty")]
    EmptyServerName,

    #[error("server '{name}' has an invalid name; use only letters, digits, '_' and '-'")]
    InvalidServerName { name: String },

    #[error("server '{0}' is configured more than once")]
    DuplicateServerName(String),

    #[error("server '{name}' has no launch command")]
    EmptyServerCommand { name: String },

    #[error("server '{name}' has a zero timeout")]
    InvalidTimeout { name: String },

    #[error("agent.max_turns cannot be 0")]
    InvalidMaxTurns,
}

/// Raw model endpoint configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelConfig {
    /// Model name passed through to the provider
    pub model: String,
    /// Base URL of an OpenAI-compatible endpoint
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for FileModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "RAGOPS_OPENAI_API_KEY".to_string(),
        }
    }
}

/// Raw agent loop configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    /// Maximum model calls per user input
    pub max_turns: usize,
    /// Maximum tool calls executed concurrently within one batch
    pub max_concurrent_tool_calls: usize,
    /// Character budget before history compression; 0 disables it
    pub history_budget_chars: usize,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 50,
            max_concurrent_tool_calls: 4,
            history_budget_chars: 120_000,
        }
    }
}

impl FileAgentConfig {
    /// Map onto the application layer's loop parameters.
    pub fn loop_params(&self) -> LoopParams {
        let budget = (self.history_budget_chars > 0).then_some(self.history_budget_chars);
        LoopParams::default()
            .with_max_turns(self.max_turns)
            .with_max_concurrent_tool_calls(self.max_concurrent_tool_calls)
            .with_history_budget_chars(budget)
    }
}

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL transcript destination; unset disables transcript logging
    pub transcript_file: Option<String>,
}

fn default_startup_timeout_secs() -> u64 {
    15
}

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_max_in_flight() -> usize {
    4
}

/// One `[[servers]]` entry: an MCP server to launch and attach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileServerConfig {
    /// Server name; becomes the namespace prefix for its tools
    pub name: String,
    /// Command to start the server
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl FileServerConfig {
    /// Map onto the MCP adapter's launch settings.
    pub fn settings(&self) -> McpServerSettings {
        McpServerSettings::new(&self.name, &self.command)
            .with_args(self.args.clone())
            .with_startup_timeout(Duration::from_secs(self.startup_timeout_secs))
            .with_call_timeout(Duration::from_secs(self.call_timeout_secs))
            .with_max_in_flight(self.max_in_flight)
    }
}

/// Complete raw configuration from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub model: FileModelConfig,
    pub agent: FileAgentConfig,
    pub logging: FileLoggingConfig,
    pub servers: Vec<FileServerConfig>,
}

impl FileConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.agent.max_turns == 0 {
            return Err(ConfigValidationError::InvalidMaxTurns);
        }

        let mut seen = std::collections::HashSet::new();
        for server in &self.servers {
            if server.name.is_empty() {
                return Err(ConfigValidationError::EmptyServerName);
            }
            // Tool names are namespaced as "<server>__<tool>"; model
            // providers only accept [A-Za-z0-9_-] there.
            if !server
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(ConfigValidationError::InvalidServerName {
                    name: server.name.clone(),
                });
            }
            if server.command.is_empty() {
                return Err(ConfigValidationError::EmptyServerCommand {
                    name: server.name.clone(),
                });
            }
            if server.startup_timeout_secs == 0 || server.call_timeout_secs == 0 {
                return Err(ConfigValidationError::InvalidTimeout {
                    name: server.name.clone(),
                });
            }
            if !seen.insert(server.name.as_str()) {
                return Err(ConfigValidationError::DuplicateServerName(
                    server.name.clone(),
                ));
            }
        }
        Ok(())
    }

    /// Render the effective configuration back as TOML (for --print-config).
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
