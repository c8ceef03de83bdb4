//! Application layer for ragops-agent
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod dispatch;
pub mod history;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::LoopParams;
pub use dispatch::{ToolDispatcher, ToolSetupError};
pub use history::compactor::HistoryCompactor;
pub use ports::{
    host_tool::{HostTool, HostToolError},
    model_gateway::{GatewayError, ModelGateway, ModelReply},
    progress::{AgentProgress, NoAgentProgress},
    tool_server::{RemoteToolInfo, ToolServerError, ToolServerPort},
    transcript::{NoTranscript, TranscriptEvent, TranscriptSink},
};
pub use use_cases::run_agent::{RunAgentError, RunAgentInput, RunAgentOutput, RunAgentUseCase};
