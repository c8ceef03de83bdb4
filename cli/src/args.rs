//! Command-line argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ragops-agent",
    author,
    version,
    about = "LLM agent that runs RAG pipeline operations through local and MCP tools",
    long_about = "An agentic CLI that sends your task to a chat-completion model and executes \
                  the tool calls it requests. Tools come from a built-in set (files, search, \
                  clock) and from MCP servers configured in ragops.toml."
)]
pub struct Cli {
    /// The task to run (omit it and pass --chat for interactive mode)
    pub prompt: Option<String>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Model name (overrides config)
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Base URL of the chat-completion endpoint (overrides config)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Do not launch configured MCP servers
    #[arg(long)]
    pub no_servers: bool,

    /// Write a JSONL transcript of the run (overrides config)
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,

    /// Write diagnostic logs to a file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output, print only the final reply
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to a configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Skip loading configuration files (defaults and env vars only)
    #[arg(long)]
    pub no_config: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
