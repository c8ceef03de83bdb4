//! ragops-agent CLI entry point
//!
//! Wires the layers together: configuration, model gateway, tool
//! dispatcher (built-ins plus configured MCP servers), then hands off
//! to one-shot execution or the interactive chat loop.

mod args;
mod progress;
mod repl;

use anyhow::{Context, Result, bail};
use args::Cli;
use clap::Parser;
use colored::Colorize;
use progress::ConsoleProgress;
use ragops_application::{RunAgentInput, RunAgentUseCase, ToolDispatcher, TranscriptSink};
use ragops_infrastructure::{
    ConfigLoader, FileConfig, FileServerConfig, JsonlTranscriptLogger, McpToolServer,
    OpenAiGateway, builtin_tools,
};
use repl::AgentRepl;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Instructions the model sees ahead of every conversation.
const SYSTEM_PROMPT: &str = "You are the RagOps agent. You help users build and operate \
    Retrieval-Augmented Generation (RAG) pipelines. Answer in the user's language. Use the \
    available tools to inspect files and directories and to drive any attached pipeline \
    servers; prefer tool output over guessing. When a task needs several steps, run them in \
    order and report what was done.";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging setup: -v for info, -vv for debug, -vvv for trace
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _log_guard = init_logging(filter, cli.log_file.as_deref());

    info!("Starting ragops-agent");

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    // === Configuration ===
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };
    apply_overrides(&mut config, &cli);
    config.validate()?;

    if cli.print_config {
        println!("{}", config.to_toml_string()?);
        return Ok(());
    }

    // Refuse before any server is launched.
    if !cli.chat && cli.prompt.is_none() {
        bail!("No task given. Pass a prompt, or use --chat for interactive mode.");
    }

    // === Dependency Injection ===
    let api_key = std::env::var(&config.model.api_key_env).unwrap_or_default();
    if api_key.is_empty() {
        warn!(
            "Environment variable {} is not set; the endpoint may reject requests",
            config.model.api_key_env
        );
    }
    let gateway = Arc::new(
        OpenAiGateway::new(&config.model.base_url, api_key, &config.model.model)
            .with_system_prompt(SYSTEM_PROMPT),
    );

    let mut dispatcher = ToolDispatcher::new();
    for tool in builtin_tools() {
        dispatcher.register_host_tool(tool)?;
    }
    if !cli.no_servers {
        attach_servers(&mut dispatcher, &config.servers).await;
    }
    let dispatcher = Arc::new(dispatcher);
    let tool_count = dispatcher.tool_count();

    let cancel_token = CancellationToken::new();
    if !cli.chat {
        // First Ctrl+C cancels the run; in-flight tool calls still resolve.
        let token = cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
    }

    let mut use_case = RunAgentUseCase::new(gateway, dispatcher.clone())
        .with_params(config.agent.loop_params())
        .with_cancellation(cancel_token);

    if let Some(path) = &config.logging.transcript_file
        && let Some(logger) = JsonlTranscriptLogger::new(path)
    {
        info!("Writing transcript to {}", logger.path().display());
        use_case = use_case.with_transcript(Arc::new(logger) as Arc<dyn TranscriptSink>);
    }

    // === Mode selection ===
    let outcome = if cli.chat {
        AgentRepl::new(use_case, config.model.model.clone(), tool_count)
            .with_progress(!cli.quiet)
            .run()
            .await
    } else {
        if !cli.quiet {
            eprintln!(
                "{}",
                format!(
                    "ragops-agent | model {} | {} tools",
                    config.model.model, tool_count
                )
                .dimmed()
            );
        }
        run_one_shot(&use_case, cli.prompt.as_deref().unwrap_or_default(), cli.quiet).await
    };

    // Servers get their graceful exit even when the run failed.
    dispatcher.shutdown().await;
    outcome
}

/// Install the tracing subscriber, writing to stderr or to `log_file`.
///
/// The returned guard must stay alive for the whole run; dropping it
/// flushes the background log writer.
fn init_logging(
    filter: EnvFilter,
    log_file: Option<&Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "ragops-agent.log".into());
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(
                    directory, file_name,
                ));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
            None
        }
    }
}

fn apply_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(model) = &cli.model {
        config.model.model = model.clone();
    }
    if let Some(base_url) = &cli.base_url {
        config.model.base_url = base_url.clone();
    }
    if let Some(path) = &cli.transcript {
        config.logging.transcript_file = Some(path.display().to_string());
    }
}

/// Launch and register every configured MCP server.
///
/// A server that fails to start is skipped with a warning; the agent
/// still runs with the remaining tools.
async fn attach_servers(dispatcher: &mut ToolDispatcher, servers: &[FileServerConfig]) {
    for server_config in servers {
        let server = Arc::new(McpToolServer::new(server_config.settings()));
        match dispatcher.attach_server(server).await {
            Ok(count) => {
                info!(
                    "Server '{}' attached with {} tools",
                    server_config.name, count
                );
            }
            Err(e) => {
                warn!("Skipping server '{}': {}", server_config.name, e);
                eprintln!(
                    "{} server '{}' unavailable: {}",
                    "Warning:".yellow().bold(),
                    server_config.name,
                    e
                );
            }
        }
    }
}

async fn run_one_shot(
    use_case: &RunAgentUseCase<OpenAiGateway>,
    prompt: &str,
    quiet: bool,
) -> Result<()> {
    let input = RunAgentInput::new(prompt);
    let result = if quiet {
        use_case.execute(input).await
    } else {
        use_case.execute_with_progress(input, &ConsoleProgress).await
    };

    match result {
        Ok(output) => {
            // With progress on, the reply already went to stdout.
            if quiet {
                println!("{}", output.reply);
            }
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("{}", "Interrupted.".yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
