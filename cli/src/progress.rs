//! Console progress output for agent runs

use colored::Colorize;
use ragops_application::AgentProgress;
use ragops_domain::{ToolCall, ToolOutcome};
use serde_json::Value;

const ARGUMENT_PREVIEW_CHARS: usize = 80;

/// Prints one line per agent event.
///
/// Model prose goes to stdout (it is the answer the user asked for);
/// everything else goes to stderr so piped output stays clean.
pub struct ConsoleProgress;

impl AgentProgress for ConsoleProgress {
    fn on_model_request(&self, turn: usize) {
        eprintln!("{}", format!("[model call {}]", turn).dimmed());
    }

    fn on_model_content(&self, content: &str) {
        println!("{}", content);
    }

    fn on_tool_call(&self, call: &ToolCall) {
        eprintln!(
            "{} {}{}",
            "tool:".blue().bold(),
            call.name,
            preview_arguments(&call.arguments).dimmed()
        );
    }

    fn on_tool_outcome(&self, outcome: &ToolOutcome) {
        let duration = outcome
            .duration_ms
            .map(|ms| format!(" ({} ms)", ms))
            .unwrap_or_default();
        match &outcome.failure {
            None => {
                eprintln!("  {} {}{}", "ok".green(), outcome.tool_name, duration);
            }
            Some(failure) => {
                eprintln!(
                    "  {} {}{}: {}",
                    "failed".red(),
                    outcome.tool_name,
                    duration,
                    failure
                );
            }
        }
    }

    fn on_compression(&self, replaced_turns: usize) {
        eprintln!(
            "{}",
            format!("[history compressed: {} turns summarized]", replaced_turns).dimmed()
        );
    }
}

/// Compact single-line rendering of a tool's arguments, truncated for display.
fn preview_arguments(arguments: &Value) -> String {
    let rendered = arguments.to_string();
    if rendered == "{}" || rendered == "null" {
        return String::new();
    }
    if rendered.chars().count() > ARGUMENT_PREVIEW_CHARS {
        let cut: String = rendered.chars().take(ARGUMENT_PREVIEW_CHARS).collect();
        format!(" {}...", cut)
    } else {
        format!(" {}", rendered)
    }
}
