//! Interactive chat loop
//!
//! Reads prompts from stdin line by line and feeds them into one
//! long-lived [`Conversation`], so follow-up questions see the
//! history (and trigger compression on long sessions).

use crate::progress::ConsoleProgress;
use colored::Colorize;
use ragops_application::RunAgentUseCase;
use ragops_domain::Conversation;
use ragops_infrastructure::OpenAiGateway;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub struct AgentRepl {
    use_case: RunAgentUseCase<OpenAiGateway>,
    model: String,
    tool_count: usize,
    show_progress: bool,
}

impl AgentRepl {
    pub fn new(use_case: RunAgentUseCase<OpenAiGateway>, model: String, tool_count: usize) -> Self {
        Self {
            use_case,
            model,
            tool_count,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run the chat loop until `:quit`, EOF or Ctrl+C.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.print_welcome();

        let mut conversation = Conversation::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("{} ", ">>>".cyan().bold());
            std::io::stdout().flush()?;

            let line = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    println!("Bye!");
                    break;
                }
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                // EOF on stdin
                println!();
                println!("Bye!");
                break;
            };
            let input = line.trim();

            if input.is_empty() {
                continue;
            }

            if input.starts_with(':') || matches!(input, "exit" | "quit") {
                if self.handle_command(input, &mut conversation) {
                    break;
                }
                continue;
            }

            self.process_prompt(&mut conversation, input).await;
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│          ragops-agent - Chat Mode           │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!("Model: {}", self.model.cyan());
        println!("Tools: {} available", self.tool_count);
        println!();
        println!("Commands:");
        println!("  :help  - Show available commands");
        println!("  :clear - Start a fresh conversation");
        println!("  :quit  - Exit chat");
        println!();
    }

    /// Handle a REPL command. Returns `true` when the loop should exit.
    fn handle_command(&self, command: &str, conversation: &mut Conversation) -> bool {
        match command {
            ":q" | ":quit" | ":exit" | "exit" | "quit" => {
                println!("Bye!");
                true
            }
            ":help" => {
                println!();
                println!("Commands:");
                println!("  :help          - Show this help");
                println!("  :clear         - Start a fresh conversation");
                println!("  :q or :quit    - Exit chat");
                println!();
                false
            }
            ":clear" => {
                *conversation = Conversation::new();
                println!("Conversation cleared.");
                false
            }
            _ => {
                println!("Unknown command: {}", command);
                println!("Type :help for available commands");
                false
            }
        }
    }

    async fn process_prompt(&self, conversation: &mut Conversation, prompt: &str) {
        println!();
        let result = if self.show_progress {
            self.use_case
                .run_turn_with_progress(conversation, prompt, &ConsoleProgress)
                .await
        } else {
            self.use_case.run_turn(conversation, prompt).await
        };

        match result {
            Ok(reply) => {
                // With progress on, the reply was already streamed to stdout.
                if !self.show_progress {
                    println!("{}", reply);
                }
            }
            Err(e) if e.is_cancelled() => {
                println!("{}", "Interrupted.".yellow());
            }
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
            }
        }
        println!();
    }
}
