//! Run Agent use case
//!
//! Drives the model/tool loop for one user input:
//!
//! ```text
//!            ┌─────────────────────────────────────────┐
//!            ▼                                         │
//!  compress ──► model call ──► tool calls? ──► batch ──┘
//!                                  │          (results append
//!                                  │           in request order)
//!                                  └──none──► final reply
//! ```
//!
//! Each iteration costs one model call against the turn budget. Tool
//! failures are not fatal: they are appended as error results and the
//! model decides how to proceed. Only an exhausted budget, a gateway
//! failure, or cancellation ends the run early.

mod types;

pub use types::{RunAgentError, RunAgentInput, RunAgentOutput};

use std::sync::Arc;

use futures::future;
use serde_json::json;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ragops_domain::{Conversation, ConversationTurn, ToolCall, ToolOutcome};

use crate::config::LoopParams;
use crate::dispatch::ToolDispatcher;
use crate::history::compactor::HistoryCompactor;
use crate::ports::model_gateway::{ModelGateway, ModelReply};
use crate::ports::progress::{AgentProgress, NoAgentProgress};
use crate::ports::transcript::{NoTranscript, TranscriptEvent, TranscriptSink};

/// Use case for running the agent loop
pub struct RunAgentUseCase<G: ModelGateway + 'static> {
    gateway: Arc<G>,
    dispatcher: Arc<ToolDispatcher>,
    params: LoopParams,
    cancellation_token: Option<CancellationToken>,
    transcript: Arc<dyn TranscriptSink>,
}

impl<G: ModelGateway + 'static> RunAgentUseCase<G> {
    pub fn new(gateway: Arc<G>, dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            gateway,
            dispatcher,
            params: LoopParams::default(),
            cancellation_token: None,
            transcript: Arc::new(NoTranscript),
        }
    }

    pub fn with_params(mut self, params: LoopParams) -> Self {
        self.params = params;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Set a sink receiving the structured conversation transcript
    pub fn with_transcript(mut self, transcript: Arc<dyn TranscriptSink>) -> Self {
        self.transcript = transcript;
        self
    }

    /// Run one user input against a fresh conversation
    pub async fn execute(&self, input: RunAgentInput) -> Result<RunAgentOutput, RunAgentError> {
        self.execute_with_progress(input, &NoAgentProgress).await
    }

    /// Run one user input against a fresh conversation, with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: RunAgentInput,
        progress: &dyn AgentProgress,
    ) -> Result<RunAgentOutput, RunAgentError> {
        let mut conversation = Conversation::new();
        let reply = self
            .run_turn_with_progress(&mut conversation, &input.prompt, progress)
            .await?;
        Ok(RunAgentOutput {
            reply,
            conversation,
        })
    }

    /// Run one user input against an existing conversation (REPL sessions)
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        prompt: &str,
    ) -> Result<String, RunAgentError> {
        self.run_turn_with_progress(conversation, prompt, &NoAgentProgress)
            .await
    }

    /// Core loop: append the prompt, then alternate model calls and tool
    /// batches until the model answers without requesting tools.
    pub async fn run_turn_with_progress(
        &self,
        conversation: &mut Conversation,
        prompt: &str,
        progress: &dyn AgentProgress,
    ) -> Result<String, RunAgentError> {
        check_cancelled(&self.cancellation_token)?;
        info!("Agent turn started ({} chars of input)", prompt.len());

        conversation.append(ConversationTurn::user(prompt))?;
        self.transcript
            .record(TranscriptEvent::new("user_prompt", json!({"content": prompt})));

        let compactor = self.params.history_budget_chars.map(HistoryCompactor::new);
        let mut model_calls = 0usize;

        loop {
            check_cancelled(&self.cancellation_token)?;

            if model_calls >= self.params.max_turns {
                warn!(
                    "Turn budget of {} model calls exhausted without a final reply",
                    self.params.max_turns
                );
                return Err(RunAgentError::TurnBudgetExceeded {
                    limit: self.params.max_turns,
                });
            }

            if let Some(compactor) = &compactor
                && let Some(replaced) = compactor
                    .compress_if_needed(conversation, self.gateway.as_ref())
                    .await?
            {
                progress.on_compression(replaced);
                self.transcript.record(TranscriptEvent::new(
                    "compression",
                    json!({"replaced_turns": replaced}),
                ));
            }

            model_calls += 1;
            progress.on_model_request(model_calls);
            let reply = self.complete_with_cancellation(conversation).await?;

            conversation.append(ConversationTurn::model_calls(
                reply.content.clone(),
                reply.tool_calls.clone(),
            ))?;
            self.transcript.record(TranscriptEvent::new(
                "model_reply",
                json!({
                    "content": reply.content,
                    "tool_calls": reply.tool_calls,
                }),
            ));
            if let Some(content) = &reply.content {
                progress.on_model_content(content);
            }

            if reply.is_final() {
                debug!("Final reply after {} model calls", model_calls);
                return Ok(reply.content.unwrap_or_default());
            }

            let outcomes = self.execute_batch(&reply.tool_calls, progress).await?;
            for outcome in outcomes {
                progress.on_tool_outcome(&outcome);
                self.transcript.record(TranscriptEvent::new(
                    "tool_outcome",
                    json!({
                        "call_id": outcome.call_id,
                        "tool": outcome.tool_name,
                        "success": outcome.is_success(),
                        "duration_ms": outcome.duration_ms,
                    }),
                ));
                conversation.append(ConversationTurn::from_outcome(&outcome))?;
            }
        }
    }

    async fn complete_with_cancellation(
        &self,
        conversation: &Conversation,
    ) -> Result<ModelReply, RunAgentError> {
        let tools = self.dispatcher.snapshot();
        let request = self.gateway.complete(conversation.turns(), &tools);
        match &self.cancellation_token {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(RunAgentError::Cancelled),
                    reply = request => Ok(reply?),
                }
            }
            None => Ok(request.await?),
        }
    }

    /// Executes a batch of tool calls, bounded by the concurrency limit.
    ///
    /// Outcomes come back in the order the model requested the calls,
    /// whatever order they completed in.
    async fn execute_batch(
        &self,
        calls: &[ToolCall],
        progress: &dyn AgentProgress,
    ) -> Result<Vec<ToolOutcome>, RunAgentError> {
        let concurrency = self.params.max_concurrent_tool_calls.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        debug!(
            "Executing batch of {} tool calls (concurrency {})",
            calls.len(),
            concurrency
        );

        let batch = future::join_all(calls.iter().map(|call| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                // The semaphore is never closed, so acquire cannot fail
                let _permit = semaphore.acquire().await.ok();
                progress.on_tool_call(call);
                self.dispatcher.dispatch(call).await
            }
        }));

        match &self.cancellation_token {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(RunAgentError::Cancelled),
                    outcomes = batch => Ok(outcomes),
                }
            }
            None => Ok(batch.await),
        }
    }
}

fn check_cancelled(token: &Option<CancellationToken>) -> Result<(), RunAgentError> {
    match token {
        Some(token) if token.is_cancelled() => Err(RunAgentError::Cancelled),
        _ => Ok(()),
    }
}
