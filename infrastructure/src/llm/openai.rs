//! OpenAI-compatible chat completions gateway.
//!
//! Works against any endpoint speaking the `/chat/completions` dialect
//! (OpenAI, Azure OpenAI, vLLM, llama.cpp server). Conversation turns map
//! onto wire messages one-to-one, behind an optional leading system
//! message; tool contracts are advertised as function declarations with
//! `tool_choice: auto`.

use async_trait::async_trait;
use ragops_application::{GatewayError, ModelGateway, ModelReply};
use ragops_domain::{ConversationTurn, ToolCall, ToolContract};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

/// Wall-clock limit for one completion request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Cap on error body text quoted back in failures.
const MAX_ERROR_BODY: usize = 600;

pub struct OpenAiGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: Option<String>,
}

impl OpenAiGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: None,
        }
    }

    /// Instructions sent as the leading `system` message of every request.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    async fn complete(
        &self,
        turns: &[ConversationTurn],
        tools: &[ToolContract],
    ) -> Result<ModelReply, GatewayError> {
        let body = build_request_body(&self.model, self.system_prompt.as_deref(), turns, tools);
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            "Requesting completion from {} ({} messages, {} tools)",
            url,
            turns.len(),
            tools.len()
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(GatewayError::Unavailable(format!(
                "HTTP {} from model endpoint: {}",
                status.as_u16(),
                detail
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(format!("undecodable completion: {}", e)))?;

        into_reply(parsed)
    }
}

// ==================== Request building ====================

fn build_request_body(
    model: &str,
    system: Option<&str>,
    turns: &[ConversationTurn],
    tools: &[ToolContract],
) -> Value {
    let mut messages: Vec<Value> = Vec::with_capacity(turns.len() + 1);
    if let Some(system) = system {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.extend(turns.iter().map(turn_to_message));

    let mut body = json!({
        "model": model,
        "messages": messages,
    });

    if !tools.is_empty() {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters.as_value(),
                    },
                })
            })
            .collect();
        body["tools"] = Value::Array(declarations);
        body["tool_choice"] = json!("auto");
    }

    body
}

fn turn_to_message(turn: &ConversationTurn) -> Value {
    match turn {
        ConversationTurn::User { content } => json!({"role": "user", "content": content}),
        ConversationTurn::Model {
            content,
            tool_calls,
        } => {
            let mut message = json!({"role": "assistant", "content": content});
            if !tool_calls.is_empty() {
                let calls: Vec<Value> = tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id.as_str(),
                            "type": "function",
                            "function": {
                                "name": call.name,
                                // The wire format wants arguments as a JSON string.
                                "arguments": call.arguments.to_string(),
                            },
                        })
                    })
                    .collect();
                message["tool_calls"] = Value::Array(calls);
            }
            message
        }
        ConversationTurn::ToolResult {
            call_id, content, ..
        } => json!({
            "role": "tool",
            "tool_call_id": call_id.as_str(),
            "content": content,
        }),
        ConversationTurn::Summary { content, .. } => json!({
            "role": "user",
            "content": format!("Summary of the conversation so far:\n\n{}", content),
        }),
    }
}

// ==================== Response parsing ====================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn into_reply(response: ChatResponse) -> Result<ModelReply, GatewayError> {
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(GatewayError::Protocol(
            "completion carried no choices".to_string(),
        ));
    };
    let message = choice.message;

    let mut calls = Vec::with_capacity(message.tool_calls.len());
    for wire in message.tool_calls {
        let arguments = parse_arguments(&wire.function.name, &wire.function.arguments);
        calls.push(ToolCall::new(wire.id, wire.function.name, arguments));
    }

    // Providers emit empty strings alongside tool calls; treat as absent.
    let content = message.content.filter(|c| !c.is_empty());
    Ok(ModelReply::with_calls(content, calls))
}

/// Decode an arguments string leniently.
///
/// A malformed string becomes an empty object instead of failing the
/// whole completion; argument validation downstream turns that into a
/// structured failure the model can react to.
fn parse_arguments(tool: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Malformed arguments for '{}', substituting {{}}: {}", tool, e);
            json!({})
        }
    }
}
