//! Tool invocations and their outcomes.
//!
//! A [`ToolCall`] is what the model asks for; a [`ToolOutcome`] is the
//! exactly-one answer the orchestration core delivers for it. Failures are
//! structured: a closed [`FailureKind`] taxonomy plus a human-readable
//! message, so the model (and the transcript) always sees *what kind* of
//! thing went wrong, never a bare string.
//!
//! Failure kinds and where they originate:
//!
//! | Kind | Origin |
//! |------|--------|
//! | `NotFound` | registry lookup, before any dispatch |
//! | `InvalidArguments` | schema validation, before any dispatch |
//! | `ExecutionFailed` | in-process handler fault or remote tool fault |
//! | `StartupFailed` | server spawn/handshake failure |
//! | `Timeout` | per-call deadline exceeded |
//! | `ServerUnavailable` | session closed or re-handshake exhausted |
//! | `Transport` | framing/stream fault on a live session |

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Correlation id of one tool call within a conversation.
///
/// Assigned by the model provider (e.g. `call_abc123`); opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CallId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CallId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id for the eventual tool-result turn.
    pub id: CallId,
    /// Registry name (namespaced for remote tools).
    pub name: String,
    /// Argument object as emitted by the model.
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<CallId>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Classification of a tool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    InvalidArguments,
    ExecutionFailed,
    StartupFailed,
    Timeout,
    ServerUnavailable,
    Transport,
}

impl FailureKind {
    /// Stable uppercase code used in transcripts and wire payloads.
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "NOT_FOUND",
            FailureKind::InvalidArguments => "INVALID_ARGUMENTS",
            FailureKind::ExecutionFailed => "EXECUTION_FAILED",
            FailureKind::StartupFailed => "SERVER_STARTUP_FAILED",
            FailureKind::Timeout => "TOOL_CALL_TIMEOUT",
            FailureKind::ServerUnavailable => "SERVER_UNAVAILABLE",
            FailureKind::Transport => "TRANSPORT_ERROR",
        }
    }
}

/// Structured failure attached to an unsuccessful [`ToolOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Additional detail (original error text, server id, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ToolFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    // Taxonomy constructors

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::new(
            FailureKind::NotFound,
            format!("unknown tool: {}", name.into()),
        )
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidArguments, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ExecutionFailed, message)
    }

    pub fn startup_failed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::StartupFailed, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn server_unavailable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ServerUnavailable, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind.code(), self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolFailure {}

/// The single outcome delivered for one [`ToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Correlates back to the originating call.
    pub call_id: CallId,
    pub tool_name: String,
    /// Payload of a successful execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Failure of an unsuccessful execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ToolFailure>,
    /// Wall-clock dispatch duration, when measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolOutcome {
    pub fn success(call_id: CallId, tool_name: impl Into<String>, payload: Value) -> Self {
        Self {
            call_id,
            tool_name: tool_name.into(),
            payload: Some(payload),
            failure: None,
            duration_ms: None,
        }
    }

    pub fn failure(call_id: CallId, tool_name: impl Into<String>, failure: ToolFailure) -> Self {
        Self {
            call_id,
            tool_name: tool_name.into(),
            payload: None,
            failure: Some(failure),
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// The content the model sees in the tool-result turn: the payload
    /// rendered as a string, or the structured failure display.
    pub fn render_content(&self) -> String {
        match (&self.payload, &self.failure) {
            (Some(Value::String(s)), _) => s.clone(),
            (Some(other), _) => other.to_string(),
            (None, Some(failure)) => failure.to_string(),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_display() {
        let failure = ToolFailure::timeout("call to 'read_engine' timed out after 30s")
            .with_detail("server reader");
        let text = failure.to_string();
        assert!(text.starts_with("[TOOL_CALL_TIMEOUT]"));
        assert!(text.contains("read_engine"));
        assert!(text.ends_with("(server reader)"));
    }

    #[test]
    fn test_failure_kind_codes_are_distinct() {
        let kinds = [
            FailureKind::NotFound,
            FailureKind::InvalidArguments,
            FailureKind::ExecutionFailed,
            FailureKind::StartupFailed,
            FailureKind::Timeout,
            FailureKind::ServerUnavailable,
            FailureKind::Transport,
        ];
        let codes: std::collections::HashSet<_> = kinds.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_outcome_success() {
        let outcome = ToolOutcome::success(
            CallId::new("call_1"),
            "read_file",
            json!({"content": "hello"}),
        )
        .with_duration(12);

        assert!(outcome.is_success());
        assert_eq!(outcome.duration_ms, Some(12));
        assert!(outcome.render_content().contains("hello"));
    }

    #[test]
    fn test_outcome_failure() {
        let outcome = ToolOutcome::failure(
            CallId::new("call_2"),
            "ghost_tool",
            ToolFailure::not_found("ghost_tool"),
        );

        assert!(!outcome.is_success());
        assert!(outcome.render_content().contains("NOT_FOUND"));
        assert!(outcome.payload.is_none());
    }

    #[test]
    fn test_string_payload_rendered_verbatim() {
        let outcome = ToolOutcome::success(
            CallId::new("call_3"),
            "time_now",
            Value::String("2025-03-01T10:00:00".to_string()),
        );
        // No extra JSON quoting around plain string payloads
        assert_eq!(outcome.render_content(), "2025-03-01T10:00:00");
    }
}
