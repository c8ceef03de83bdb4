//! Port for structured transcript logging.
//!
//! Defines the [`TranscriptSink`] trait for recording conversation events
//! (user prompts, model replies, tool calls and outcomes, compression) to
//! a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the full
//! conversation transcript in a machine-readable format (JSONL).

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A structured transcript event.
///
/// Each event has a type string, a UTC timestamp, and a JSON payload
/// containing event-specific fields.
pub struct TranscriptEvent {
    /// Event type identifier (e.g., "model_reply", "tool_outcome").
    pub event_type: &'static str,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl TranscriptEvent {
    /// Create a new transcript event with the current UTC timestamp.
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Port for recording transcript events.
///
/// Implementations write each event as a single record (e.g., one JSONL
/// line). `record` is synchronous and non-fallible; implementations
/// swallow their own I/O errors rather than propagate them into the
/// agent loop.
pub trait TranscriptSink: Send + Sync {
    /// Record a transcript event.
    fn record(&self, event: TranscriptEvent);
}

/// No-op implementation for tests and when transcripts are disabled.
pub struct NoTranscript;

impl TranscriptSink for NoTranscript {
    fn record(&self, _event: TranscriptEvent) {}
}
