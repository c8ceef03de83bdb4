//! JSON-RPC frame types for the MCP stdio dialect.
//!
//! Frames travel one JSON object per line over the server's standard
//! streams. Requests carry an `id` assigned by the session's monotonic
//! counter; notifications carry none and expect no reply.
//!
//! # Methods used
//!
//! - `initialize` (request) then `notifications/initialized`: the handshake.
//! - `tools/list` (request): capability discovery.
//! - `tools/call` (request): one tool invocation.
//! - `notifications/cancelled`: best-effort notice after a local timeout.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Protocol revision sent during `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// JSON-RPC request (client to server, expects a correlated response)
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a request with a caller-supplied id.
    ///
    /// Ids are allocated by the owning session so they stay monotonic per
    /// server connection; this type never invents one.
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// Params for the `initialize` handshake request.
pub fn initialize_params(client_name: &str, client_version: &str) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": client_name,
            "version": client_version,
        },
    })
}

/// Params for a `tools/call` request, invoking by the server's own
/// (un-namespaced) tool name.
pub fn tools_call_params(tool: &str, arguments: Value) -> Value {
    json!({
        "name": tool,
        "arguments": arguments,
    })
}

/// JSON-RPC notification (no id, no reply expected)
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }

    /// Sent once after a successful `initialize` response.
    pub fn initialized() -> Self {
        Self::new("notifications/initialized", None)
    }

    /// Tells the server a request's caller gave up waiting.
    ///
    /// The server may still finish the work; any late response for the id
    /// is discarded on arrival.
    pub fn cancelled(request_id: u64, reason: &str) -> Self {
        Self::new(
            "notifications/cancelled",
            Some(json!({
                "requestId": request_id,
                "reason": reason,
            })),
        )
    }
}

/// JSON-RPC response (server to client)
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

/// Outgoing JSON-RPC response (client to server).
///
/// MCP servers may issue their own requests (sampling, roots listing).
/// This client supports none of them, so the reader answers each with a
/// method-not-found error rather than leaving the server waiting.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponseOut {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub error: RpcErrorOut,
}

/// Outgoing JSON-RPC error object
#[derive(Debug, Clone, Serialize)]
pub struct RpcErrorOut {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponseOut {
    pub fn method_not_found(id: u64, method: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error: RpcErrorOut {
                code: -32601,
                message: format!("Method not supported: {}", method),
            },
        }
    }
}

/// Classification of an incoming JSON-RPC frame.
///
/// Used by the session's background reader task to determine how to
/// dispatch each frame:
///
/// - `Response` → in-flight table correlation by id
/// - `ServerRequest` → rejected with a method-not-found response
/// - `Notification` → logged, never correlated
#[derive(Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// A response to a request we sent (has `id`, no `method`).
    Response { id: u64 },
    /// A request initiated by the server (has `id` + `method`).
    ServerRequest { id: u64 },
    /// A notification (has `method`, no `id`).
    Notification,
}

/// Classify a JSON-RPC frame by inspecting `id` and `method` fields.
///
/// This is a pure function with no side effects, called once per frame in
/// the session's background reader loop.
pub fn classify_frame(json: &Value) -> FrameKind {
    let id = json.get("id").and_then(|v| v.as_u64());
    let method = json.get("method").and_then(|v| v.as_str());

    match (id, method) {
        (Some(id), Some(_)) => FrameKind::ServerRequest { id },
        (Some(id), None) => FrameKind::Response { id },
        _ => FrameKind::Notification,
    }
}

fn object_schema() -> Value {
    json!({"type": "object"})
}

/// Result payload of `tools/list`
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsListResult {
    #[serde(default)]
    pub tools: Vec<ToolEntry>,
}

/// One tool as advertised by the server
#[derive(Debug, Clone, Deserialize)]
pub struct ToolEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default = "object_schema")]
    pub input_schema: Value,
}

/// Result payload of `tools/call`
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
    #[serde(rename = "structuredContent", default)]
    pub structured_content: Option<Value>,
}

impl ToolCallResult {
    /// Concatenate the text blocks of the content array.
    ///
    /// Non-text blocks (images, embedded resources) are skipped; callers
    /// get whatever prose the server produced, joined by newlines.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            if block.get("type").and_then(|t| t.as_str()) != Some("text") {
                continue;
            }
            if let Some(text) = block.get("text").and_then(|t| t.as_str())
                && !text.is_empty()
            {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }
}

/// Result payload of `initialize` (used for logging only)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    #[serde(default)]
    pub protocol_version: String,
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
}

/// Server identity advertised during `initialize`
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}
