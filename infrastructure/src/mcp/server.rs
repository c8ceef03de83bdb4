//! [`ToolServerPort`] adapter backed by one MCP subprocess session.
//!
//! The server starts lazily: the first `discover` or `invoke` spawns the
//! process and runs the handshake (`initialize`, `notifications/initialized`,
//! `tools/list`) under the configured startup timeout, caching the
//! advertised tools. A session that degrades mid-flight gets exactly one
//! recovery probe (a fresh `tools/list`); failure closes the server for
//! good and every later call reports it unavailable.

use crate::mcp::error::McpError;
use crate::mcp::protocol::{
    InitializeResult, JsonRpcNotification, ToolCallResult, ToolsListResult, initialize_params,
    tools_call_params,
};
use crate::mcp::session::{McpSession, SessionState};
use async_trait::async_trait;
use ragops_application::{RemoteToolInfo, ToolServerError, ToolServerPort};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Grace period for a server to exit after its stdin closes.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Client identity sent during the handshake.
const CLIENT_NAME: &str = "ragops-agent";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Launch and timeout parameters for one configured server.
#[derive(Debug, Clone)]
pub struct McpServerSettings {
    /// Stable identifier; also the namespace prefix for the server's tools.
    pub name: String,
    /// Executable to launch, resolved against `PATH` before spawning.
    pub command: String,
    pub args: Vec<String>,
    /// Bound on the whole handshake, from spawn to cached tool list.
    pub startup_timeout: Duration,
    /// Per-call deadline for `tools/call`.
    pub call_timeout: Duration,
    /// Cap on concurrent calls against this server.
    pub max_in_flight: usize,
}

impl McpServerSettings {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            startup_timeout: Duration::from_secs(15),
            call_timeout: Duration::from_secs(60),
            max_in_flight: 4,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }
}

/// Where the server stands in its lifecycle.
///
/// `Failed` remembers a startup failure so every later call reports the
/// original reason instead of respawning a known-bad command.
enum ServerHandle {
    Unstarted,
    Ready(Arc<McpSession>),
    Failed(String),
    Closed,
}

/// One configured MCP server behind the application's tool-server port.
pub struct McpToolServer {
    settings: McpServerSettings,
    state: tokio::sync::Mutex<ServerHandle>,
    /// Tools cached by the handshake; refreshed by a recovery probe.
    tools: std::sync::Mutex<Vec<RemoteToolInfo>>,
    in_flight: Arc<Semaphore>,
}

impl McpToolServer {
    pub fn new(settings: McpServerSettings) -> Self {
        let permits = settings.max_in_flight.max(1);
        Self {
            state: tokio::sync::Mutex::new(ServerHandle::Unstarted),
            tools: std::sync::Mutex::new(Vec::new()),
            in_flight: Arc::new(Semaphore::new(permits)),
            settings,
        }
    }

    /// Spawn the process and run the handshake under the startup timeout.
    ///
    /// Returns the failure reason on error; the caller records it so the
    /// command is not respawned.
    async fn start_session(&self) -> Result<(Arc<McpSession>, Vec<RemoteToolInfo>), String> {
        if which::which(&self.settings.command).is_err() {
            return Err(format!(
                "launch command '{}' not found in PATH",
                self.settings.command
            ));
        }

        info!(
            "Starting MCP server '{}': {} {}",
            self.settings.name,
            self.settings.command,
            self.settings.args.join(" ")
        );

        let session = McpSession::spawn(
            &self.settings.name,
            &self.settings.command,
            &self.settings.args,
        )
        .await
        .map_err(|e| format!("spawn failed: {}", e))?;

        let startup = self.settings.startup_timeout;
        match tokio::time::timeout(startup, handshake(&session, &self.settings)).await {
            Ok(Ok(tools)) => {
                session.mark_ready();
                info!(
                    "MCP server '{}' ready with {} tool(s)",
                    self.settings.name,
                    tools.len()
                );
                Ok((session, tools))
            }
            Ok(Err(e)) => {
                // A server that failed its handshake gets no exit grace.
                session.shutdown(Duration::ZERO).await;
                Err(format!("handshake failed: {}", e))
            }
            Err(_) => {
                session.shutdown(Duration::ZERO).await;
                Err(format!(
                    "handshake timed out after {} ms",
                    startup.as_millis()
                ))
            }
        }
    }

    /// Resolve a usable session, starting or recovering as needed.
    ///
    /// Startup and recovery are serialized by the state lock, so
    /// concurrent callers never spawn twice or probe twice.
    async fn ensure_session(&self) -> Result<Arc<McpSession>, ToolServerError> {
        let mut guard = self.state.lock().await;

        match &*guard {
            ServerHandle::Unstarted => match self.start_session().await {
                Ok((session, tools)) => {
                    {
                        let mut cache = self.tools.lock().unwrap_or_else(|e| e.into_inner());
                        *cache = tools;
                    }
                    *guard = ServerHandle::Ready(Arc::clone(&session));
                    Ok(session)
                }
                Err(reason) => {
                    warn!(
                        "MCP server '{}' failed to start: {}",
                        self.settings.name, reason
                    );
                    *guard = ServerHandle::Failed(reason.clone());
                    Err(ToolServerError::StartupFailed {
                        server: self.settings.name.clone(),
                        reason,
                    })
                }
            },
            ServerHandle::Ready(session) => {
                let session = Arc::clone(session);
                match session.current_state() {
                    SessionState::Starting | SessionState::Ready => Ok(session),
                    SessionState::Degraded => {
                        info!(
                            "MCP server '{}' degraded, probing with tools/list",
                            self.settings.name
                        );
                        match session
                            .request("tools/list", None, self.settings.call_timeout)
                            .await
                        {
                            Ok(value) => {
                                session.mark_ready();
                                if let Ok(tools) = parse_tool_list(&value) {
                                    let mut cache =
                                        self.tools.lock().unwrap_or_else(|e| e.into_inner());
                                    *cache = tools;
                                }
                                info!("MCP server '{}' recovered", self.settings.name);
                                Ok(session)
                            }
                            Err(e) => {
                                warn!(
                                    "MCP server '{}' failed its recovery probe, closing: {}",
                                    self.settings.name, e
                                );
                                session.shutdown(SHUTDOWN_GRACE).await;
                                *guard = ServerHandle::Closed;
                                Err(self.unavailable(&format!("recovery probe failed: {}", e)))
                            }
                        }
                    }
                    SessionState::Closed => {
                        warn!("MCP server '{}' process exited", self.settings.name);
                        *guard = ServerHandle::Closed;
                        Err(self.unavailable("server process exited"))
                    }
                }
            }
            ServerHandle::Failed(reason) => Err(ToolServerError::StartupFailed {
                server: self.settings.name.clone(),
                reason: reason.clone(),
            }),
            ServerHandle::Closed => Err(self.unavailable("server is shut down")),
        }
    }

    fn unavailable(&self, reason: &str) -> ToolServerError {
        ToolServerError::Unavailable {
            server: self.settings.name.clone(),
            reason: reason.to_string(),
        }
    }

    fn call_error(&self, tool: &str, error: McpError) -> ToolServerError {
        match error {
            McpError::Timeout(timeout_ms) => ToolServerError::CallTimeout {
                tool: tool.to_string(),
                timeout_ms,
            },
            McpError::Closed => self.unavailable("server process exited"),
            McpError::Rpc { code, message } => ToolServerError::RemoteFailure {
                tool: tool.to_string(),
                message: format!("server error (code {}): {}", code, message),
            },
            other => ToolServerError::Transport(other.to_string()),
        }
    }
}

#[async_trait]
impl ToolServerPort for McpToolServer {
    fn server_id(&self) -> &str {
        &self.settings.name
    }

    async fn discover(&self) -> Result<Vec<RemoteToolInfo>, ToolServerError> {
        self.ensure_session().await?;
        let cache = self.tools.lock().unwrap_or_else(|e| e.into_inner());
        Ok(cache.clone())
    }

    async fn invoke(&self, tool: &str, arguments: Value) -> Result<Value, ToolServerError> {
        let session = self.ensure_session().await?;

        // The semaphore is never closed, so acquire cannot fail.
        let _permit = self.in_flight.acquire().await.ok();

        let value = session
            .request(
                "tools/call",
                Some(tools_call_params(tool, arguments)),
                self.settings.call_timeout,
            )
            .await
            .map_err(|e| self.call_error(tool, e))?;

        let result: ToolCallResult = serde_json::from_value(value).map_err(|e| {
            ToolServerError::Transport(format!("unreadable tools/call result: {}", e))
        })?;

        if result.is_error {
            let message = result.text();
            return Err(ToolServerError::RemoteFailure {
                tool: tool.to_string(),
                message: if message.is_empty() {
                    "tool reported an error without detail".to_string()
                } else {
                    message
                },
            });
        }

        Ok(match result.structured_content {
            Some(structured) => structured,
            None => Value::String(result.text()),
        })
    }

    async fn shutdown(&self) {
        let mut guard = self.state.lock().await;
        if let ServerHandle::Ready(session) = &*guard {
            session.shutdown(SHUTDOWN_GRACE).await;
        }
        *guard = ServerHandle::Closed;
    }
}

/// The MCP opening sequence, run under the caller's startup timeout.
async fn handshake(
    session: &McpSession,
    settings: &McpServerSettings,
) -> Result<Vec<RemoteToolInfo>, McpError> {
    let init = session
        .request(
            "initialize",
            Some(initialize_params(CLIENT_NAME, CLIENT_VERSION)),
            settings.startup_timeout,
        )
        .await?;
    if let Ok(parsed) = serde_json::from_value::<InitializeResult>(init) {
        let identity = parsed
            .server_info
            .map(|s| format!("{} {}", s.name, s.version))
            .unwrap_or_else(|| "unidentified".to_string());
        debug!(
            "MCP server '{}' handshake: {} (protocol {})",
            settings.name, identity, parsed.protocol_version
        );
    }
    session.notify(JsonRpcNotification::initialized()).await?;

    let listed = session
        .request("tools/list", None, settings.startup_timeout)
        .await?;
    parse_tool_list(&listed)
}

fn parse_tool_list(value: &Value) -> Result<Vec<RemoteToolInfo>, McpError> {
    let result: ToolsListResult =
        serde_json::from_value(value.clone()).map_err(|e| McpError::Parse {
            error: e.to_string(),
            raw: value.to_string(),
        })?;
    Ok(result
        .tools
        .into_iter()
        .map(|tool| RemoteToolInfo {
            name: tool.name,
            description: tool.description,
            input_schema: tool.input_schema,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Scripted replies for the full handshake: initialize (id 1) and
    /// tools/list (id 2), with a read for the initialized notification
    /// in between. Ids are fixed because the session allocates from 1.
    const HANDSHAKE: &str = r#"read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2025-06-18","capabilities":{"tools":{}},"serverInfo":{"name":"fake-server","version":"0.1"}}}'
read -r line
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"echo_text","description":"Echo a string back","inputSchema":{"type":"object","properties":{"text":{"type":"string"}},"required":["text"]}}]}}'
"#;

    fn script_server(dir: &tempfile::TempDir, body: &str) -> McpServerSettings {
        let path = dir.path().join("fake_server.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        McpServerSettings::new("fake", "sh")
            .with_args(vec![path.to_string_lossy().into_owned()])
            .with_startup_timeout(Duration::from_secs(5))
            .with_call_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_discover_runs_handshake_and_lists_tools() {
        let dir = tempfile::tempdir().unwrap();
        let settings = script_server(&dir, &format!("{}read -r line\n", HANDSHAKE));
        let server = McpToolServer::new(settings);

        let tools = server.discover().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo_text");
        assert_eq!(tools[0].description, "Echo a string back");
        assert_eq!(tools[0].input_schema["required"][0], "text");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_invoke_returns_text_payload() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{}read -r line\nprintf '%s\\n' '{}'\nread -r line\n",
            HANDSHAKE,
            r#"{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"echoed: hello"}],"isError":false}}"#
        );
        let server = McpToolServer::new(script_server(&dir, &body));

        let payload = server
            .invoke("echo_text", json!({"text": "hello"}))
            .await
            .unwrap();
        assert_eq!(payload, json!("echoed: hello"));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_invoke_prefers_structured_content() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{}read -r line\nprintf '%s\\n' '{}'\nread -r line\n",
            HANDSHAKE,
            r#"{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"{\"count\":2}"}],"structuredContent":{"count":2},"isError":false}}"#
        );
        let server = McpToolServer::new(script_server(&dir, &body));

        let payload = server
            .invoke("echo_text", json!({"text": "x"}))
            .await
            .unwrap();
        assert_eq!(payload, json!({"count": 2}));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_invoke_maps_is_error_to_remote_failure() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{}read -r line\nprintf '%s\\n' '{}'\nread -r line\n",
            HANDSHAKE,
            r#"{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"index not built"}],"isError":true}}"#
        );
        let server = McpToolServer::new(script_server(&dir, &body));

        let error = server
            .invoke("echo_text", json!({"text": "x"}))
            .await
            .unwrap_err();
        match error {
            ToolServerError::RemoteFailure { tool, message } => {
                assert_eq!(tool, "echo_text");
                assert_eq!(message, "index not built");
            }
            other => panic!("unexpected error: {other}"),
        }

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_command_fails_startup_without_spawning() {
        let settings = McpServerSettings::new("ghost", "ragops-definitely-missing-server-binary");
        let server = McpToolServer::new(settings);

        let error = server.discover().await.unwrap_err();
        assert!(matches!(error, ToolServerError::StartupFailed { .. }));
        assert!(error.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_silent_server_fails_startup_and_stays_failed() {
        let settings = McpServerSettings::new("mute", "sleep")
            .with_args(vec!["5".into()])
            .with_startup_timeout(Duration::from_millis(200));
        let server = McpToolServer::new(settings);

        let first = server.discover().await.unwrap_err();
        assert!(matches!(first, ToolServerError::StartupFailed { .. }));

        // The failure is remembered; the command is not respawned.
        let second = server.invoke("anything", json!({})).await.unwrap_err();
        assert!(matches!(second, ToolServerError::StartupFailed { .. }));
    }

    #[tokio::test]
    async fn test_server_exiting_before_handshake_fails_startup() {
        let settings =
            McpServerSettings::new("flaky", "true").with_startup_timeout(Duration::from_secs(5));
        let server = McpToolServer::new(settings);

        let error = server.discover().await.unwrap_err();
        assert!(matches!(error, ToolServerError::StartupFailed { .. }));
    }

    #[tokio::test]
    async fn test_invoke_after_shutdown_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let server = McpToolServer::new(script_server(
            &dir,
            &format!("{}read -r line\n", HANDSHAKE),
        ));
        server.discover().await.unwrap();
        server.shutdown().await;

        let error = server
            .invoke("echo_text", json!({"text": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(error, ToolServerError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_call_timeout_then_recovery_probe_restores_service() {
        let dir = tempfile::tempdir().unwrap();
        // The server ignores the first tools/call (id 3) and the
        // cancellation notice, then answers the recovery probe (id 4)
        // and the retried call (id 5).
        let body = format!(
            "{handshake}read -r line\nread -r line\nread -r line\nprintf '%s\\n' '{probe}'\nread -r line\nprintf '%s\\n' '{retry}'\nread -r line\n",
            handshake = HANDSHAKE,
            probe = r#"{"jsonrpc":"2.0","id":4,"result":{"tools":[{"name":"echo_text","description":"Echo a string back","inputSchema":{"type":"object"}}]}}"#,
            retry = r#"{"jsonrpc":"2.0","id":5,"result":{"content":[{"type":"text","text":"second try"}],"isError":false}}"#,
        );
        let settings = script_server(&dir, &body).with_call_timeout(Duration::from_millis(300));
        let server = McpToolServer::new(settings);

        let first = server
            .invoke("echo_text", json!({"text": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(
            first,
            ToolServerError::CallTimeout {
                timeout_ms: 300,
                ..
            }
        ));

        let second = server
            .invoke("echo_text", json!({"text": "x"}))
            .await
            .unwrap();
        assert_eq!(second, json!("second try"));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_recovery_probe_closes_the_server() {
        let dir = tempfile::tempdir().unwrap();
        // The server answers the handshake, then goes mute for good.
        let body = format!("{}cat >/dev/null\n", HANDSHAKE);
        let settings = script_server(&dir, &body).with_call_timeout(Duration::from_millis(200));
        let server = McpToolServer::new(settings);

        let first = server
            .invoke("echo_text", json!({"text": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(first, ToolServerError::CallTimeout { .. }));

        // The recovery probe times out too, closing the server.
        let second = server
            .invoke("echo_text", json!({"text": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(second, ToolServerError::Unavailable { .. }));

        let third = server
            .invoke("echo_text", json!({"text": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(third, ToolServerError::Unavailable { .. }));
    }
}
