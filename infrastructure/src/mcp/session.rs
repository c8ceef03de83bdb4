//! One live MCP server subprocess and its framed message exchange.
//!
//! A session owns the child process exclusively. Its stdout is read by a
//! single background task that classifies each frame and resolves the
//! in-flight table; no lock is ever held across a read. Writes go through
//! a mutex-guarded buffered writer shared with the reader task, which
//! needs it to reject server-initiated requests.
//!
//! # Lifecycle
//!
//! ```text
//! Starting ──handshake ok──▶ Ready ──timeout / malformed frame──▶ Degraded
//!     │                        ▲                                     │
//!     │                        └────────recovery probe ok────────────┘
//!     └─────────▶ Closed ◀───── shutdown, process exit, failed recovery
//! ```
//!
//! `Closed` is terminal. Entering `Degraded` resolves every pending
//! request with a transport error; the owning
//! [`McpToolServer`](super::server::McpToolServer) decides whether to
//! probe for recovery or close the session.

use crate::mcp::error::{McpError, Result};
use crate::mcp::pending::PendingTable;
use crate::mcp::protocol::{
    FrameKind, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, JsonRpcResponseOut,
    classify_frame,
};
use serde_json::Value;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Lifecycle state of one server session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Process spawned, handshake not yet confirmed.
    Starting,
    /// Handshake done; requests flow normally.
    Ready,
    /// A request timed out or a frame was unreadable. Pending requests
    /// were failed; one recovery probe decides between Ready and Closed.
    Degraded,
    /// Terminal. The process exited, recovery failed, or shutdown ran.
    Closed,
}

type SharedWriter = Arc<tokio::sync::Mutex<Option<BufWriter<ChildStdin>>>>;

/// A spawned MCP server process with id-correlated request/response
/// exchange over its standard streams.
pub struct McpSession {
    server_id: String,
    stdin: SharedWriter,
    pending: Arc<PendingTable>,
    state: Arc<std::sync::Mutex<SessionState>>,
    next_id: AtomicU64,
    /// Taken by `shutdown`; `Drop` kills whatever is left.
    child: std::sync::Mutex<Option<Child>>,
    _reader_handle: JoinHandle<()>,
}

impl McpSession {
    /// Spawn the server process and start its background reader.
    ///
    /// The returned session is in [`SessionState::Starting`]; the caller
    /// drives the handshake and promotes it with [`mark_ready`](Self::mark_ready).
    pub async fn spawn(server_id: &str, command: &str, args: &[String]) -> Result<Arc<Self>> {
        debug!(
            "Spawning MCP server '{}': {} {}",
            server_id,
            command,
            args.join(" ")
        );

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Linux: request kernel to send SIGTERM to child when parent dies.
        // This catches cases where Drop doesn't run (SIGKILL, OOM kill).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Io(std::io::Error::other("failed to capture stdout")))?;
        let child_stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Io(std::io::Error::other("failed to capture stdin")))?;

        // Drain the server's stderr into our logs instead of the terminal.
        if let Some(stderr) = child.stderr.take() {
            let id = server_id.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[{} stderr] {}", id, line);
                }
            });
        }

        let stdin: SharedWriter =
            Arc::new(tokio::sync::Mutex::new(Some(BufWriter::new(child_stdin))));
        let pending = Arc::new(PendingTable::new());
        let state = Arc::new(std::sync::Mutex::new(SessionState::Starting));

        let reader_stdin = Arc::clone(&stdin);
        let reader_pending = Arc::clone(&pending);
        let reader_state = Arc::clone(&state);
        let reader_id = server_id.to_string();
        let reader_handle = tokio::spawn(async move {
            reader_loop(reader_id, stdout, reader_stdin, reader_pending, reader_state).await;
        });

        Ok(Arc::new(Self {
            server_id: server_id.to_string(),
            stdin,
            pending,
            state,
            next_id: AtomicU64::new(1),
            child: std::sync::Mutex::new(Some(child)),
            _reader_handle: reader_handle,
        }))
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn current_state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Promote the session after a successful handshake or recovery probe.
    pub fn mark_ready(&self) {
        transition(&self.state, SessionState::Ready);
    }

    /// Send a request and wait for its correlated response.
    ///
    /// The id comes from the session's monotonic counter and is never
    /// reused. Exceeding `deadline` abandons the slot (a late response is
    /// then discarded on arrival), sends a best-effort cancellation
    /// notice, and degrades the session: concurrent pending requests are
    /// resolved with a transport error, since the stream can no longer be
    /// trusted to answer them in bounded time.
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        deadline: Duration,
    ) -> Result<Value> {
        if self.current_state() == SessionState::Closed {
            return Err(McpError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);
        let rx = self.pending.register(id);

        if let Err(e) = self.send_value(&serde_json::to_value(&request)?).await {
            self.pending.abandon(id);
            return Err(e);
        }

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(McpError::Closed),
            Err(_) => {
                // Abandon first so a late response cannot reach a caller
                // that stopped listening.
                self.pending.abandon(id);
                let _ = self
                    .notify(JsonRpcNotification::cancelled(id, "deadline exceeded"))
                    .await;
                warn!(
                    "MCP server '{}': request '{}' (id={}) timed out after {} ms, degrading session",
                    self.server_id,
                    method,
                    id,
                    deadline.as_millis()
                );
                transition(&self.state, SessionState::Degraded);
                self.pending
                    .fail_all(|| McpError::Degraded("a concurrent request timed out".into()));
                Err(McpError::Timeout(deadline.as_millis() as u64))
            }
        }
    }

    /// Send a notification (no response expected).
    pub async fn notify(&self, notification: JsonRpcNotification) -> Result<()> {
        self.send_value(&serde_json::to_value(&notification)?).await
    }

    async fn send_value(&self, frame: &Value) -> Result<()> {
        write_frame(&self.server_id, &self.stdin, frame).await
    }

    /// Graceful shutdown: fail outstanding requests, close stdin so the
    /// server can exit on its own, wait up to `grace`, then force-kill.
    pub async fn shutdown(&self, grace: Duration) {
        transition(&self.state, SessionState::Closed);
        self.pending.fail_all(|| McpError::Closed);

        {
            let mut guard = self.stdin.lock().await;
            *guard = None;
        }

        let child = {
            let mut guard = self.child.lock().unwrap_or_else(|e| e.into_inner());
            guard.take()
        };
        let Some(mut child) = child else {
            return;
        };

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!("MCP server '{}' exited with {}", self.server_id, status);
            }
            Ok(Err(e)) => {
                warn!("MCP server '{}': wait failed: {}", self.server_id, e);
            }
            Err(_) => {
                warn!(
                    "MCP server '{}' did not exit within {} ms, killing",
                    self.server_id,
                    grace.as_millis()
                );
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
    }
}

impl Drop for McpSession {
    fn drop(&mut self) {
        let mut guard = self.child.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(child) = guard.as_mut() {
            debug!(
                "McpSession '{}' dropping, killing server process",
                self.server_id
            );
            let _ = child.start_kill();
        }
    }
}

/// `Closed` is terminal; every other transition overwrites freely.
fn transition(state: &std::sync::Mutex<SessionState>, next: SessionState) {
    let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
    if *guard != SessionState::Closed {
        *guard = next;
    }
}

async fn write_frame(server_id: &str, stdin: &SharedWriter, frame: &Value) -> Result<()> {
    let line = serde_json::to_string(frame)?;
    trace!("[{}] sending: {}", server_id, line);

    let mut guard = stdin.lock().await;
    let Some(writer) = guard.as_mut() else {
        return Err(McpError::Closed);
    };
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Background reader loop, the single owner of the child's stdout.
///
/// Each line is parsed and classified:
///
/// - **Response** → in-flight table resolution; unknown ids are logged
///   and discarded, never fatal.
/// - **ServerRequest** → answered with method-not-found so the server
///   does not wait forever on a capability this client lacks.
/// - **Notification** → logged.
///
/// An unparseable line degrades the session and fails everything
/// pending; end of stream closes it the same way.
async fn reader_loop(
    server_id: String,
    stdout: ChildStdout,
    stdin: SharedWriter,
    pending: Arc<PendingTable>,
    state: Arc<std::sync::Mutex<SessionState>>,
) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("MCP server '{}' closed its stdout", server_id);
                break;
            }
            Err(e) => {
                warn!("MCP server '{}': read error: {}", server_id, e);
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        trace!("[{}] received: {}", server_id, trimmed);

        let frame: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    "MCP server '{}' sent a malformed frame, degrading session: {}",
                    server_id, e
                );
                transition(&state, SessionState::Degraded);
                let detail = e.to_string();
                pending.fail_all(|| McpError::Degraded(format!("malformed frame: {}", detail)));
                continue;
            }
        };

        match classify_frame(&frame) {
            FrameKind::Response { id } => {
                let response: JsonRpcResponse = match serde_json::from_value(frame) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(
                            "MCP server '{}' sent an unreadable response, degrading session: {}",
                            server_id, e
                        );
                        transition(&state, SessionState::Degraded);
                        let detail = e.to_string();
                        pending.fail_all(|| {
                            McpError::Degraded(format!("unreadable response: {}", detail))
                        });
                        continue;
                    }
                };
                let outcome = match response.error {
                    Some(err) => Err(McpError::Rpc {
                        code: err.code,
                        message: err.message,
                    }),
                    None => Ok(response.result.unwrap_or(Value::Null)),
                };
                if !pending.complete(id, outcome) {
                    warn!(
                        "MCP server '{}': response for unknown request id={}, discarding",
                        server_id, id
                    );
                }
            }
            FrameKind::ServerRequest { id } => {
                let method = frame.get("method").and_then(|m| m.as_str()).unwrap_or("");
                debug!(
                    "MCP server '{}' issued request '{}' (id={}), rejecting",
                    server_id, method, id
                );
                let reject = JsonRpcResponseOut::method_not_found(id, method);
                if let Ok(value) = serde_json::to_value(&reject)
                    && let Err(e) = write_frame(&server_id, &stdin, &value).await
                {
                    debug!("MCP server '{}': could not send rejection: {}", server_id, e);
                }
            }
            FrameKind::Notification => {
                let method = frame.get("method").and_then(|m| m.as_str()).unwrap_or("");
                match method {
                    "notifications/message" => {
                        debug!(
                            "[{}] server log: {}",
                            server_id,
                            frame.get("params").unwrap_or(&serde_json::Value::Null)
                        );
                    }
                    "notifications/tools/list_changed" => {
                        debug!("MCP server '{}' announced a tool list change", server_id);
                    }
                    other => {
                        trace!("[{}] ignoring notification method={}", server_id, other);
                    }
                }
            }
        }
    }

    // Reader ended: the process exited or its pipe broke. Resolve every
    // outstanding caller so nobody waits on a dead process.
    info!(
        "MCP server '{}': reader loop ended, failing outstanding requests",
        server_id
    );
    transition(&state, SessionState::Closed);
    pending.fail_all(|| McpError::Closed);
}
