//! MCP (Model Context Protocol) subprocess transport.
//!
//! Each configured tool server runs as a child process speaking
//! line-delimited JSON-RPC 2.0 over its standard streams. The module is
//! layered bottom-up:
//!
//! - [`protocol`]: frame types and a pure classifier for incoming frames.
//! - [`pending`]: the in-flight request table correlating responses by id.
//! - [`session`]: one live subprocess: spawn, background reader, writes,
//!   per-request deadlines, shutdown.
//! - [`server`]: the [`ToolServerPort`](ragops_application::ToolServerPort)
//!   adapter: lazy startup, handshake, capability cache, degraded-session
//!   recovery, and the in-flight concurrency cap.

pub mod error;
pub mod pending;
pub mod protocol;
pub mod server;
pub mod session;

pub use error::{McpError, Result};
pub use server::{McpServerSettings, McpToolServer};
pub use session::{McpSession, SessionState};
