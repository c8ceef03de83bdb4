//! Built-in host tools
//!
//! These run inside the agent process and cover the local basics a model
//! needs between server calls: clock reads, file access, and filename
//! search. Remote capability comes from MCP servers; nothing here talks
//! to the network.

pub mod clock;
pub mod file;
pub mod search;

pub use clock::TimeNowTool;
pub use file::{ListDirectoryTool, ReadFileTool};
pub use search::FindFilesTool;

use ragops_application::HostTool;
use std::sync::Arc;

/// All built-in tools, ready for registration.
pub fn builtin_tools() -> Vec<Arc<dyn HostTool>> {
    vec![
        Arc::new(TimeNowTool),
        Arc::new(ReadFileTool),
        Arc::new(ListDirectoryTool),
        Arc::new(FindFilesTool),
    ]
}
