//! Tool contracts: the one shape every capability is normalized into.
//!
//! A [`ToolContract`] is created at registry build time and never mutated.
//! The [`ToolSource`] tag is the routing handle: the dispatcher either runs
//! the bound in-process handler or forwards the call to the owning server
//! session, with no reflection or duck typing in between.

use serde::{Deserialize, Serialize};

use super::schema::ParameterSchema;

/// Where a tool's implementation lives.
///
/// Remote tools keep their server's original tool name so the wire call
/// uses what the server declared while the registry key stays namespaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolSource {
    /// Bound to a host handler running in the agent's own process.
    InProcess,
    /// Exposed by a remote tool-server subprocess.
    Remote {
        /// Identifier of the owning server session.
        server_id: String,
        /// Tool name as the server declared it (un-namespaced).
        remote_name: String,
    },
}

impl ToolSource {
    pub fn is_remote(&self) -> bool {
        matches!(self, ToolSource::Remote { .. })
    }
}

/// Namespaced registry name for a remote tool: `server__tool`.
///
/// The double underscore keeps names inside the `[A-Za-z0-9_-]` alphabet
/// that model providers enforce for tool names, while staying readable.
pub fn namespaced(server_id: &str, tool_name: &str) -> String {
    format!("{}__{}", server_id, tool_name)
}

/// Immutable description of one invocable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolContract {
    /// Globally unique name (after namespacing for remote tools).
    pub name: String,
    /// Human/model-readable description.
    pub description: String,
    /// Accepted argument shape.
    pub parameters: ParameterSchema,
    /// Routing handle.
    pub source: ToolSource,
}

impl ToolContract {
    /// Contract for an in-process host tool.
    pub fn in_process(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            source: ToolSource::InProcess,
        }
    }

    /// Contract for a tool discovered on a remote server.
    ///
    /// The registry name is namespaced with the server id; the server's own
    /// name is preserved in the source for the wire call.
    pub fn remote(
        server_id: impl Into<String>,
        remote_name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
    ) -> Self {
        let server_id = server_id.into();
        let remote_name = remote_name.into();
        Self {
            name: namespaced(&server_id, &remote_name),
            description: description.into(),
            parameters,
            source: ToolSource::Remote {
                server_id,
                remote_name,
            },
        }
    }
}
