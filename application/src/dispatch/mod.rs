//! Tool dispatcher: single entry point for executing tool calls.
//!
//! The dispatcher owns the registry and the executable bindings behind it:
//! host tools running in-process and server ports for external tools.
//! Every call flows through the same gate, whatever its destination:
//!
//! ```text
//! ToolCall ──► resolve ──► validate ──► execute ──► ToolOutcome
//!                │            │            │
//!                └ NotFound   └ Invalid    ├ host handler (sync)
//!                  (no I/O)     Arguments  └ server port (async)
//! ```
//!
//! Resolution and validation failures never touch a subprocess; a call for
//! an unknown tool or with malformed arguments is answered locally. Each
//! dispatch returns exactly one [`ToolOutcome`], success or failure, so
//! callers never need a second error path.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, warn};

use ragops_domain::{
    ParameterSchema, RegistryError, ToolCall, ToolContract, ToolFailure, ToolOutcome,
    ToolRegistry, ToolSource,
};

use crate::ports::host_tool::HostTool;
use crate::ports::tool_server::ToolServerPort;

/// Errors raised while wiring tools into the dispatcher.
#[derive(Error, Debug)]
pub enum ToolSetupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Server(#[from] crate::ports::tool_server::ToolServerError),
}

/// Routes tool calls to host tools and attached servers.
#[derive(Default)]
pub struct ToolDispatcher {
    registry: ToolRegistry,
    hosts: HashMap<String, Arc<dyn HostTool>>,
    servers: HashMap<String, Arc<dyn ToolServerPort>>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool executed in-process.
    pub fn register_host_tool(&mut self, tool: Arc<dyn HostTool>) -> Result<(), ToolSetupError> {
        let contract =
            ToolContract::in_process(tool.name(), tool.description(), tool.parameters());
        self.registry.register(contract)?;
        self.hosts.insert(tool.name().to_string(), tool);
        Ok(())
    }

    /// Discovers a server's tools and registers them under namespaced names.
    ///
    /// Returns how many tools were registered. The attach is atomic: name
    /// collisions are detected before anything is inserted, so a failed
    /// attach leaves the registry exactly as it was.
    pub async fn attach_server(
        &mut self,
        server: Arc<dyn ToolServerPort>,
    ) -> Result<usize, ToolSetupError> {
        let infos = server.discover().await?;
        let server_id = server.server_id().to_string();

        let contracts: Vec<ToolContract> = infos
            .into_iter()
            .map(|info| {
                ToolContract::remote(
                    &server_id,
                    &info.name,
                    info.description,
                    ParameterSchema::from_value(info.input_schema),
                )
            })
            .collect();

        let mut seen = HashSet::new();
        for contract in &contracts {
            if self.registry.contains(&contract.name) || !seen.insert(contract.name.clone()) {
                return Err(RegistryError::DuplicateToolName {
                    name: contract.name.clone(),
                }
                .into());
            }
        }

        let count = contracts.len();
        for contract in contracts {
            self.registry.register(contract)?;
        }
        self.servers.insert(server_id.clone(), server);
        debug!("Attached server '{}' with {} tools", server_id, count);
        Ok(count)
    }

    /// All registered contracts, sorted by name. This is the set the model
    /// sees on every request.
    pub fn snapshot(&self) -> Vec<ToolContract> {
        self.registry.snapshot()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn tool_count(&self) -> usize {
        self.registry.len()
    }

    /// Executes one call and returns its single outcome.
    ///
    /// Never returns an error: every failure mode becomes a structured
    /// failure outcome carrying the call id.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutcome {
        let started = Instant::now();

        let Some(contract) = self.registry.resolve(&call.name) else {
            warn!("Tool call for unknown tool '{}'", call.name);
            return ToolOutcome::failure(
                call.id.clone(),
                &call.name,
                ToolFailure::not_found(&call.name),
            );
        };

        if let Err(reason) = contract.parameters.validate(&call.arguments) {
            debug!("Rejecting call to '{}': {}", call.name, reason);
            return ToolOutcome::failure(
                call.id.clone(),
                &call.name,
                ToolFailure::invalid_arguments(reason),
            );
        }

        let outcome = match &contract.source {
            ToolSource::InProcess => self.dispatch_host(call),
            ToolSource::Remote {
                server_id,
                remote_name,
            } => self.dispatch_remote(call, server_id, remote_name).await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if let Some(failure) = &outcome.failure {
            warn!("Tool '{}' failed after {}ms: {}", call.name, elapsed_ms, failure);
        } else {
            debug!("Tool '{}' completed in {}ms", call.name, elapsed_ms);
        }
        outcome.with_duration(elapsed_ms)
    }

    fn dispatch_host(&self, call: &ToolCall) -> ToolOutcome {
        let Some(tool) = self.hosts.get(&call.name) else {
            // Contract registered without a handler: internal wiring bug
            warn!("No handler bound for in-process tool '{}'", call.name);
            return ToolOutcome::failure(
                call.id.clone(),
                &call.name,
                ToolFailure::execution_failed(format!("no handler bound for '{}'", call.name)),
            );
        };

        match tool.call(&call.arguments) {
            Ok(payload) => ToolOutcome::success(call.id.clone(), &call.name, payload),
            Err(error) => ToolOutcome::failure(
                call.id.clone(),
                &call.name,
                ToolFailure::execution_failed(error.to_string()),
            ),
        }
    }

    async fn dispatch_remote(
        &self,
        call: &ToolCall,
        server_id: &str,
        remote_name: &str,
    ) -> ToolOutcome {
        let Some(server) = self.servers.get(server_id) else {
            warn!("No attached server '{}' for tool '{}'", server_id, call.name);
            return ToolOutcome::failure(
                call.id.clone(),
                &call.name,
                ToolFailure::server_unavailable(format!("server '{}' is not attached", server_id)),
            );
        };

        match server.invoke(remote_name, call.arguments.clone()).await {
            Ok(payload) => ToolOutcome::success(call.id.clone(), &call.name, payload),
            Err(error) => ToolOutcome::failure(call.id.clone(), &call.name, error.into()),
        }
    }

    /// Shuts down every attached server.
    pub async fn shutdown(&self) {
        for (server_id, server) in &self.servers {
            debug!("Shutting down server '{}'", server_id);
            server.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::host_tool::HostToolError;
    use crate::ports::tool_server::{RemoteToolInfo, ToolServerError};
    use async_trait::async_trait;
    use ragops_domain::{FailureKind, ParameterField, ParameterSchema};
    use serde_json::{Value, json};
    use std::sync::Mutex;

    struct EchoTool;

    impl HostTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the message back"
        }

        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::object(&[ParameterField::new("message", "Message to echo", true)])
        }

        fn call(&self, arguments: &Value) -> Result<Value, HostToolError> {
            Ok(arguments["message"].clone())
        }
    }

    struct FaultyTool;

    impl HostTool for FaultyTool {
        fn name(&self) -> &str {
            "faulty"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::empty()
        }

        fn call(&self, _arguments: &Value) -> Result<Value, HostToolError> {
            Err(HostToolError::new("disk on fire"))
        }
    }

    /// Server mock that records invocations and returns scripted results.
    struct ScriptedServer {
        id: String,
        tools: Vec<RemoteToolInfo>,
        invocations: Mutex<Vec<String>>,
        result: Box<dyn Fn(&str) -> Result<Value, ToolServerError> + Send + Sync>,
    }

    impl ScriptedServer {
        fn new(id: &str, tool_names: &[&str]) -> Self {
            let tools = tool_names
                .iter()
                .map(|name| RemoteToolInfo {
                    name: name.to_string(),
                    description: format!("{name} on {id}"),
                    input_schema: json!({"type": "object", "properties": {}}),
                })
                .collect();
            Self {
                id: id.to_string(),
                tools,
                invocations: Mutex::new(Vec::new()),
                result: Box::new(|_| Ok(json!("ok"))),
            }
        }

        fn with_result(
            mut self,
            result: impl Fn(&str) -> Result<Value, ToolServerError> + Send + Sync + 'static,
        ) -> Self {
            self.result = Box::new(result);
            self
        }

        fn invocation_count(&self) -> usize {
            self.invocations.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ToolServerPort for ScriptedServer {
        fn server_id(&self) -> &str {
            &self.id
        }

        async fn discover(&self) -> Result<Vec<RemoteToolInfo>, ToolServerError> {
            Ok(self.tools.clone())
        }

        async fn invoke(&self, tool: &str, _arguments: Value) -> Result<Value, ToolServerError> {
            self.invocations.lock().unwrap().push(tool.to_string());
            (self.result)(tool)
        }

        async fn shutdown(&self) {}
    }

    fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
        ToolCall::new(id, name, arguments)
    }

    #[tokio::test]
    async fn test_host_tool_success() {
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.register_host_tool(Arc::new(EchoTool)).unwrap();

        let outcome = dispatcher
            .dispatch(&call("c1", "echo", json!({"message": "hi"})))
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.payload, Some(json!("hi")));
        assert!(outcome.duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_host_tool_fault_becomes_execution_failure() {
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.register_host_tool(Arc::new(FaultyTool)).unwrap();

        let outcome = dispatcher.dispatch(&call("c1", "faulty", json!({}))).await;

        let failure = outcome.failure.expect("should fail");
        assert_eq!(failure.kind, FailureKind::ExecutionFailed);
        assert!(failure.message.contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_unknown_tool_answered_without_server_contact() {
        let server = Arc::new(ScriptedServer::new("indexer", &["search"]));
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.attach_server(server.clone()).await.unwrap();

        let outcome = dispatcher
            .dispatch(&call("c1", "no_such_tool", json!({})))
            .await;

        let failure = outcome.failure.expect("should fail");
        assert_eq!(failure.kind, FailureKind::NotFound);
        assert_eq!(server.invocation_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_arguments_rejected_before_dispatch() {
        let server = Arc::new(ScriptedServer::new("indexer", &["search"]));
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.register_host_tool(Arc::new(EchoTool)).unwrap();
        dispatcher.attach_server(server.clone()).await.unwrap();

        // Missing required "message"
        let outcome = dispatcher.dispatch(&call("c1", "echo", json!({}))).await;
        let failure = outcome.failure.expect("should fail");
        assert_eq!(failure.kind, FailureKind::InvalidArguments);

        // Non-object arguments on a remote tool never reach the server
        let outcome = dispatcher
            .dispatch(&call("c2", "indexer__search", json!("text")))
            .await;
        assert_eq!(
            outcome.failure.expect("should fail").kind,
            FailureKind::InvalidArguments
        );
        assert_eq!(server.invocation_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_tool_invoked_by_original_name() {
        let server = Arc::new(ScriptedServer::new("indexer", &["search"]));
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.attach_server(server.clone()).await.unwrap();

        let outcome = dispatcher
            .dispatch(&call("c1", "indexer__search", json!({})))
            .await;

        assert!(outcome.is_success());
        // The server sees its own name, not the namespaced one
        assert_eq!(*server.invocations.lock().unwrap(), vec!["search"]);
    }

    #[tokio::test]
    async fn test_remote_errors_mapped_one_to_one() {
        let server = Arc::new(
            ScriptedServer::new("indexer", &["slow", "broken"]).with_result(|tool| match tool {
                "slow" => Err(ToolServerError::CallTimeout {
                    tool: "slow".into(),
                    timeout_ms: 100,
                }),
                _ => Err(ToolServerError::RemoteFailure {
                    tool: "broken".into(),
                    message: "index not built".into(),
                }),
            }),
        );
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.attach_server(server).await.unwrap();

        let outcome = dispatcher
            .dispatch(&call("c1", "indexer__slow", json!({})))
            .await;
        assert_eq!(
            outcome.failure.expect("should fail").kind,
            FailureKind::Timeout
        );

        let outcome = dispatcher
            .dispatch(&call("c2", "indexer__broken", json!({})))
            .await;
        let failure = outcome.failure.expect("should fail");
        assert_eq!(failure.kind, FailureKind::ExecutionFailed);
        assert!(failure.message.contains("index not built"));
    }

    #[tokio::test]
    async fn test_same_tool_name_on_two_servers() {
        let alpha = Arc::new(ScriptedServer::new("alpha", &["search"]));
        let beta = Arc::new(ScriptedServer::new("beta", &["search"]));
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.attach_server(alpha.clone()).await.unwrap();
        dispatcher.attach_server(beta.clone()).await.unwrap();

        dispatcher
            .dispatch(&call("c1", "beta__search", json!({})))
            .await;

        assert_eq!(alpha.invocation_count(), 0);
        assert_eq!(beta.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_attach_is_atomic_on_collision() {
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.register_host_tool(Arc::new(EchoTool)).unwrap();

        // Server advertises the same tool twice
        let server = Arc::new(ScriptedServer::new("dup", &["probe", "probe"]));
        let err = dispatcher.attach_server(server).await.unwrap_err();
        assert!(matches!(err, ToolSetupError::Registry(_)));

        // Nothing from the failed attach leaked into the registry
        assert_eq!(dispatcher.tool_count(), 1);
        assert!(!dispatcher.contains("dup__probe"));
    }

    #[tokio::test]
    async fn test_snapshot_lists_all_sources_sorted() {
        let server = Arc::new(ScriptedServer::new("indexer", &["search"]));
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.register_host_tool(Arc::new(EchoTool)).unwrap();
        dispatcher.attach_server(server).await.unwrap();

        let names: Vec<String> = dispatcher
            .snapshot()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["echo", "indexer__search"]);
    }
}
