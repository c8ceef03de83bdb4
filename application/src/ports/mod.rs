//! Port definitions for the application layer.
//!
//! Ports are interfaces that the application layer depends on.
//! Implementations (adapters) live in the infrastructure layer.

pub mod host_tool;
pub mod model_gateway;
pub mod progress;
pub mod tool_server;
pub mod transcript;
