//! Use cases orchestrating the agent loop.

pub mod run_agent;
