//! MCP bridge for the webtest backend
//!
//! Exposes backend capabilities (test cases, defects, documents, execution
//! results) to agent clients as MCP tools and prompts over JSON-RPC 2.0.

pub mod client;
pub mod config;
pub mod context;
pub mod prompts;
pub mod protocol;
pub mod serde_utils;
pub mod server;
pub mod tools;
pub mod transport;
