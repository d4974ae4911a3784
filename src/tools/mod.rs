//! MCP tools
//!
//! A tool is a named, schema-described proxy for one backend operation. The
//! [`ToolRegistry`] owns one instance per name; `tools/call` looks the tool
//! up, validates the arguments against its schema and runs it.
//!
//! Business failures (bad arguments, backend errors) come back as
//! [`ToolResult::Error`]. `Err(ToolError)` is reserved for failures of the
//! bridge itself and surfaces as a JSON-RPC error.

pub mod args;
pub mod batch;
pub mod handlers;
mod registry;
mod result;
pub mod task_ref;
mod validator;


use async_trait::async_trait;
use miette::Diagnostic;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::context::CallContext;

pub use batch::BatchLedger;
pub use registry::ToolRegistry;
pub use result::ToolResult;
pub use task_ref::{TaskRef, TaskSummary};
pub use validator::{SchemaValidator, ValidationError};

/// Decoded `arguments` object of a `tools/call` request
pub type Args = Map<String, Value>;

#[derive(Error, Diagnostic, Debug)]
pub enum ToolError {
    #[error("tool execution failed: {0}")]
    #[diagnostic(code(webtest_mcp::tools::internal))]
    Internal(String),

    #[error("failed to serialize tool output: {0}")]
    #[diagnostic(code(webtest_mcp::tools::serialization))]
    Serialization(#[from] serde_json::Error),
}

/// Behaviour hints shown to the client next to the tool definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub read_only_hint: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub destructive_hint: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub idempotent_hint: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub open_world_hint: bool,
}

impl ToolAnnotations {
    pub fn read_only(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            read_only_hint: true,
            idempotent_hint: true,
            ..Self::default()
        }
    }

    pub fn write(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }
}

/// Metadata entry returned by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the `arguments` object
    fn input_schema(&self) -> Value;

    fn annotations(&self) -> Option<ToolAnnotations> {
        None
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
            annotations: self.annotations(),
        }
    }
}
