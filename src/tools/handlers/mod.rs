//! Concrete tool proxies
//!
//! Each tool turns its arguments into one or a few backend REST calls made
//! with the caller's context, and wraps the backend body as the tool result.
//! Argument and backend failures end up as [`ToolResult::Error`].

mod defects;
mod execution;
mod manual_cases;
mod raw_documents;
mod requirements;
mod review;
mod user_project;

#[cfg(test)]
mod manual_cases_test;
#[cfg(test)]
mod project_docs_test;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::info;

use super::args::ArgError;
use super::{Tool, ToolError, ToolRegistry, ToolResult};
use crate::client::{BackendClient, BackendError};

pub use defects::{ListDefects, UpdateDefects};
pub use execution::{GetExecutionTaskCases, ListExecutionTasks, UpdateExecutionCaseResult};
pub use manual_cases::{ListManualGroups, UpdateManualCase, UpdateManualCases};
pub use raw_documents::ListRawDocuments;
pub use requirements::{GetRequirementItem, ListRequirementItems};
pub use review::CreateReviewItem;
pub use user_project::GetCurrentProjectName;

/// Business failure inside a handler, reported to the agent as error text
#[derive(Debug, Error)]
pub(crate) enum Failure {
    #[error(transparent)]
    Arg(#[from] ArgError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Message(String),
}

impl Failure {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Failure::Message(message.into())
    }

    /// Prefix a backend error with what the handler was doing
    pub(crate) fn while_doing(step: &str, err: BackendError) -> Self {
        Failure::Message(format!("{step}: {err}"))
    }
}

pub(crate) type Outcome = Result<ToolResult, Failure>;

/// Turn a handler outcome into the registry-facing result
pub(crate) fn settle(outcome: Outcome) -> Result<ToolResult, ToolError> {
    Ok(outcome.unwrap_or_else(|failure| ToolResult::error(failure.to_string())))
}

/// Decode a backend body, naming what was being parsed on failure
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T, Failure> {
    serde_json::from_slice(body).map_err(|e| Failure::msg(format!("failed to parse {what}: {e}")))
}

pub(crate) fn project_path(project_id: i64, rest: &str) -> String {
    format!("/api/v1/projects/{project_id}/{rest}")
}

/// Object schema from a `properties` object and the required names
pub(crate) fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Copy of `item` without its `id` key
pub(crate) fn without_id(item: &Map<String, Value>) -> Map<String, Value> {
    item.iter()
        .filter(|(key, _)| key.as_str() != "id")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Register every concrete tool against one backend client
pub async fn register_all_tools(registry: &ToolRegistry, client: Arc<dyn BackendClient>) {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(GetCurrentProjectName::new(Arc::clone(&client))),
        Arc::new(ListRawDocuments::new(Arc::clone(&client))),
        Arc::new(ListRequirementItems::new(Arc::clone(&client))),
        Arc::new(GetRequirementItem::new(Arc::clone(&client))),
        Arc::new(ListManualGroups::new(Arc::clone(&client))),
        Arc::new(UpdateManualCase::new(Arc::clone(&client))),
        Arc::new(UpdateManualCases::new(Arc::clone(&client))),
        Arc::new(CreateReviewItem::new(Arc::clone(&client))),
        Arc::new(ListExecutionTasks::new(Arc::clone(&client))),
        Arc::new(GetExecutionTaskCases::new(Arc::clone(&client))),
        Arc::new(UpdateExecutionCaseResult::new(Arc::clone(&client))),
        Arc::new(ListDefects::new(Arc::clone(&client))),
        Arc::new(UpdateDefects::new(client)),
    ];

    let count = tools.len();
    for tool in tools {
        registry.register(tool).await;
    }
    info!(count, "Registered MCP tools");
}
