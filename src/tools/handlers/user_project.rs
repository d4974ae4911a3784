//! Current project of the calling user
//!
//! Resolution takes three backend calls: the caller's identity, their
//! selected project id, and the list of projects they belong to.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{Failure, Outcome, decode, object_schema, settle};
use crate::client::{BackendClient, Query};
use crate::context::CallContext;
use crate::tools::args::to_int;
use crate::tools::{Args, Tool, ToolAnnotations, ToolError, ToolResult};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn check(self, step: &str) -> Result<Option<T>, Failure> {
        if self.code == 0 {
            return Ok(self.data);
        }
        Err(match self.message {
            Some(message) => Failure::msg(format!("{step}: {message}")),
            None => Failure::msg(step.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CurrentProject {
    #[serde(default)]
    project_id: Value,
}

pub struct GetCurrentProjectName {
    client: Arc<dyn BackendClient>,
}

impl GetCurrentProjectName {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        ctx: &CallContext,
        path: &str,
        step: &str,
        what: &str,
    ) -> Result<Envelope<T>, Failure> {
        let body = self
            .client
            .get(ctx, path, &Query::new())
            .await
            .map_err(|e| Failure::while_doing(step, e))?;
        decode(&body, what)
    }

    async fn run(&self, ctx: &CallContext) -> Outcome {
        let user: Envelope<Value> = self
            .fetch(ctx, "/api/v1/auth/me", "failed to get current user", "user info")
            .await?;
        if user.code != 0 {
            return Err(Failure::msg("failed to get user info"));
        }

        let current: Envelope<CurrentProject> = self
            .fetch(
                ctx,
                "/api/v1/profile/current-project",
                "failed to get current project id",
                "project id response",
            )
            .await?;
        let project_id = current
            .check("failed to get project id")?
            .and_then(|data| to_int(&data.project_id))
            .unwrap_or(0);

        if project_id == 0 {
            return Ok(ToolResult::json(&json!({
                "project_id": 0,
                "name": "",
                "message": "no current project selected"
            })));
        }

        let projects: Envelope<Vec<Map<String, Value>>> = self
            .fetch(
                ctx,
                "/api/v1/projects",
                "failed to get projects list",
                "projects response",
            )
            .await?;
        let projects = projects
            .check("failed to get projects list")?
            .unwrap_or_default();

        let current = projects
            .into_iter()
            .find(|project| project.get("id").and_then(to_int) == Some(project_id));

        Ok(match current {
            Some(project) => ToolResult::json(&Value::Object(project)),
            None => ToolResult::json(&json!({
                "project_id": project_id,
                "name": "unknown project",
                "message": "project exists but current user is not a member"
            })),
        })
    }
}

#[async_trait]
impl Tool for GetCurrentProjectName {
    fn name(&self) -> &str {
        "get_current_project_name"
    }

    fn description(&self) -> &str {
        "Get the name and details of the project the current user has selected"
    }

    fn input_schema(&self) -> Value {
        object_schema(json!({}), &[])
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::read_only("Current project"))
    }

    async fn execute(&self, ctx: &CallContext, _args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx).await)
    }
}
