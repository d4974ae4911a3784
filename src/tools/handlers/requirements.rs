use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Failure, Outcome, decode, object_schema, project_path, settle};
use crate::client::{BackendClient, Query};
use crate::context::CallContext;
use crate::tools::args::{get_int, to_int};
use crate::tools::{Args, Tool, ToolAnnotations, ToolError, ToolResult};

pub struct ListRequirementItems {
    client: Arc<dyn BackendClient>,
}

impl ListRequirementItems {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    async fn run(&self, ctx: &CallContext, args: &Args) -> Outcome {
        let project_id = get_int(args, "project_id")?;
        let body = self
            .client
            .get(ctx, &project_path(project_id, "requirement-items"), &Query::new())
            .await?;
        Ok(ToolResult::from_body(&body))
    }
}

#[async_trait]
impl Tool for ListRequirementItems {
    fn name(&self) -> &str {
        "list_requirement_items"
    }

    fn description(&self) -> &str {
        "List the AI requirement documents of a project"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({"project_id": {"type": "integer", "description": "Project ID"}}),
            &["project_id"],
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::read_only("List requirement items"))
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx, args).await)
    }
}

#[derive(Debug, Deserialize)]
struct RequirementListing {
    #[serde(default)]
    data: Option<Vec<RequirementEntry>>,
}

#[derive(Debug, Deserialize)]
struct RequirementEntry {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    name: String,
}

/// Fetch one requirement document by `id`, or by exact `name` when no id is given
pub struct GetRequirementItem {
    client: Arc<dyn BackendClient>,
}

impl GetRequirementItem {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    async fn run(&self, ctx: &CallContext, args: &Args) -> Outcome {
        let project_id = get_int(args, "project_id")?;

        let id = if args.contains_key("id") {
            get_int(args, "id")?
        } else if let Some(name) = args.get("name") {
            let name = name
                .as_str()
                .ok_or_else(|| Failure::msg("name must be a string"))?;
            self.find_by_name(ctx, project_id, name).await?
        } else {
            return Err(Failure::msg("either id or name is required"));
        };

        let path = project_path(project_id, &format!("requirement-items/{id}"));
        let body = self.client.get(ctx, &path, &Query::new()).await?;
        Ok(ToolResult::from_body(&body))
    }

    async fn find_by_name(
        &self,
        ctx: &CallContext,
        project_id: i64,
        name: &str,
    ) -> Result<i64, Failure> {
        let listing = self
            .client
            .get(ctx, &project_path(project_id, "requirement-items"), &Query::new())
            .await
            .map_err(|e| Failure::while_doing("failed to list requirement items", e))?;
        let listing: RequirementListing = decode(&listing, "requirement list")?;

        listing
            .data
            .unwrap_or_default()
            .iter()
            .filter(|entry| entry.name == name)
            .find_map(|entry| to_int(&entry.id).filter(|id| *id != 0))
            .ok_or_else(|| Failure::msg(format!("requirement item named '{name}' not found")))
    }
}

#[async_trait]
impl Tool for GetRequirementItem {
    fn name(&self) -> &str {
        "get_requirement_item"
    }

    fn description(&self) -> &str {
        "Get one AI requirement document with the full content of all its chunks, by id or by name"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({
                "project_id": {"type": "integer", "description": "Project ID"},
                "id": {"type": "integer", "description": "Requirement document ID (alternative to name)"},
                "name": {"type": "string", "description": "Requirement document name (alternative to id)"}
            }),
            &["project_id"],
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::read_only("Get requirement item"))
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx, args).await)
    }
}
