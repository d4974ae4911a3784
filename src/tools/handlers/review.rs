use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Failure, Outcome, decode, object_schema, project_path, settle};
use crate::client::BackendClient;
use crate::context::CallContext;
use crate::tools::args::{get_int, get_optional_string, get_string};
use crate::tools::{Args, Tool, ToolAnnotations, ToolError, ToolResult};

#[derive(Debug, Deserialize)]
struct Created {
    #[serde(default)]
    id: u64,
}

/// Create a review item, then write its content when one is given
pub struct CreateReviewItem {
    client: Arc<dyn BackendClient>,
}

impl CreateReviewItem {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    async fn run(&self, ctx: &CallContext, args: &Args) -> Outcome {
        let project_id = get_int(args, "project_id")?;
        let name = get_string(args, "name")?;

        let created = self
            .client
            .post(ctx, &project_path(project_id, "review-items"), &json!({"name": name}))
            .await
            .map_err(|e| Failure::while_doing("failed to create review item", e))?;
        let item: Created = decode(&created, "create response")?;

        let Some(content) = get_optional_string(args, "content") else {
            return Ok(ToolResult::from_body(&created));
        };

        let path = project_path(project_id, &format!("review-items/{}", item.id));
        let updated = self
            .client
            .put(ctx, &path, &json!({"content": content}))
            .await
            .map_err(|e| Failure::while_doing("review item created but writing content failed", e))?;
        Ok(ToolResult::from_body(&updated))
    }
}

#[async_trait]
impl Tool for CreateReviewItem {
    fn name(&self) -> &str {
        "create_review_item"
    }

    fn description(&self) -> &str {
        "Create a test case review document and write its review content"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({
                "project_id": {"type": "integer", "description": "Project ID"},
                "name": {"type": "string", "description": "Review item name"},
                "content": {"type": "string", "description": "Review content in Markdown (optional)"}
            }),
            &["project_id", "name"],
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::write("Create review item"))
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx, args).await)
    }
}
