use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Failure, Outcome, object_schema, project_path, settle, without_id};
use crate::client::{BackendClient, Query};
use crate::context::CallContext;
use crate::tools::args::{collect_strings, get_int, get_optional_string, to_int};
use crate::tools::{Args, BatchLedger, Tool, ToolAnnotations, ToolError, ToolResult};

/// Fields a single defect update may carry
const UPDATE_FIELDS: [&str; 5] = ["status", "severity", "assignee", "comment", "description"];

/// Defect ids are zero-padded to six digits in the REST path
fn defect_path(project_id: i64, defect_id: i64) -> String {
    project_path(project_id, &format!("defects/{defect_id:06}"))
}

pub struct ListDefects {
    client: Arc<dyn BackendClient>,
}

impl ListDefects {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    async fn run(&self, ctx: &CallContext, args: &Args) -> Outcome {
        let project_id = get_int(args, "project_id")?;

        let mut query = Query::new();
        query.insert("size".to_string(), "99999".to_string());
        for key in ["status", "severity"] {
            if let Some(value) = get_optional_string(args, key) {
                query.insert(key.to_string(), value);
            }
        }

        let body = self
            .client
            .get(ctx, &project_path(project_id, "defects"), &query)
            .await?;
        Ok(ToolResult::from_body(&body))
    }
}

#[async_trait]
impl Tool for ListDefects {
    fn name(&self) -> &str {
        "list_defects"
    }

    fn description(&self) -> &str {
        "List the defects of a project, optionally filtered by status and severity"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({
                "project_id": {"type": "integer", "description": "Project ID"},
                "status": {"type": "string", "description": "Defect status filter (optional)"},
                "severity": {"type": "string", "description": "Severity filter (optional)"}
            }),
            &["project_id"],
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::read_only("List defects"))
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx, args).await)
    }
}

/// Update one defect by `id`, or many through a `defects` array
pub struct UpdateDefects {
    client: Arc<dyn BackendClient>,
}

impl UpdateDefects {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    async fn run(&self, ctx: &CallContext, args: &Args) -> Outcome {
        let project_id = get_int(args, "project_id")?;

        // a batch wins when both forms are present
        if let Some(defects) = args.get("defects") {
            return self.update_batch(ctx, project_id, defects, args).await;
        }
        if let Some(id) = args.get("id") {
            return self.update_single(ctx, project_id, id, args).await;
        }
        Err(Failure::msg(
            "either 'id' (single update) or 'defects' (batch update) is required",
        ))
    }

    async fn update_single(
        &self,
        ctx: &CallContext,
        project_id: i64,
        id: &Value,
        args: &Args,
    ) -> Outcome {
        let defect_id =
            to_int(id).ok_or_else(|| Failure::msg(format!("invalid defect id: {id}")))?;

        let body = collect_strings(args, &UPDATE_FIELDS);
        if body.is_empty() {
            return Err(Failure::msg("at least one field to update is required"));
        }

        let response = self
            .client
            .put(ctx, &defect_path(project_id, defect_id), &Value::Object(body))
            .await?;
        Ok(ToolResult::from_body(&response))
    }

    async fn update_batch(
        &self,
        ctx: &CallContext,
        project_id: i64,
        defects: &Value,
        args: &Args,
    ) -> Outcome {
        let items = defects
            .as_array()
            .ok_or_else(|| Failure::msg("defects must be an array"))?;
        if items.is_empty() {
            return Err(Failure::msg("defects array must not be empty"));
        }

        let mut ledger = BatchLedger::from_args(args, "defect_id");
        for (index, item) in items.iter().enumerate() {
            if ledger.should_stop() {
                break;
            }

            let Some(fields) = item.as_object() else {
                ledger.fail(index, None, "defect item must be an object");
                continue;
            };
            let Some(defect_id) = fields.get("id").and_then(to_int) else {
                ledger.fail(index, None, "defect item requires an integer 'id'");
                continue;
            };

            let update = without_id(fields);
            if update.is_empty() {
                ledger.fail(
                    index,
                    Some(json!(defect_id)),
                    "at least one field to update is required",
                );
                continue;
            }

            match self
                .client
                .put(ctx, &defect_path(project_id, defect_id), &Value::Object(update))
                .await
            {
                Ok(_) => ledger.succeed(index, Some(json!(defect_id))),
                Err(err) => ledger.fail(index, Some(json!(defect_id)), err.to_string()),
            }
        }

        Ok(ledger.into_result())
    }
}

#[async_trait]
impl Tool for UpdateDefects {
    fn name(&self) -> &str {
        "update_defects"
    }

    fn description(&self) -> &str {
        "Update a single defect by id, or several defects at once through the defects array"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({
                "project_id": {"type": "integer", "description": "Project ID"},
                "id": {
                    "type": "integer",
                    "description": "Single defect ID (alternative to defects); a number like 30 or a padded string like '000030'"
                },
                "status": {"type": "string", "description": "Defect status (single update)"},
                "severity": {"type": "string", "description": "Severity (single update)"},
                "assignee": {"type": "string", "description": "Assignee (single update)"},
                "comment": {"type": "string", "description": "Comment (single update)"},
                "description": {
                    "type": "string",
                    "description": "Detailed multi-line description with actual result, steps and expected result (single update)"
                },
                "defects": {
                    "type": "array",
                    "description": "Defects to update (alternative to id); each object carries its id plus the fields to change",
                    "items": {"type": "object"}
                },
                "continue_on_error": {
                    "type": "boolean",
                    "description": "Keep going after a failed item (default: true)"
                }
            }),
            &["project_id"],
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::write("Update defects"))
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx, args).await)
    }
}
