use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Outcome, object_schema, project_path, settle, without_id};
use crate::client::{BackendClient, query};
use crate::context::CallContext;
use crate::tools::args::{get_array, get_int, get_object, get_optional_int};
use crate::tools::{Args, BatchLedger, Tool, ToolAnnotations, ToolError, ToolResult};

pub struct ListManualGroups {
    client: Arc<dyn BackendClient>,
}

impl ListManualGroups {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    async fn run(&self, ctx: &CallContext, args: &Args) -> Outcome {
        let project_id = get_int(args, "project_id")?;
        let body = self
            .client
            .get(
                ctx,
                &project_path(project_id, "case-groups"),
                &query([("case_type", "overall")]),
            )
            .await?;
        Ok(ToolResult::from_body(&body))
    }
}

#[async_trait]
impl Tool for ListManualGroups {
    fn name(&self) -> &str {
        "list_manual_groups"
    }

    fn description(&self) -> &str {
        "List the manual test case groups of a project"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({"project_id": {"type": "integer", "description": "Project ID"}}),
            &["project_id"],
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::read_only("List manual case groups"))
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx, args).await)
    }
}

pub struct UpdateManualCase {
    client: Arc<dyn BackendClient>,
}

impl UpdateManualCase {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    async fn run(&self, ctx: &CallContext, args: &Args) -> Outcome {
        let project_id = get_int(args, "project_id")?;
        let id = get_int(args, "id")?;
        let data = get_object(args, "data")?;

        let path = project_path(project_id, &format!("manual-cases/{id}"));
        let body = self
            .client
            .put(ctx, &path, &Value::Object(data.clone()))
            .await?;
        Ok(ToolResult::from_body(&body))
    }
}

#[async_trait]
impl Tool for UpdateManualCase {
    fn name(&self) -> &str {
        "update_manual_case"
    }

    fn description(&self) -> &str {
        "Update one manual test case"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({
                "project_id": {"type": "integer", "description": "Project ID"},
                "id": {"type": "integer", "description": "Case ID"},
                "data": {"type": "object", "description": "Case fields to update"}
            }),
            &["project_id", "id", "data"],
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::write("Update manual case"))
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx, args).await)
    }
}

/// Batch update of manual cases, one PUT per item in input order
pub struct UpdateManualCases {
    client: Arc<dyn BackendClient>,
}

impl UpdateManualCases {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    fn case_path(project_id: i64, group_id: i64, case_id: i64) -> String {
        if group_id > 0 {
            project_path(
                project_id,
                &format!("case-groups/{group_id}/manual-cases/{case_id}"),
            )
        } else {
            project_path(project_id, &format!("manual-cases/{case_id}"))
        }
    }

    async fn run(&self, ctx: &CallContext, args: &Args) -> Outcome {
        let project_id = get_int(args, "project_id")?;
        let group_id = get_optional_int(args, "group_id", 0);
        let cases = get_array(args, "cases")?;

        let mut ledger = BatchLedger::from_args(args, "case_id");
        for (index, item) in cases.iter().enumerate() {
            if ledger.should_stop() {
                break;
            }

            let Some(fields) = item.as_object() else {
                ledger.fail(index, None, "case item must be an object");
                continue;
            };
            let Some(id) = fields.get("id") else {
                ledger.fail(index, None, "id field is required");
                continue;
            };
            let Some(case_id) = id.as_i64().or_else(|| integral(id)) else {
                ledger.fail(index, None, "id must be an integer");
                continue;
            };

            // empty and null values are sent as-is so fields can be cleared
            let update = Value::Object(without_id(fields));
            let path = Self::case_path(project_id, group_id, case_id);
            match self.client.put(ctx, &path, &update).await {
                Ok(_) => ledger.succeed(index, Some(json!(case_id))),
                Err(err) => ledger.fail(index, Some(json!(case_id)), err.to_string()),
            }
        }

        Ok(ledger.into_result())
    }
}

/// Integral JSON float as an integer; strings are not accepted for item ids
fn integral(value: &Value) -> Option<i64> {
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0)
        .map(|f| f as i64)
}

#[async_trait]
impl Tool for UpdateManualCases {
    fn name(&self) -> &str {
        "update_manual_cases"
    }

    fn description(&self) -> &str {
        "Update several manual test cases. Every field except the UUID may be changed \
         (case_number, case_group, major/middle/minor_function_cn/jp/en, precondition_cn/jp/en, \
         test_steps_cn/jp/en, expected_result_cn/jp/en, test_result, remark, ...). \
         Pass group_id to update through the case group."
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({
                "project_id": {"type": "integer", "description": "Project ID"},
                "group_id": {
                    "type": "integer",
                    "description": "Case group ID (optional but recommended)"
                },
                "cases": {
                    "type": "array",
                    "description": "Cases to update; each element needs an integer id, other fields are optional",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "integer", "description": "Case ID (required)"},
                            "case_number": {"type": "string", "description": "Case number (optional)"}
                        },
                        "required": ["id"]
                    }
                },
                "continue_on_error": {
                    "type": "boolean",
                    "description": "Keep going after a failed item (default: true)"
                }
            }),
            &["project_id", "cases"],
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::write("Update manual cases"))
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx, args).await)
    }
}
