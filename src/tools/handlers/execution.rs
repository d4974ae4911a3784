use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{Failure, Outcome, decode, object_schema, project_path, settle};
use crate::client::{BackendClient, Query, query};
use crate::context::CallContext;
use crate::tools::args::{
    get_int, get_optional_int, get_optional_string, get_string, to_int, to_string,
};
use crate::tools::{Args, TaskRef, TaskSummary, Tool, ToolAnnotations, ToolError, ToolResult};

const RESULT_VALUES: [&str; 4] = ["NR", "OK", "NG", "Block"];
const DEFAULT_PROJECT_ID: i64 = 1;

const TASK_ID_DESCRIPTION: &str = "Execution task reference: a task name (e.g. qweb), a task UUID, \
or a 1-based index into the project's task list (e.g. '1' for the first task)";

pub struct ListExecutionTasks {
    client: Arc<dyn BackendClient>,
}

impl ListExecutionTasks {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    async fn run(&self, ctx: &CallContext, args: &Args) -> Outcome {
        let project_id = get_int(args, "project_id")?;
        let query: Query = get_optional_string(args, "status")
            .map(|status| query([("status", status)]))
            .unwrap_or_default();

        let body = self
            .client
            .get(ctx, &project_path(project_id, "execution-tasks"), &query)
            .await?;
        Ok(ToolResult::from_body(&body))
    }
}

#[async_trait]
impl Tool for ListExecutionTasks {
    fn name(&self) -> &str {
        "list_execution_tasks"
    }

    fn description(&self) -> &str {
        "List the execution tasks of a project"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({
                "project_id": {"type": "integer", "description": "Project ID"},
                "status": {"type": "string", "description": "Task status filter (optional)"}
            }),
            &["project_id"],
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::read_only("List execution tasks"))
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx, args).await)
    }
}

#[derive(Debug, Deserialize)]
struct TaskListResponse {
    #[serde(default)]
    data: Option<Vec<TaskSummary>>,
}

pub struct GetExecutionTaskCases {
    client: Arc<dyn BackendClient>,
}

impl GetExecutionTaskCases {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    async fn run(&self, ctx: &CallContext, args: &Args) -> Outcome {
        let reference = args
            .get("task_id")
            .map(TaskRef::parse)
            .ok_or_else(|| Failure::msg("task_id parameter is required"))?;
        let project_id = get_optional_int(args, "project_id", DEFAULT_PROJECT_ID);

        let listing = self
            .client
            .get(ctx, &project_path(project_id, "execution-tasks"), &Query::new())
            .await
            .map_err(|e| Failure::while_doing("failed to list execution tasks", e))?;
        let tasks: TaskListResponse = decode(&listing, "task list")?;

        let tasks = tasks.data.unwrap_or_default();
        let task = reference
            .resolve(&tasks, project_id)
            .map_err(Failure::Message)?;

        let path = format!("/api/v1/execution-tasks/{}/case-results", task.task_uuid);
        let body = self
            .client
            .get(ctx, &path, &query([("size", "99999")]))
            .await
            .map_err(|e| Failure::while_doing("failed to get case results", e))?;
        Ok(ToolResult::from_body(&body))
    }
}

#[async_trait]
impl Tool for GetExecutionTaskCases {
    fn name(&self) -> &str {
        "get_execution_task_cases"
    }

    fn description(&self) -> &str {
        "Get every case result of an execution task, addressed by name, UUID or index"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({
                "task_id": {"type": "string", "description": TASK_ID_DESCRIPTION},
                "project_id": {"type": "integer", "description": "Project ID (optional, defaults to 1)"}
            }),
            &["task_id"],
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::read_only("Get execution task cases"))
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx, args).await)
    }
}

/// Record the optional annotation fields of a case result update.
/// `remark` takes precedence over `comment`; both map to `comment`.
fn copy_optional_fields(source: &Map<String, Value>, target: &mut Map<String, Value>) {
    let text = |key: &str| {
        source
            .get(key)
            .and_then(to_string)
            .filter(|s| !s.is_empty())
    };

    if let Some(comment) = text("remark").or_else(|| text("comment")) {
        target.insert("comment".to_string(), Value::String(comment));
    }
    for key in ["bug_id", "response_time"] {
        if let Some(value) = text(key) {
            target.insert(key.to_string(), Value::String(value));
        }
    }
}

/// Single update through `id` + `result`, or a server-side batch through `updates`
pub struct UpdateExecutionCaseResult {
    client: Arc<dyn BackendClient>,
}

impl UpdateExecutionCaseResult {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    async fn run(&self, ctx: &CallContext, args: &Args) -> Outcome {
        match args.get("updates") {
            Some(updates) if !updates.is_null() => self.update_batch(ctx, updates).await,
            _ => self.update_single(ctx, args).await,
        }
    }

    async fn update_single(&self, ctx: &CallContext, args: &Args) -> Outcome {
        let id = get_int(args, "id")
            .map_err(|e| Failure::msg(format!("single update requires id: {e}")))?;
        let result = get_string(args, "result")
            .map_err(|e| Failure::msg(format!("single update requires result: {e}")))?;

        let mut body = Map::new();
        body.insert("result".to_string(), Value::String(result));
        copy_optional_fields(args, &mut body);

        let path = format!("/api/v1/execution-task-cases/{id}");
        let response = self.client.put(ctx, &path, &Value::Object(body)).await?;
        Ok(ToolResult::from_body(&response))
    }

    async fn update_batch(&self, ctx: &CallContext, updates: &Value) -> Outcome {
        let items = updates
            .as_array()
            .ok_or_else(|| Failure::msg("updates must be an array"))?;
        if items.is_empty() {
            return Err(Failure::msg("updates array must not be empty"));
        }

        // every item is checked before anything is sent
        let mut batch = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let fields = item
                .as_object()
                .ok_or_else(|| Failure::msg(format!("updates[{i}] must be an object")))?;
            let id = fields
                .get("id")
                .ok_or_else(|| Failure::msg(format!("updates[{i}] is missing id")))?;
            let id = to_int(id)
                .ok_or_else(|| Failure::msg(format!("updates[{i}].id is not an integer: {id}")))?;
            let result = fields
                .get("result")
                .ok_or_else(|| Failure::msg(format!("updates[{i}] is missing result")))?
                .as_str()
                .ok_or_else(|| Failure::msg(format!("updates[{i}].result must be a string")))?;

            let mut update = Map::new();
            update.insert("id".to_string(), json!(id));
            update.insert("result".to_string(), json!(result));
            copy_optional_fields(fields, &mut update);
            batch.push(Value::Object(update));
        }

        let response = self
            .client
            .put(ctx, "/api/v1/execution-task-cases/batch", &Value::Array(batch))
            .await?;
        Ok(ToolResult::from_body(&response))
    }
}

#[async_trait]
impl Tool for UpdateExecutionCaseResult {
    fn name(&self) -> &str {
        "update_execution_case_result"
    }

    fn description(&self) -> &str {
        "Record the result of one execution case, or of many through the updates array"
    }

    fn input_schema(&self) -> Value {
        let result = json!({
            "type": "string",
            "description": "Execution result: NR (not run), OK (passed), NG (failed), Block (blocked)",
            "enum": RESULT_VALUES,
        });
        object_schema(
            json!({
                "id": {"type": "integer", "description": "Execution case record ID (single update)"},
                "result": result,
                "comment": {"type": "string", "description": "Execution note (optional, same as remark)"},
                "remark": {"type": "string", "description": "Execution note (optional, same as comment)"},
                "bug_id": {"type": "string", "description": "Linked defect ID (optional)"},
                "response_time": {"type": "string", "description": "Response time (optional, e.g. 125ms, 1.5s)"},
                "updates": {
                    "type": "array",
                    "description": "Batch of updates; each element holds id, result and optional comment/remark/bug_id/response_time",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "integer"},
                            "result": result,
                            "comment": {"type": "string"},
                            "remark": {"type": "string"},
                            "bug_id": {"type": "string"},
                            "response_time": {"type": "string"}
                        },
                        "required": ["id", "result"]
                    }
                }
            }),
            &[],
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::write("Update execution case result"))
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx, args).await)
    }
}
