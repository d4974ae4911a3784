use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{Failure, Outcome, decode, object_schema, project_path, settle};
use crate::client::{BackendClient, Query};
use crate::context::CallContext;
use crate::tools::args::get_int;
use crate::tools::{Args, Tool, ToolAnnotations, ToolError, ToolResult};

const COMPLETED: &str = "completed";

#[derive(Debug, Deserialize)]
struct DocumentsResponse {
    #[serde(default)]
    data: Option<DocumentsPage>,
}

#[derive(Debug, Deserialize)]
struct DocumentsPage {
    #[serde(default)]
    documents: Vec<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    project_id: Value,
    #[serde(default)]
    convert_status: Option<String>,
    #[serde(default)]
    converted_filename: Option<String>,
    #[serde(default)]
    converted_file_size: Value,
    #[serde(default)]
    converted_time: Value,
    #[serde(default)]
    original_filename: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConvertedDocument {
    id: Value,
    project_id: Value,
    converted_filename: String,
    converted_file_size: Value,
    converted_time: Value,
    original_filename: String,
}

#[derive(Debug, Serialize)]
struct ConvertedListing {
    documents: Vec<ConvertedDocument>,
    total: usize,
}

impl From<RawDocument> for ConvertedDocument {
    fn from(doc: RawDocument) -> Self {
        Self {
            id: doc.id,
            project_id: doc.project_id,
            converted_filename: doc.converted_filename.unwrap_or_default(),
            converted_file_size: doc.converted_file_size,
            converted_time: doc.converted_time,
            original_filename: doc.original_filename.unwrap_or_default(),
        }
    }
}

/// Only documents whose conversion completed are listed
pub struct ListRawDocuments {
    client: Arc<dyn BackendClient>,
}

impl ListRawDocuments {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    async fn run(&self, ctx: &CallContext, args: &Args) -> Outcome {
        let project_id = get_int(args, "project_id")?;
        let body = self
            .client
            .get(ctx, &project_path(project_id, "raw-documents"), &Query::new())
            .await?;
        let response: DocumentsResponse = decode(&body, "response")?;

        let documents: Vec<ConvertedDocument> = response
            .data
            .map(|page| page.documents)
            .unwrap_or_default()
            .into_iter()
            .filter(|doc| doc.convert_status.as_deref() == Some(COMPLETED))
            .map(ConvertedDocument::from)
            .collect();

        let listing = ConvertedListing {
            total: documents.len(),
            documents,
        };
        let text = serde_json::to_string(&listing)
            .map_err(|e| Failure::msg(format!("failed to encode result: {e}")))?;
        Ok(ToolResult::Json(text))
    }
}

#[async_trait]
impl Tool for ListRawDocuments {
    fn name(&self) -> &str {
        "list_raw_documents"
    }

    fn description(&self) -> &str {
        "List the project's documents whose conversion has completed"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({"project_id": {"type": "integer", "description": "Project ID"}}),
            &["project_id"],
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::read_only("List raw documents"))
    }

    async fn execute(&self, ctx: &CallContext, args: &Args) -> Result<ToolResult, ToolError> {
        settle(self.run(ctx, args).await)
    }
}
