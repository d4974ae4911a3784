use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::{Args, SchemaValidator, Tool, ToolDefinition, ToolError, ToolResult};
use crate::context::CallContext;

pub const EMPTY_RESULT_TEXT: &str = "Tool completed but returned no content";

/// Name-keyed tool table shared by every request
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
    validator: SchemaValidator,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a later registration under the same name replaces the earlier one
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.write().await.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "Replaced existing tool");
        }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    pub async fn has(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    pub async fn count(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Definitions of every tool, sorted by name
    pub async fn list(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .read()
            .await
            .values()
            .map(|tool| tool.definition())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Validate `args` and run the named tool
    ///
    /// Unknown tools and schema violations produce an error-flavoured
    /// result. The lock is released before the tool runs.
    #[instrument(skip(self, ctx, args), fields(tool = %name))]
    pub async fn execute(
        &self,
        ctx: &CallContext,
        name: &str,
        args: &Args,
    ) -> Result<ToolResult, ToolError> {
        let Some(tool) = self.get(name).await else {
            warn!("Unknown tool requested");
            return Ok(ToolResult::error(format!("unknown tool: {name}")));
        };

        if let Err(err) = self.validator.validate(&tool.input_schema(), args) {
            debug!(field = %err.field, "Argument validation failed");
            return Ok(ToolResult::error(err.to_string()));
        }

        let result = tool.execute(ctx, args).await?;
        if result.is_error() {
            info!(error = %result.content_text(), "Tool reported an error");
        } else {
            debug!("Tool completed");
        }

        if !result.is_error() && result.is_empty() {
            return Ok(ToolResult::text(EMPTY_RESULT_TEXT));
        }
        Ok(result)
    }
}
