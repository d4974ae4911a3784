//! MCP prompts
//!
//! Three scopes feed `prompts/list` and `prompts/get`:
//! - `system`: `*.prompt.md` files loaded into the [`PromptsRegistry`]
//! - `project`: shared prompts served by the backend without auth
//! - `user`: the caller's private prompts, needing a resolved identity
//!
//! File-sourced prompts keep only metadata in memory until their body is
//! first requested; a reload invalidates the cached body.

mod handler;
mod loader;
mod notifier;
mod registry;
mod system_prompt;

#[cfg(test)]
mod handler_test;

use serde::{Deserialize, Serialize};

pub use handler::{
    PromptContent, PromptGetResponse, PromptListResponse, PromptMessage, PromptsHandler,
    apply_arguments,
};
pub use loader::{
    LoadSummary, LoaderError, PROMPT_SUFFIX, PromptLoader, ReloadSummary, split_front_matter,
};
pub use notifier::{NotifyError, Notifier, PROMPTS_LIST_CHANGED};
pub use registry::{PromptUpdate, PromptsRegistry};
pub use system_prompt::SystemPrompt;

/// Argument a prompt accepts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptScope {
    System,
    Project,
    User,
}

impl PromptScope {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptScope::System => "system",
            PromptScope::Project => "project",
            PromptScope::User => "user",
        }
    }
}

/// Listing entry for one prompt, without its body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMetadata {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgument>,
    /// Unix seconds; 0 when unknown
    #[serde(skip_serializing_if = "is_zero")]
    pub updated_at: i64,
    pub scope: PromptScope,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}
