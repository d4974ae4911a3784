use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use super::loader::{LoaderError, read_body};
use super::{PromptArgument, PromptMetadata, PromptScope};

#[derive(Debug)]
struct CacheState {
    content: Option<String>,
    updated_at: DateTime<Utc>,
}

/// File-sourced prompt whose body is read on first use
#[derive(Debug)]
pub struct SystemPrompt {
    pub name: String,
    pub description: String,
    pub version: String,
    pub arguments: Vec<PromptArgument>,
    pub file_path: PathBuf,
    /// Modification time of the source file when it was parsed
    pub modified: Option<SystemTime>,
    state: Mutex<CacheState>,
}

/// Next timestamp after `previous`, never equal to it
fn advance(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}

impl SystemPrompt {
    pub fn new(name: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: String::new(),
            arguments: Vec::new(),
            file_path: file_path.into(),
            modified: None,
            state: Mutex::new(CacheState {
                content: None,
                updated_at: Utc::now(),
            }),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_arguments(mut self, arguments: Vec<PromptArgument>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Prompt body, read from the source file on first call and cached
    pub async fn content(&self) -> Result<String, LoaderError> {
        let mut state = self.state.lock().await;
        if let Some(content) = &state.content {
            return Ok(content.clone());
        }

        debug!(prompt = %self.name, path = %self.file_path.display(), "Loading prompt body");
        let body = read_body(&self.file_path).await?;
        state.content = Some(body.clone());
        Ok(body)
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.content.is_some()
    }

    /// Drop the cached body and advance `updated_at`
    pub async fn invalidate_cache(&self) {
        let mut state = self.state.lock().await;
        state.content = None;
        state.updated_at = advance(state.updated_at);
    }

    pub async fn updated_at(&self) -> DateTime<Utc> {
        self.state.lock().await.updated_at
    }

    pub async fn metadata(&self) -> PromptMetadata {
        PromptMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            arguments: self.arguments.clone(),
            updated_at: self.updated_at().await.timestamp(),
            scope: PromptScope::System,
        }
    }

    /// Copy carrying new metadata with an empty cache and a later `updated_at`
    pub(crate) async fn revised(
        &self,
        description: String,
        version: String,
        arguments: Vec<PromptArgument>,
        modified: Option<SystemTime>,
    ) -> Self {
        let updated_at = advance(self.updated_at().await);
        Self {
            name: self.name.clone(),
            description,
            version,
            arguments,
            file_path: self.file_path.clone(),
            modified,
            state: Mutex::new(CacheState {
                content: None,
                updated_at,
            }),
        }
    }
}
