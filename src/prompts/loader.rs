//! `*.prompt.md` parsing
//!
//! A prompt file starts with a YAML front-matter block between two `---`
//! lines, followed by the Markdown body:
//!
//! ```markdown
//! ---
//! name: review-checklist
//! description: Checklist for reviewing test cases
//! version: "1.2"
//! arguments:
//!   - name: module
//!     description: Module under review
//!     required: true
//! ---
//!
//! Review the cases of {{module}} ...
//! ```
//!
//! Loading reads only the front matter. The body is read by
//! [`SystemPrompt::content`] on first use.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::registry::{PromptUpdate, PromptsRegistry};
use super::{PromptArgument, SystemPrompt};

/// File name suffix of prompt files
pub const PROMPT_SUFFIX: &str = ".prompt.md";

#[derive(Error, Diagnostic, Debug)]
pub enum LoaderError {
    #[error("failed to read prompts directory {path}")]
    #[diagnostic(
        code(webtest_mcp::prompts::read_dir),
        help("Check prompts.dir, PROMPTS_DIR or --prompts-dir.")
    )]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read prompt file {path}")]
    #[diagnostic(code(webtest_mcp::prompts::read_file))]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("missing YAML front matter")]
    #[diagnostic(
        code(webtest_mcp::prompts::missing_front_matter),
        help("The first line of a prompt file must be `---`.")
    )]
    MissingFrontMatter,

    #[error("front matter is not closed by a `---` line")]
    #[diagnostic(code(webtest_mcp::prompts::unclosed_front_matter))]
    UnclosedFrontMatter,

    #[error("invalid YAML front matter: {0}")]
    #[diagnostic(code(webtest_mcp::prompts::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("missing required field: name")]
    #[diagnostic(code(webtest_mcp::prompts::missing_name))]
    MissingName,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    name: String,
    description: String,
    version: String,
    arguments: Vec<serde_yaml::Value>,
}

/// Split file content into `(front_matter, body)`
///
/// Accepts LF and CRLF line endings. The body is trimmed.
pub fn split_front_matter(content: &str) -> Result<(String, String), LoaderError> {
    let lines: Vec<&str> = content.lines().collect();

    if lines.first().map(|line| line.trim()) != Some("---") {
        return Err(LoaderError::MissingFrontMatter);
    }

    let closing = lines
        .iter()
        .skip(1)
        .position(|line| line.trim() == "---")
        .ok_or(LoaderError::UnclosedFrontMatter)?
        + 1;

    let front_matter = lines[1..closing].join("\n");
    let body = lines[closing + 1..].join("\n").trim().to_string();
    Ok((front_matter, body))
}

/// Argument entries without a name are dropped; wrongly typed fields fall
/// back to their defaults.
fn parse_arguments(raw: &[serde_yaml::Value]) -> Vec<PromptArgument> {
    raw.iter()
        .filter_map(|entry| {
            let name = entry.get("name").and_then(serde_yaml::Value::as_str)?;
            if name.is_empty() {
                return None;
            }
            Some(PromptArgument {
                name: name.to_string(),
                description: entry
                    .get("description")
                    .and_then(serde_yaml::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                required: entry
                    .get("required")
                    .and_then(serde_yaml::Value::as_bool)
                    .unwrap_or(false),
            })
        })
        .collect()
}

async fn read_file(path: &Path) -> Result<String, LoaderError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoaderError::ReadFile {
            path: path.display().to_string(),
            source,
        })
}

/// Trimmed Markdown body of a prompt file
pub(crate) async fn read_body(path: &Path) -> Result<String, LoaderError> {
    let content = read_file(path).await?;
    let (_, body) = split_front_matter(&content)?;
    Ok(body)
}

/// Outcome of a full directory load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub failed: usize,
}

/// Names touched by a rescan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub failed: usize,
}

impl ReloadSummary {
    /// Whether the listing visible to clients changed
    pub fn changed(&self) -> bool {
        !(self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty())
    }
}

/// Scans a directory for prompt files and feeds the registry
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptLoader;

impl PromptLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse the front matter of one file into an unloaded prompt
    pub async fn parse_file(&self, path: &Path) -> Result<SystemPrompt, LoaderError> {
        let content = read_file(path).await?;
        let (front_matter, _) = split_front_matter(&content)?;

        if front_matter.trim().is_empty() {
            return Err(LoaderError::MissingName);
        }
        let parsed: FrontMatter = serde_yaml::from_str(&front_matter)?;
        if parsed.name.trim().is_empty() {
            return Err(LoaderError::MissingName);
        }

        let modified = tokio::fs::metadata(path)
            .await
            .ok()
            .and_then(|meta| meta.modified().ok());

        Ok(SystemPrompt::new(parsed.name.trim(), path)
            .with_description(parsed.description)
            .with_version(parsed.version)
            .with_arguments(parse_arguments(&parsed.arguments))
            .with_modified(modified))
    }

    /// Register every parseable prompt file in `dir`
    ///
    /// An unreadable directory is an error. Files that fail to parse are
    /// logged and skipped. When two files declare the same name the first
    /// path in sorted order wins.
    pub async fn load_all(
        &self,
        dir: &Path,
        registry: &PromptsRegistry,
    ) -> Result<LoadSummary, LoaderError> {
        let files = prompt_files(dir).await?;
        debug!(dir = %dir.display(), files = files.len(), "Scanning prompts directory");

        let mut summary = LoadSummary::default();
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();
        for path in files {
            match self.parse_file(&path).await {
                Ok(prompt) if is_shadowed(&mut claimed, &prompt) => {}
                Ok(prompt) => {
                    debug!(prompt = %prompt.name, path = %path.display(), "Registered prompt");
                    registry.register(prompt).await;
                    summary.loaded += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping prompt file");
                    summary.failed += 1;
                }
            }
        }

        registry.mark_reloaded().await;
        info!(
            dir = %dir.display(),
            loaded = summary.loaded,
            failed = summary.failed,
            "Loaded system prompts"
        );
        Ok(summary)
    }

    /// Rescan `dir` and bring the registry in line with it
    ///
    /// Prompts whose file now fails to parse are left registered as they
    /// were. Duplicate names resolve as in [`PromptLoader::load_all`].
    pub async fn reload(
        &self,
        dir: &Path,
        registry: &PromptsRegistry,
    ) -> Result<ReloadSummary, LoaderError> {
        let files = prompt_files(dir).await?;

        let mut summary = ReloadSummary::default();
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();
        let mut broken: HashSet<PathBuf> = HashSet::new();

        for path in files {
            let parsed = match self.parse_file(&path).await {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping prompt file");
                    summary.failed += 1;
                    broken.insert(path);
                    continue;
                }
            };
            if is_shadowed(&mut claimed, &parsed) {
                continue;
            }
            let name = parsed.name.clone();

            match registry.get(&name).await {
                None => {
                    registry.register(parsed).await;
                    summary.added.push(name);
                }
                Some(current) if current.file_path != parsed.file_path => {
                    registry.register(parsed).await;
                    summary.updated.push(name);
                }
                Some(current) if differs(&current, &parsed) => {
                    let update = PromptUpdate {
                        description: parsed.description,
                        version: parsed.version,
                        arguments: parsed.arguments,
                        modified: parsed.modified,
                    };
                    registry.update(&name, update).await;
                    summary.updated.push(name);
                }
                Some(_) => {}
            }
        }

        for name in registry.names().await {
            if claimed.contains_key(&name) {
                continue;
            }
            let Some(prompt) = registry.get(&name).await else {
                continue;
            };
            if prompt.file_path.starts_with(dir) && !broken.contains(&prompt.file_path) {
                registry.unregister(&name).await;
                summary.removed.push(name);
            }
        }

        registry.mark_reloaded().await;
        info!(
            added = summary.added.len(),
            updated = summary.updated.len(),
            removed = summary.removed.len(),
            failed = summary.failed,
            "Reloaded system prompts"
        );
        Ok(summary)
    }
}

/// Claim `prompt.name` for its file; false if an earlier file holds it
fn is_shadowed(claimed: &mut HashMap<String, PathBuf>, prompt: &SystemPrompt) -> bool {
    match claimed.get(&prompt.name) {
        Some(owner) => {
            warn!(
                prompt = %prompt.name,
                path = %prompt.file_path.display(),
                owner = %owner.display(),
                "Duplicate prompt name, keeping the first file"
            );
            true
        }
        None => {
            claimed.insert(prompt.name.clone(), prompt.file_path.clone());
            false
        }
    }
}

fn differs(current: &SystemPrompt, parsed: &SystemPrompt) -> bool {
    current.description != parsed.description
        || current.version != parsed.version
        || current.arguments != parsed.arguments
        || current.modified != parsed.modified
}

/// Prompt files directly inside `dir`, sorted by path
async fn prompt_files(dir: &Path) -> Result<Vec<PathBuf>, LoaderError> {
    let read_dir_error = |source| LoaderError::ReadDir {
        path: dir.display().to_string(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_dir_error)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_dir_error)? {
        let is_file = entry
            .file_type()
            .await
            .map(|kind| kind.is_file())
            .unwrap_or(false);
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(PROMPT_SUFFIX));
        if is_file && matches {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
