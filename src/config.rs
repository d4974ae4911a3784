//! Server configuration
//!
//! Loaded from an optional YAML file, then overridden by `MCP_*` environment
//! variables, then validated. A missing file is not an error; defaults apply.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serde_utils::{self, parse_duration};

pub const DEFAULT_CONFIG_PATH: &str = "config/mcp-server.yaml";

const VALID_LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    #[diagnostic(code(webtest_mcp::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    #[diagnostic(
        code(webtest_mcp::config::parse),
        help("Check the YAML syntax and field names against the documented layout.")
    )]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(webtest_mcp::config::invalid))]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// debug | info | warn | error
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(with = "serde_utils::duration")]
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:8443".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Environment variable holding a static token
    pub token_env: String,
    /// File holding a static token, read when the env var is empty
    pub token_file: Option<PathBuf>,
    /// Probe `/api/v1/auth/me` at startup (static token mode only)
    pub validate_on_start: bool,
    /// Take the token from each request's call context instead
    pub dynamic_token: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: "MCP_AUTH_TOKEN".to_string(),
            token_file: None,
            validate_on_start: false,
            dynamic_token: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub dir: PathBuf,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("prompts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub prompts: PromptsConfig,
}

impl Config {
    /// Load file (if present), apply env overrides, validate
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse the YAML file; a missing file yields defaults
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_yaml(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_yaml(raw: &str) -> ConfigResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply `MCP_*` and `PROMPTS_DIR` overrides. Unparseable timeouts are ignored.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_var("MCP_LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Some(v) = env_var("MCP_LOG_FORMAT") {
            match v.as_str() {
                "json" => self.server.log_format = LogFormat::Json,
                "text" => self.server.log_format = LogFormat::Text,
                _ => {}
            }
        }
        if let Some(v) = env_var("MCP_BACKEND_URL") {
            self.backend.base_url = v;
        }
        if let Some(timeout) = env_var("MCP_BACKEND_TIMEOUT").and_then(|v| parse_duration(&v)) {
            self.backend.timeout = timeout;
        }
        if let Some(v) = env_var("MCP_TOKEN_ENV") {
            self.auth.token_env = v;
        }
        if let Some(v) = env_var("MCP_TOKEN_FILE") {
            self.auth.token_file = Some(PathBuf::from(v));
        }
        if let Some(v) = env_var("PROMPTS_DIR") {
            self.prompts.dir = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !VALID_LOG_LEVELS.contains(&self.server.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "invalid log level: {} (expected one of {})",
                self.server.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "backend base_url is required".to_string(),
            ));
        }
        if self.backend.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "backend timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
