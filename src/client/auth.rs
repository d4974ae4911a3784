//! Backend authentication
//!
//! Picks the credential for an outbound call and the header it travels in.
//! API tokens (64 characters, no dots) use `X-API-Token`; anything else,
//! typically a JWT, is sent as a bearer token.

use std::env;

use tracing::debug;

use super::error::AuthError;
use crate::config::AuthConfig;
use crate::context::CallContext;

pub const API_TOKEN_HEADER: &str = "X-API-Token";

const API_TOKEN_LEN: usize = 64;

/// True for the backend's long-lived API token format
pub fn is_api_token(token: &str) -> bool {
    token.len() == API_TOKEN_LEN && !token.contains('.')
}

/// Header carrying a credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthHeader {
    ApiToken(String),
    Bearer(String),
}

impl AuthHeader {
    pub fn for_token(token: &str) -> Self {
        if is_api_token(token) {
            AuthHeader::ApiToken(token.to_string())
        } else {
            AuthHeader::Bearer(token.to_string())
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthHeader::ApiToken(_) => API_TOKEN_HEADER,
            AuthHeader::Bearer(_) => "Authorization",
        }
    }

    pub fn value(&self) -> String {
        match self {
            AuthHeader::ApiToken(token) => token.clone(),
            AuthHeader::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

/// Chooses the token for each backend call
#[derive(Debug, Clone, Default)]
pub struct AuthManager {
    token: Option<String>,
    dynamic: bool,
}

impl AuthManager {
    /// Build from config
    ///
    /// Dynamic mode reads nothing up front. Static mode reads the env var
    /// named by `token_env`, then `token_file`, and fails if both are empty.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        if config.dynamic_token {
            debug!("Using per-request tokens from call context");
            return Ok(Self::dynamic());
        }

        let mut token = env::var(&config.token_env)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        if token.is_none() {
            if let Some(path) = &config.token_file {
                let raw = std::fs::read_to_string(path).map_err(|source| AuthError::TokenFile {
                    path: path.display().to_string(),
                    source,
                })?;
                token = Some(raw.trim().to_string()).filter(|t| !t.is_empty());
            }
        }

        match token {
            Some(token) => {
                debug!(token_len = token.len(), "Loaded static backend token");
                Ok(Self::with_static_token(token))
            }
            None => Err(AuthError::MissingToken {
                env: config.token_env.clone(),
            }),
        }
    }

    /// Per-request tokens only
    pub fn dynamic() -> Self {
        Self {
            token: None,
            dynamic: true,
        }
    }

    pub fn with_static_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            dynamic: false,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn static_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Header for a call made with `ctx`, or `None` for an anonymous call
    ///
    /// In dynamic mode a context token takes precedence over any static one.
    pub fn header_for(&self, ctx: &CallContext) -> Option<AuthHeader> {
        let token = if self.dynamic {
            ctx.token().or(self.token.as_deref())
        } else {
            self.token.as_deref()
        };
        token.map(AuthHeader::for_token)
    }
}
