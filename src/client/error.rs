use miette::Diagnostic;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::protocol::{RpcError, map_http_status};

#[derive(Error, Diagnostic, Debug)]
pub enum BackendError {
    #[error("backend returned {status}: {message}")]
    #[diagnostic(code(webtest_mcp::client::status))]
    Status { status: u16, message: String },

    #[error("request cancelled")]
    #[diagnostic(code(webtest_mcp::client::cancelled))]
    Cancelled,

    #[error("request to backend timed out")]
    #[diagnostic(
        code(webtest_mcp::client::timeout),
        help("Raise backend.timeout or MCP_BACKEND_TIMEOUT if the backend is slow.")
    )]
    Timeout,

    #[error("failed to connect to backend: {0}")]
    #[diagnostic(
        code(webtest_mcp::client::connection_failed),
        help("Is the backend running? Check backend.base_url or MCP_BACKEND_URL.")
    )]
    Connection(String),

    #[error("failed to encode request: {0}")]
    #[diagnostic(code(webtest_mcp::client::encode))]
    Encode(String),

    #[error("invalid response from backend: {0}")]
    #[diagnostic(code(webtest_mcp::client::invalid_response))]
    InvalidResponse(String),
}

/// Error body shapes the backend is known to return
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl BackendError {
    /// Build a status error, preferring the body's `error` then `message`
    /// field over the generic text for that status.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        let message = parsed
            .error
            .filter(|m| !m.is_empty())
            .or(parsed.message.filter(|m| !m.is_empty()))
            .unwrap_or_else(|| map_http_status(status).message);
        BackendError::Status { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BackendError::Cancelled)
    }

    /// Protocol-level view of this failure
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            BackendError::Status { status, message } => {
                let mut err = map_http_status(*status).with_data(json!({ "http_status": status }));
                err.message = message.clone();
                err
            }
            other => RpcError::internal(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_connect() {
            BackendError::Connection(e.to_string())
        } else if e.is_builder() || e.is_request() {
            BackendError::Encode(e.to_string())
        } else {
            BackendError::InvalidResponse(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::InvalidResponse(e.to_string())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Error, Diagnostic, Debug)]
pub enum AuthError {
    #[error("no token found: set {env} or provide auth.token_file")]
    #[diagnostic(
        code(webtest_mcp::client::missing_token),
        help("Either export the token or enable auth.dynamic_token.")
    )]
    MissingToken { env: String },

    #[error("Failed to read token file {path}")]
    #[diagnostic(code(webtest_mcp::client::token_file))]
    TokenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
