//! Shared fixtures for handler tests

use std::sync::Arc;

use serde_json::Value;

use crate::client::{BackendClient, BackendError, BackendResult, MockBackendClient};
use crate::tools::{Args, ToolResult};

pub(crate) fn args(value: Value) -> Args {
    value.as_object().cloned().unwrap_or_default()
}

pub(crate) fn body(value: Value) -> BackendResult<Vec<u8>> {
    Ok(serde_json::to_vec(&value).unwrap())
}

pub(crate) fn status(status: u16, message: &str) -> BackendError {
    BackendError::Status {
        status,
        message: message.to_string(),
    }
}

/// Parse the text of a successful result as JSON
pub(crate) fn parsed(result: &ToolResult) -> Value {
    assert!(!result.is_error(), "unexpected error: {}", result.content_text());
    serde_json::from_str(result.content_text()).unwrap()
}

pub(crate) fn shared(mock: MockBackendClient) -> Arc<dyn BackendClient> {
    Arc::new(mock)
}
