//! Tool call results
//!
//! Business-level failures are still successful JSON-RPC results; the
//! client tells them apart by the `isError` flag.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

const JSON_MIME: &str = "application/json";

/// Outcome of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    /// JSON document as text, tagged `application/json`
    Json(String),
    /// Plain text
    Text(String),
    /// Error text the agent should read and react to
    Error(String),
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        ToolResult::Text(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        ToolResult::Error(message.into())
    }

    /// Wrap a serializable value as JSON text
    pub fn json(value: &Value) -> Self {
        ToolResult::Json(value.to_string())
    }

    /// Wrap a raw backend body. Bodies that are not valid JSON stay plain text.
    pub fn from_body(body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body).into_owned();
        if serde_json::from_slice::<Value>(body).is_ok() {
            ToolResult::Json(text)
        } else {
            ToolResult::Text(text)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error(_))
    }

    pub fn content_text(&self) -> &str {
        match self {
            ToolResult::Json(text) | ToolResult::Text(text) | ToolResult::Error(text) => text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content_text().is_empty()
    }

    fn mime_type(&self) -> Option<&'static str> {
        match self {
            ToolResult::Json(_) => Some(JSON_MIME),
            _ => None,
        }
    }
}

struct ContentItem<'a> {
    text: &'a str,
    mime_type: Option<&'static str>,
}

impl Serialize for ContentItem<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.mime_type.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("type", "text")?;
        map.serialize_entry("text", self.text)?;
        if let Some(mime) = self.mime_type {
            map.serialize_entry("mimeType", mime)?;
        }
        map.end()
    }
}

impl Serialize for ToolResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let content = [ContentItem {
            text: self.content_text(),
            mime_type: self.mime_type(),
        }];
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("content", &content)?;
        if self.is_error() {
            map.serialize_entry("isError", &true)?;
        }
        map.end()
    }
}
