//! JSON-RPC 2.0 wire types
//!
//! Parsing of inbound requests, construction and serialization of responses
//! and notifications, and the mapping from backend HTTP statuses onto
//! JSON-RPC error codes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::context::CallContext;

pub const JSONRPC_VERSION: &str = "2.0";

/// Error codes understood by MCP clients of this server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::Unauthorized => -32001,
            ErrorCode::Forbidden => -32002,
            ErrorCode::NotFound => -32003,
            ErrorCode::Conflict => -32004,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        let kind = match code {
            -32700 => ErrorCode::ParseError,
            -32600 => ErrorCode::InvalidRequest,
            -32601 => ErrorCode::MethodNotFound,
            -32602 => ErrorCode::InvalidParams,
            -32603 => ErrorCode::InternalError,
            -32001 => ErrorCode::Unauthorized,
            -32002 => ErrorCode::Forbidden,
            -32003 => ErrorCode::NotFound,
            -32004 => ErrorCode::Conflict,
            _ => return None,
        };
        Some(kind)
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} (code {code})")]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The well-known code, if this error carries one
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
        )
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

/// Parsed inbound request
///
/// `context` never travels on the wire; the transport attaches it after
/// parsing so handlers can reach the caller's credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
    #[serde(skip)]
    pub context: CallContext,
}

impl Request {
    pub fn new(id: Option<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
            context: CallContext::default(),
        }
    }

    pub fn with_context(mut self, context: CallContext) -> Self {
        self.context = context;
        self
    }

    /// True iff the id is absent or null
    pub fn is_notification(&self) -> bool {
        matches!(self.id, None | Some(Value::Null))
    }

    /// Id to echo back; null for notifications
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

/// Outcome carried by a response: exactly one of `result` or `error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    Result(Value),
    Error(RpcError),
}

/// Outbound response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload: Payload::Result(result),
        }
    }

    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload: Payload::Error(error),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Result(value) => Some(value),
            Payload::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&RpcError> {
        match &self.payload {
            Payload::Result(_) => None,
            Payload::Error(err) => Some(err),
        }
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Server-initiated message that expects no reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Parse raw bytes into a [`Request`]
///
/// Malformed JSON yields `ParseError`. Anything that is JSON but not a
/// well-formed 2.0 request (wrong version, missing or empty method, id of
/// the wrong type) yields `InvalidRequest`.
pub fn parse_request(bytes: &[u8]) -> Result<Request, RpcError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| RpcError::parse_error(format!("Parse error: {e}")))?;

    let Value::Object(mut object) = value else {
        return Err(RpcError::invalid_request(
            "Invalid Request: expected a JSON object",
        ));
    };

    match object.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        _ => {
            return Err(RpcError::invalid_request(
                "Invalid Request: jsonrpc must be \"2.0\"",
            ));
        }
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => {
            return Err(RpcError::invalid_request(
                "Invalid Request: method is required",
            ));
        }
    };

    let id = match object.remove("id") {
        None | Some(Value::Null) => None,
        Some(id @ (Value::String(_) | Value::Number(_))) => Some(id),
        Some(_) => {
            return Err(RpcError::invalid_request(
                "Invalid Request: id must be a string, number or null",
            ));
        }
    };

    let params = object.remove("params").unwrap_or(Value::Null);

    Ok(Request {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        method,
        params,
        context: CallContext::default(),
    })
}

/// Build a success response echoing `id`
pub fn build_success_response(id: Value, result: Value) -> Response {
    Response::success(id, result)
}

/// Build an error response echoing `id`
pub fn build_error_response(
    id: Value,
    code: i32,
    message: impl Into<String>,
    data: Option<Value>,
) -> Response {
    Response::error(
        id,
        RpcError {
            code,
            message: message.into(),
            data,
        },
    )
}

/// Map a backend HTTP status onto a JSON-RPC error code and default message
pub fn map_http_status(status: u16) -> RpcError {
    match status {
        400 => RpcError::new(ErrorCode::InvalidParams, "Bad Request"),
        401 => RpcError::new(ErrorCode::Unauthorized, "Unauthorized"),
        403 => RpcError::new(ErrorCode::Forbidden, "Forbidden"),
        404 => RpcError::new(ErrorCode::NotFound, "Not Found"),
        409 => RpcError::new(ErrorCode::Conflict, "Conflict"),
        500 | 502 | 503 | 504 => RpcError::internal("Internal Server Error"),
        400..=499 => RpcError::new(ErrorCode::InvalidRequest, "Client Error"),
        _ => RpcError::internal("Server Error"),
    }
}

/// Empty params object, used by notifications that carry no payload
pub fn empty_params() -> Value {
    Value::Object(Map::new())
}
