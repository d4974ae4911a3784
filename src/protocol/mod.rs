//! JSON-RPC 2.0 protocol layer
//!
//! - **jsonrpc**: wire types, request parsing, HTTP status mapping
//! - **router**: method-name dispatch to plain and context-aware handlers

pub mod jsonrpc;
pub mod router;


pub use jsonrpc::{
    ErrorCode, JSONRPC_VERSION, Notification, Payload, Request, Response, RpcError,
    build_error_response, build_success_response, map_http_status, parse_request,
};
pub use router::{HandlerError, HandlerResult, MessageRouter};
