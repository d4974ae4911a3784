//! Method router
//!
//! Maps JSON-RPC method names to async handlers. Two kinds of handler share
//! one namespace: plain handlers see only the params, context-aware handlers
//! also receive the caller's [`CallContext`].

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::jsonrpc::{Request, Response, RpcError};
use crate::context::CallContext;

/// Failure returned by a method handler
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Already shaped as a protocol error; sent to the client verbatim
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Anything else; reported as InternalError with this message
    #[error("{0}")]
    Internal(String),
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::Internal(e.to_string())
    }
}

impl HandlerError {
    pub fn into_rpc_error(self) -> RpcError {
        match self {
            HandlerError::Rpc(err) => err,
            HandlerError::Internal(message) => RpcError::internal(message),
        }
    }
}

pub type HandlerResult = Result<Value, HandlerError>;
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;
pub type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;
pub type ContextHandler = Arc<dyn Fn(CallContext, Value) -> HandlerFuture + Send + Sync>;

/// Concurrent-safe method table
#[derive(Default)]
pub struct MessageRouter {
    handlers: RwLock<HashMap<String, Handler>>,
    context_handlers: RwLock<HashMap<String, ContextHandler>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler that only needs the request params
    pub async fn register<F, Fut>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |params| handler(params).boxed());
        self.handlers.write().await.insert(method.into(), handler);
    }

    /// Register a handler that also receives the call context
    pub async fn register_with_context<F, Fut>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(CallContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: ContextHandler = Arc::new(move |ctx, params| handler(ctx, params).boxed());
        self.context_handlers
            .write()
            .await
            .insert(method.into(), handler);
    }

    #[cfg(test)]
    pub(crate) async fn has_method(&self, method: &str) -> bool {
        self.context_handlers.read().await.contains_key(method)
            || self.handlers.read().await.contains_key(method)
    }

    /// Registered method names, sorted
    pub(crate) async fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().await.keys().cloned().collect();
        for name in self.context_handlers.read().await.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names.sort();
        names
    }

    /// Dispatch a parsed request and build its response
    ///
    /// Always returns a response, also when the handler panics; suppressing
    /// replies to notifications is the caller's job.
    pub async fn route(&self, request: Request) -> Response {
        let id = request.response_id();
        let Request {
            method,
            params,
            context,
            ..
        } = request;

        let Some(route) = self.lookup(&method).await else {
            debug!(method = %method, "No handler registered");
            return Response::error(id, RpcError::method_not_found(&method));
        };

        let dispatch = async move {
            match route {
                Route::WithContext(handler) => handler(context, params).await,
                Route::Plain(handler) => handler(params).await,
            }
        };

        match AssertUnwindSafe(dispatch).catch_unwind().await {
            Ok(Ok(result)) => Response::success(id, result),
            Ok(Err(err)) => {
                warn!(method = %method, error = %err, "Handler failed");
                Response::error(id, err.into_rpc_error())
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(method = %method, panic = %reason, "Handler panicked");
                Response::error(id, RpcError::internal(format!("internal error: {reason}")))
            }
        }
    }

    async fn lookup(&self, method: &str) -> Option<Route> {
        if let Some(handler) = self.context_handlers.read().await.get(method) {
            return Some(Route::WithContext(Arc::clone(handler)));
        }
        self.handlers
            .read()
            .await
            .get(method)
            .map(|handler| Route::Plain(Arc::clone(handler)))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("handler panicked")
}

enum Route {
    Plain(Handler),
    WithContext(ContextHandler),
}
