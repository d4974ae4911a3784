//! Backend REST client
//!
//! The bridge reaches the CRUD backend only through [`BackendClient`]. Calls
//! return the raw response body; non-2xx statuses become
//! [`BackendError::Status`] carrying the status and the backend's message.

mod auth;
mod error;
mod http;


use std::collections::BTreeMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::context::CallContext;

pub use auth::{API_TOKEN_HEADER, AuthHeader, AuthManager, is_api_token};
pub use error::{AuthError, BackendError, BackendResult};
pub use http::HttpBackendClient;

/// Query string parameters, kept ordered for stable URLs
pub type Query = BTreeMap<String, String>;

/// Authenticated access to the backend REST API
///
/// The token for each call is taken from `ctx`; a context without one makes
/// an anonymous call.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn get(&self, ctx: &CallContext, path: &str, query: &Query) -> BackendResult<Vec<u8>>;

    async fn post(&self, ctx: &CallContext, path: &str, body: &Value) -> BackendResult<Vec<u8>>;

    async fn put(&self, ctx: &CallContext, path: &str, body: &Value) -> BackendResult<Vec<u8>>;

    async fn patch(&self, ctx: &CallContext, path: &str, body: &Value) -> BackendResult<Vec<u8>>;

    async fn delete(&self, ctx: &CallContext, path: &str) -> BackendResult<Vec<u8>>;
}

/// Build a [`Query`] from string pairs
pub fn query<I, K, V>(pairs: I) -> Query
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
