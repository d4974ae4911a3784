//! reqwest-backed [`BackendClient`]

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::auth::AuthManager;
use super::error::{BackendError, BackendResult};
use super::{BackendClient, Query};
use crate::config::BackendConfig;
use crate::context::CallContext;

/// HTTP client for the webtest REST backend
///
/// Every call honours the context's cancellation token: a cancelled context
/// aborts the in-flight request with [`BackendError::Cancelled`]. No call is
/// retried.
pub struct HttpBackendClient {
    base_url: String,
    client: Client,
    auth: AuthManager,
}

impl HttpBackendClient {
    pub fn new(config: &BackendConfig, auth: AuthManager) -> BackendResult<Self> {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        Ok(Self::with_client(&config.base_url, client, auth))
    }

    /// Wrap an already configured reqwest client
    pub fn with_client(base_url: &str, client: Client, auth: AuthManager) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            auth,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, ctx: &CallContext, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self
            .client
            .request(method, &url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");

        match self.auth.header_for(ctx) {
            Some(header) => builder.header(header.name(), header.value()),
            None => builder,
        }
    }

    /// Send, racing the request against the context's cancellation
    async fn send(&self, ctx: &CallContext, builder: RequestBuilder) -> BackendResult<Vec<u8>> {
        let cancel = ctx.cancellation().clone();
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Backend request cancelled by caller");
                Err(BackendError::Cancelled)
            }
            result = Self::execute(builder) => result,
        }
    }

    async fn execute(builder: RequestBuilder) -> BackendResult<Vec<u8>> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(BackendError::from_status(status.as_u16(), &body));
        }
        Ok(body.to_vec())
    }

    /// Check the configured static token against `/api/v1/auth/me`
    pub async fn validate_token(&self) -> BackendResult<()> {
        if self.auth.is_dynamic() {
            return Ok(());
        }
        self.get(&CallContext::new(), "/api/v1/auth/me", &Query::new())
            .await?;
        info!("Backend token validated");
        Ok(())
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    #[instrument(skip(self, ctx, query), fields(query_len = query.len()))]
    async fn get(&self, ctx: &CallContext, path: &str, query: &Query) -> BackendResult<Vec<u8>> {
        let mut builder = self.request(ctx, Method::GET, path);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        self.send(ctx, builder).await
    }

    #[instrument(skip(self, ctx, body))]
    async fn post(&self, ctx: &CallContext, path: &str, body: &Value) -> BackendResult<Vec<u8>> {
        let builder = self.request(ctx, Method::POST, path).json(body);
        self.send(ctx, builder).await
    }

    #[instrument(skip(self, ctx, body))]
    async fn put(&self, ctx: &CallContext, path: &str, body: &Value) -> BackendResult<Vec<u8>> {
        let builder = self.request(ctx, Method::PUT, path).json(body);
        self.send(ctx, builder).await
    }

    #[instrument(skip(self, ctx, body))]
    async fn patch(&self, ctx: &CallContext, path: &str, body: &Value) -> BackendResult<Vec<u8>> {
        let builder = self.request(ctx, Method::PATCH, path).json(body);
        self.send(ctx, builder).await
    }

    #[instrument(skip(self, ctx))]
    async fn delete(&self, ctx: &CallContext, path: &str) -> BackendResult<Vec<u8>> {
        let builder = self.request(ctx, Method::DELETE, path);
        self.send(ctx, builder).await
    }
}
