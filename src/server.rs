//! MCP server
//!
//! Wires the method router to the tool registry and the prompts handler,
//! and owns the message entry point used by every transport:
//!
//! ```text
//! bytes -> parse_request -> MessageRouter -> {ToolRegistry | PromptsHandler} -> Response
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use miette::Diagnostic;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::context::CallContext;
use crate::prompts::{LoaderError, Notifier, PromptLoader, PromptsHandler, ReloadSummary};
use crate::protocol::{HandlerError, MessageRouter, Response, RpcError, parse_request};
use crate::tools::ToolRegistry;
use crate::transport::{Transport, TransportError};

pub const SERVER_NAME: &str = "webtest-mcp-server";
pub const PROTOCOL_VERSION: &str = "2025-06-18";

#[derive(Error, Diagnostic, Debug)]
pub enum ServerError {
    #[error("failed to encode response: {0}")]
    #[diagnostic(code(webtest_mcp::server::encode))]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Prompts(#[from] LoaderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to read from input: {0}")]
    #[diagnostic(code(webtest_mcp::server::read))]
    Read(#[source] std::io::Error),

    #[error("no prompts directory configured")]
    #[diagnostic(code(webtest_mcp::server::no_prompts_dir))]
    NoPromptsDir,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InitializeParams {
    protocol_version: String,
    client_info: ClientInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClientInfo {
    name: String,
    version: String,
}

pub struct McpServer {
    router: MessageRouter,
    tools: Arc<ToolRegistry>,
    prompts: Arc<PromptsHandler>,
    prompts_dir: Option<PathBuf>,
    notifier: Option<Notifier>,
    initialized: Arc<AtomicBool>,
}

impl McpServer {
    /// Build a server with every MCP method registered
    pub async fn new(tools: Arc<ToolRegistry>, prompts: Arc<PromptsHandler>) -> Self {
        let server = Self {
            router: MessageRouter::new(),
            tools,
            prompts,
            prompts_dir: None,
            notifier: None,
            initialized: Arc::new(AtomicBool::new(false)),
        };
        server.register_methods().await;
        server
    }

    /// Directory rescanned by [`McpServer::reload_prompts`]
    pub fn with_prompts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompts_dir = Some(dir.into());
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn register_methods(&self) {
        self.router
            .register("initialize", |params: Value| async move {
                let params: InitializeParams =
                    serde_json::from_value(params).unwrap_or_default();
                info!(
                    client = %params.client_info.name,
                    client_version = %params.client_info.version,
                    protocol = %params.protocol_version,
                    "Client connected"
                );
                Ok(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {
                        "tools": {},
                        "prompts": {"listChanged": true}
                    },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }))
            })
            .await;

        for method in ["initialized", "notifications/initialized"] {
            let initialized = Arc::clone(&self.initialized);
            self.router
                .register(method, move |_| {
                    let initialized = Arc::clone(&initialized);
                    async move {
                        initialized.store(true, Ordering::SeqCst);
                        info!("Client initialized");
                        Ok(Value::Null)
                    }
                })
                .await;
        }

        self.router
            .register("ping", |_| async { Ok(json!({})) })
            .await;

        let tools = Arc::clone(&self.tools);
        self.router
            .register("tools/list", move |_| {
                let tools = Arc::clone(&tools);
                async move {
                    let definitions = tools.list().await;
                    debug!(count = definitions.len(), "Listing tools");
                    Ok(json!({ "tools": definitions }))
                }
            })
            .await;

        let tools = Arc::clone(&self.tools);
        self.router
            .register_with_context("tools/call", move |ctx, params| {
                let tools = Arc::clone(&tools);
                async move { call_tool(&tools, &ctx, params).await }
            })
            .await;

        let prompts = Arc::clone(&self.prompts);
        self.router
            .register_with_context("prompts/list", move |ctx, params| {
                let prompts = Arc::clone(&prompts);
                async move {
                    let listed = prompts.list(&ctx, params).await?;
                    Ok(serde_json::to_value(listed)?)
                }
            })
            .await;

        let prompts = Arc::clone(&self.prompts);
        self.router
            .register_with_context("prompts/get", move |ctx, params| {
                let prompts = Arc::clone(&prompts);
                async move {
                    let prompt = prompts.get(&ctx, params).await?;
                    Ok(serde_json::to_value(prompt)?)
                }
            })
            .await;

        debug!(methods = ?self.router.methods().await, "Registered MCP methods");
    }

    /// Handle one inbound frame
    ///
    /// Unparseable input yields an error response with a null id.
    /// Notifications yield `None`.
    pub async fn handle_message(&self, ctx: CallContext, bytes: &[u8]) -> Option<Response> {
        let request = match parse_request(bytes) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, len = bytes.len(), "Rejected inbound message");
                return Some(Response::error(Value::Null, err));
            }
        };

        let notification = request.is_notification();
        debug!(method = %request.method, notification, "Received message");

        let response = self.router.route(request.with_context(ctx)).await;
        if notification { None } else { Some(response) }
    }

    /// [`McpServer::handle_message`] with the response serialised
    pub async fn handle_bytes(
        &self,
        ctx: CallContext,
        bytes: &[u8],
    ) -> Result<Option<Vec<u8>>, ServerError> {
        match self.handle_message(ctx, bytes).await {
            Some(response) => Ok(Some(response.to_vec()?)),
            None => Ok(None),
        }
    }

    /// Rescan the prompts directory and tell the client if anything changed
    ///
    /// A failed notification is logged; the reload itself still counts.
    #[instrument(skip(self))]
    pub async fn reload_prompts(&self) -> Result<ReloadSummary, ServerError> {
        let dir = self.prompts_dir.as_ref().ok_or(ServerError::NoPromptsDir)?;
        let summary = PromptLoader::new()
            .reload(dir, self.prompts.registry())
            .await?;

        if summary.changed() {
            if let Some(notifier) = &self.notifier {
                if let Err(e) = notifier.notify_prompts_changed().await {
                    warn!(error = %e, "Failed to notify prompts change");
                }
            }
        }
        Ok(summary)
    }

    /// Serve newline-delimited frames from `input` until it closes
    ///
    /// Each frame is handled on its own task; responses go out through
    /// `transport` in completion order. Blank lines are ignored. In-flight
    /// requests finish before this returns.
    pub async fn serve<R>(
        self: Arc<Self>,
        ctx: CallContext,
        input: R,
        transport: Arc<dyn Transport>,
    ) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut in_flight = JoinSet::new();

        info!("Server ready, waiting for requests");
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line.map_err(ServerError::Read)?,
                _ = ctx.cancellation().cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
            };
            let Some(line) = line else {
                info!("Input closed");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let server = Arc::clone(&self);
            let transport = Arc::clone(&transport);
            let ctx = ctx.clone();
            in_flight.spawn(async move {
                match server.handle_bytes(ctx, line.as_bytes()).await {
                    Ok(Some(frame)) => {
                        if let Err(e) = transport.send(&frame).await {
                            warn!(error = %e, "Failed to send response");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => error!(error = %e, "Failed to encode response"),
                }
            });

            while let Some(done) = in_flight.try_join_next() {
                if let Err(e) = done {
                    error!(error = %e, "Request task failed");
                }
            }
        }

        while let Some(done) = in_flight.join_next().await {
            if let Err(e) = done {
                error!(error = %e, "Request task failed");
            }
        }
        Ok(())
    }
}

#[instrument(skip_all)]
async fn call_tool(
    tools: &ToolRegistry,
    ctx: &CallContext,
    params: Value,
) -> Result<Value, HandlerError> {
    let params: ToolCallParams = serde_json::from_value(params)
        .map_err(|e| RpcError::invalid_params(format!("invalid tools/call params: {e}")))?;
    let arguments = params.arguments.unwrap_or_default();

    let result = tools
        .execute(ctx, &params.name, &arguments)
        .await
        .map_err(|e| HandlerError::Internal(e.to_string()))?;
    Ok(serde_json::to_value(result)?)
}
