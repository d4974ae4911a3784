//! MCP bridge binary.
//!
//! Speaks newline-delimited JSON-RPC on stdin/stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use miette::Diagnostic;
use thiserror::Error;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webtest_mcp::client::{AuthError, AuthManager, BackendClient, BackendError, HttpBackendClient};
use webtest_mcp::config::{Config, ConfigError, DEFAULT_CONFIG_PATH, LogFormat};
use webtest_mcp::context::CallContext;
use webtest_mcp::prompts::{LoaderError, Notifier, PromptLoader, PromptsHandler, PromptsRegistry};
use webtest_mcp::server::{McpServer, ServerError};
use webtest_mcp::tools::ToolRegistry;
use webtest_mcp::tools::handlers::register_all_tools;
use webtest_mcp::transport::{StdioTransport, Transport};

#[derive(Error, Diagnostic, Debug)]
enum BinaryError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Auth(#[from] AuthError),

    #[error("Backend error: {0}")]
    #[diagnostic(code(webtest_mcp::binary::backend))]
    Backend(#[from] BackendError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Prompts(#[from] LoaderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Server(#[from] ServerError),
}

#[derive(Parser)]
#[command(name = "webtest-mcp")]
#[command(author, version, about = "MCP bridge to the webtest backend", long_about = None)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory of *.prompt.md files (overrides config and PROMPTS_DIR)
    #[arg(long)]
    prompts_dir: Option<PathBuf>,
}

/// Initialize tracing on stderr; RUST_LOG wins over the configured level
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("webtest_mcp={}", config.server.log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    match config.server.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Token stdio requests act with, if any
fn base_context(config: &Config, auth: &AuthManager) -> CallContext {
    let token = auth
        .static_token()
        .map(str::to_string)
        .or_else(|| std::env::var(&config.auth.token_env).ok());
    match token {
        Some(token) => CallContext::new().with_token(token),
        None => CallContext::new(),
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    run().await.map_err(Into::into)
}

async fn run() -> Result<(), BinaryError> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(dir) = cli.prompts_dir {
        config.prompts.dir = dir;
    }
    init_tracing(&config);

    let auth = AuthManager::from_config(&config.auth)?;
    let ctx = base_context(&config, &auth);
    let backend = HttpBackendClient::new(&config.backend, auth)?;
    if !config.auth.dynamic_token && config.auth.validate_on_start {
        backend.validate_token().await?;
    }
    let backend: Arc<dyn BackendClient> = Arc::new(backend);

    let tools = Arc::new(ToolRegistry::new());
    register_all_tools(&tools, Arc::clone(&backend)).await;

    let registry = Arc::new(PromptsRegistry::new());
    PromptLoader::new()
        .load_all(&config.prompts.dir, &registry)
        .await?;
    if registry.count().await == 0 {
        warn!(dir = %config.prompts.dir.display(), "No system prompts loaded");
    }

    let transport: Arc<dyn Transport> = Arc::new(StdioTransport::stdout());
    let prompts = Arc::new(PromptsHandler::new(registry, backend));
    let server = Arc::new(
        McpServer::new(Arc::clone(&tools), prompts)
            .await
            .with_prompts_dir(&config.prompts.dir)
            .with_notifier(Notifier::new(Arc::clone(&transport))),
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.backend.base_url,
        tools = tools.count().await,
        dynamic_token = config.auth.dynamic_token,
        "Starting MCP server"
    );

    #[cfg(unix)]
    spawn_reload_on_hangup(Arc::clone(&server));

    let stdin = BufReader::new(tokio::io::stdin());
    server.serve(ctx, stdin, transport).await?;
    Ok(())
}

/// Rescan the prompts directory on SIGHUP
#[cfg(unix)]
fn spawn_reload_on_hangup(server: Arc<McpServer>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!(error = %e, "Prompt reload on SIGHUP unavailable");
            return;
        }
    };
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            match server.reload_prompts().await {
                Ok(summary) => info!(changed = summary.changed(), "Prompts reloaded"),
                Err(e) => warn!(error = %e, "Prompt reload failed"),
            }
        }
    });
}
