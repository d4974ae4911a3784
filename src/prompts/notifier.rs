use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::protocol::Notification;
use crate::protocol::jsonrpc::empty_params;
use crate::transport::{Transport, TransportError};

pub const PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";

#[derive(Error, Diagnostic, Debug)]
pub enum NotifyError {
    #[error("failed to encode notification: {0}")]
    #[diagnostic(code(webtest_mcp::prompts::notify_encode))]
    Encode(#[from] serde_json::Error),

    #[error("failed to send notification: {0}")]
    #[diagnostic(code(webtest_mcp::prompts::notify_send))]
    Send(#[from] TransportError),
}

/// Tells the client the prompt listing changed
pub struct Notifier {
    transport: Arc<dyn Transport>,
}

impl Notifier {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn notify_prompts_changed(&self) -> Result<(), NotifyError> {
        let frame = Notification::new(PROMPTS_LIST_CHANGED, empty_params()).to_vec()?;
        self.transport.send(&frame).await?;
        debug!("Sent prompts list_changed notification");
        Ok(())
    }
}
