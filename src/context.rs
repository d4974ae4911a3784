//! Per-call context
//!
//! Carries the caller's credential and a cancellation signal from the
//! transport down to every backend HTTP call made on its behalf. A context
//! without a token behaves like an anonymous caller.

use tokio_util::sync::CancellationToken;

/// Call-scoped data attached to each inbound JSON-RPC request
#[derive(Debug, Clone)]
pub struct CallContext {
    token: Option<String>,
    cancel: CancellationToken,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    /// Anonymous context that is never cancelled unless asked to
    pub fn new() -> Self {
        Self {
            token: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach an auth token. Blank tokens are treated as absent.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.trim().is_empty() {
            None
        } else {
            Some(token.trim().to_string())
        };
        self
    }

    /// Replace the cancellation token, e.g. with one owned by the transport
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel every outstanding call made with this context
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}
