//! Outbound frame seam
//!
//! Responses and server-initiated notifications leave through a
//! [`Transport`]. The binary uses newline-delimited JSON over stdio; stdout
//! carries nothing but frames.

use async_trait::async_trait;
use miette::Diagnostic;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

#[derive(Error, Diagnostic, Debug)]
pub enum TransportError {
    #[error("failed to write frame: {0}")]
    #[diagnostic(code(webtest_mcp::transport::write))]
    Write(#[from] std::io::Error),

    #[error("transport closed")]
    #[diagnostic(code(webtest_mcp::transport::closed))]
    Closed,
}

/// Sends one complete JSON-RPC frame to the client
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError>;
}

/// Writes each frame followed by `\n` and flushes
///
/// Frames from concurrent senders never interleave.
pub struct LineTransport<W> {
    writer: Mutex<W>,
}

pub type StdioTransport = LineTransport<Stdout>;

impl StdioTransport {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> LineTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> Transport for LineTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        if frame.contains(&b'\n') {
            return Err(TransportError::Write(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "frame contains a newline",
            )));
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(frame).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_frames_are_newline_delimited() {
        let transport = LineTransport::new(Vec::new());
        transport.send(br#"{"a":1}"#).await.unwrap();
        transport.send(br#"{"b":2}"#).await.unwrap();

        let written = String::from_utf8(transport.into_inner()).unwrap();
        assert_eq!(written, "{\"a\":1}\n{\"b\":2}\n");
    }

    #[tokio::test]
    async fn test_embedded_newline_is_rejected() {
        let transport = LineTransport::new(Vec::new());
        assert!(transport.send(b"{\n}").await.is_err());
        assert!(transport.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_sends_do_not_interleave() {
        let transport = Arc::new(LineTransport::new(Vec::new()));
        let mut handles = Vec::new();
        for i in 0..20 {
            let transport = transport.clone();
            handles.push(tokio::spawn(async move {
                let frame = format!("{{\"n\":{i}}}");
                transport.send(frame.as_bytes()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let transport = Arc::try_unwrap(transport).ok().unwrap();
        let written = String::from_utf8(transport.into_inner()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 20);
        assert!(lines.iter().all(|l| l.starts_with("{\"n\":") && l.ends_with('}')));
    }
}
