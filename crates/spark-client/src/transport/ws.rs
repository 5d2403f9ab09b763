//! WebSocket transport over tokio-tungstenite.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{Connection, Transport, TransportEvent};
use crate::ChatError;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct WsTransport {
    connect_timeout: Duration,
}

impl WsTransport {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, ChatError> {
        let shown = url.split('?').next().unwrap_or("");
        match tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(url)).await
        {
            Ok(Ok((stream, response))) => {
                info!(url = %shown, status = %response.status(), "WebSocket connected");
                Ok(Box::new(WsConnection { stream }))
            }
            Ok(Err(e)) => {
                warn!(url = %shown, error = %e, "WebSocket handshake failed");
                Err(ChatError::TransportError(format!("connection failed: {e}")))
            }
            Err(_elapsed) => {
                let secs = self.connect_timeout.as_secs_f64();
                warn!(url = %shown, "WebSocket connection timed out after {secs}s");
                Err(ChatError::TransportError(format!(
                    "connection timed out after {secs}s"
                )))
            }
        }
    }
}

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, text: String) -> Result<(), ChatError> {
        debug!(bytes = text.len(), "sending frame");
        self.stream
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| ChatError::TransportError(format!("send failed: {e}")))
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    debug!(bytes = text.len(), "received frame");
                    return TransportEvent::Message(text.as_str().to_string());
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!(?frame, "peer closed connection");
                    return TransportEvent::Closed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return TransportEvent::Error(e.to_string()),
                None => return TransportEvent::Closed,
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "close handshake failed");
        }
    }
}
