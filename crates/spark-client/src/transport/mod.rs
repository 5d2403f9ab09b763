//! Transport seam between the session and the network.
//!
//! The session never touches sockets directly. It asks a [`Transport`] for a
//! [`Connection`], sends text frames through it, and consumes the closed set
//! of lifecycle events it yields. A successful `connect` is the open
//! notification.

mod ws;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

use crate::ChatError;

pub use ws::{WsConnection, WsTransport, DEFAULT_CONNECT_TIMEOUT};

/// Inbound lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound text frame.
    Message(String),
    /// The peer closed the connection, or the stream ended.
    Closed,
    /// The connection failed.
    Error(String),
}

/// Opens connections.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, ChatError>;
}

/// One open connection, exclusively owned by a session.
///
/// `recv` must be cancel-safe: a session actor races it against commands.
#[async_trait]
pub trait Connection: Send {
    async fn send(&mut self, text: String) -> Result<(), ChatError>;

    async fn recv(&mut self) -> TransportEvent;

    /// Close the connection. Errors are swallowed; the connection is gone
    /// either way.
    async fn close(&mut self);
}
