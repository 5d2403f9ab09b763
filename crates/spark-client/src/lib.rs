//! Streaming chat client for the Spark conversational service.
//!
//! Provides the session protocol over an authenticated WebSocket:
//! - Signed, single-use connection URLs (HMAC-SHA256)
//! - A rolling, length-bounded conversation history
//! - Aggregation of streamed reply fragments
//! - A `ChatSession` state machine plus an actor-style `SessionHandle`

pub mod aggregator;
pub mod endpoint;
pub mod history;
pub mod protocol;
pub mod session;
pub mod signer;
pub mod transcript;
pub mod transport;

pub use aggregator::StreamAggregator;
pub use endpoint::Endpoint;
pub use history::{ConversationHistory, DEFAULT_HISTORY_BUDGET};
pub use session::{
    ChatSession, CompletedTurn, Credentials, SessionConfig, SessionEvent, SessionHandle,
    SessionNotice, SessionState,
};
pub use signer::{Clock, FixedClock, SignedUrl, SystemClock, UrlSigner};
pub use transport::{Connection, Transport, TransportEvent, WsTransport};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Length counted the way the history budget counts it.
    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::System, Role::User, Role::Assistant];
}

/// Token counts reported with the last fragment of a reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub question_tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChatError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("a turn is already in progress")]
    TurnInProgress,
    #[error("not connected")]
    NotConnected,
    #[error("remote error {code}: {message}")]
    RemoteError { code: i64, message: String },
    #[error("transport error: {0}")]
    TransportError(String),
    #[error("malformed frame: {0}")]
    SerializationError(String),
}

impl ChatError {
    /// Whether the caller can simply retry once the session is usable again.
    ///
    /// Configuration errors are fatal to the session; everything else is
    /// surfaced to the driving loop, which decides whether to reconnect.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ChatError::InvalidEndpoint(_) | ChatError::InvalidParameter(_)
        )
    }
}
