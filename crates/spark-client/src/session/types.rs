//! Session configuration, states and events.

use std::path::PathBuf;
use std::time::Duration;

use crate::history::DEFAULT_HISTORY_BUDGET;
use crate::{ChatError, Endpoint, TokenUsage};

/// Connection lifecycle of a [`ChatSession`](super::ChatSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No connection has been opened yet.
    Idle,
    Connecting,
    /// Connection open, no turn in flight.
    Ready,
    /// A turn was sent and its reply is streaming in.
    AwaitingResponse,
    /// A remote, transport or protocol error ended the connection.
    Faulted,
    /// Stopped by the caller, or closed after a completed turn.
    Closed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::AwaitingResponse => "awaiting_response",
            Self::Faulted => "faulted",
            Self::Closed => "closed",
        }
    }

    /// States from which `start` may open a new connection.
    pub fn can_start(self) -> bool {
        !matches!(self, Self::Connecting | Self::AwaitingResponse)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTurn {
    /// The user text that started the turn.
    pub prompt: String,
    pub content: String,
    pub sid: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// What one inbound frame did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A non-final piece of the reply.
    Delta(String),
    /// The final fragment arrived. `delta` is its own content, `turn` the
    /// whole reply.
    TurnComplete { delta: String, turn: CompletedTurn },
    /// The peer closed an idle connection.
    Closed,
}

/// Long-lived service credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Everything a session needs, fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub credentials: Credentials,
    pub endpoint: Endpoint,
    /// Caller id sent in every request header (at most 32 chars).
    pub uid: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_k: u32,
    pub history_budget: usize,
    /// Close after every completed turn and reconnect before the next.
    pub reconnect_on_complete: bool,
    /// Append completed turns to this file.
    pub persist_history: Option<PathBuf>,
    pub response_timeout: Duration,
    /// Seeded as the first history entry.
    pub system_prompt: Option<String>,
}

impl SessionConfig {
    pub fn new(credentials: Credentials, endpoint: Endpoint) -> Self {
        Self {
            credentials,
            endpoint,
            uid: spark_common::new_uid(),
            temperature: 0.5,
            max_tokens: 4096,
            top_k: 4,
            history_budget: DEFAULT_HISTORY_BUDGET,
            reconnect_on_complete: true,
            persist_history: None,
            response_timeout: Duration::from_secs(60),
            system_prompt: None,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_history_budget(mut self, budget: usize) -> Self {
        self.history_budget = budget;
        self
    }

    pub fn with_reconnect_on_complete(mut self, reconnect: bool) -> Self {
        self.reconnect_on_complete = reconnect;
        self
    }

    pub fn with_persist_history(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_history = Some(path.into());
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Check tunables and the endpoint before any network activity.
    pub fn validate(&self) -> Result<(), ChatError> {
        crate::signer::validate_endpoint(&self.endpoint.url)?;

        if self.endpoint.domain.trim().is_empty() {
            return Err(ChatError::InvalidParameter("domain must not be empty".into()));
        }
        let creds = &self.credentials;
        for (name, value) in [
            ("app_id", &creds.app_id),
            ("api_key", &creds.api_key),
            ("api_secret", &creds.api_secret),
        ] {
            if value.is_empty() {
                return Err(ChatError::InvalidParameter(format!("{name} is required")));
            }
        }
        if self.uid.is_empty() || self.uid.chars().count() > 32 {
            return Err(ChatError::InvalidParameter(
                "uid must be 1-32 characters".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ChatError::InvalidParameter(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }
        if !(1..=8192).contains(&self.max_tokens) {
            return Err(ChatError::InvalidParameter(format!(
                "max_tokens must be within [1, 8192], got {}",
                self.max_tokens
            )));
        }
        if !(1..=6).contains(&self.top_k) {
            return Err(ChatError::InvalidParameter(format!(
                "top_k must be within [1, 6], got {}",
                self.top_k
            )));
        }
        if self.history_budget == 0 {
            return Err(ChatError::InvalidParameter(
                "history_budget must be at least 1".into(),
            ));
        }
        if self.response_timeout.is_zero() {
            return Err(ChatError::InvalidParameter(
                "response_timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
