//! ChatSession struct, construction and bookkeeping.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::aggregator::StreamAggregator;
use crate::history::ConversationHistory;
use crate::signer::UrlSigner;
use crate::transcript::Transcript;
use crate::transport::{Connection, Transport};
use crate::{ChatError, Message};

use super::types::{SessionConfig, SessionState};

/// One conversation with the service over at most one open connection.
///
/// All mutation goes through `&mut self`, so the state machine has a single
/// writer. To drive it from several tasks, wrap it in a
/// [`SessionHandle`](super::SessionHandle).
pub struct ChatSession {
    pub(super) config: SessionConfig,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) signer: UrlSigner,
    pub(super) history: ConversationHistory,
    pub(super) aggregator: StreamAggregator,
    pub(super) connection: Option<Box<dyn Connection>>,
    pub(super) state: SessionState,
    pub(super) state_tx: watch::Sender<SessionState>,
    pub(super) chat_id: String,
    /// User text of the turn in flight.
    pub(super) pending_prompt: Option<String>,
    pub(super) last_error: Option<ChatError>,
    pub(super) connect_error: bool,
    pub(super) transcript: Option<Transcript>,
}

impl ChatSession {
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>) -> Result<Self, ChatError> {
        config.validate()?;

        let (state_tx, _) = watch::channel(SessionState::Idle);
        let transcript = config.persist_history.clone().map(Transcript::new);
        let mut session = Self {
            history: ConversationHistory::new(config.history_budget),
            config,
            transport,
            signer: UrlSigner::new(),
            aggregator: StreamAggregator::new(),
            connection: None,
            state: SessionState::Idle,
            state_tx,
            chat_id: spark_common::new_chat_id(),
            pending_prompt: None,
            last_error: None,
            connect_error: false,
            transcript,
        };
        session.seed_history();
        debug!(
            chat_id = %session.chat_id,
            domain = %session.config.endpoint.domain,
            "session created"
        );
        Ok(session)
    }

    /// Replace the URL signer, e.g. with one on a fixed clock.
    pub fn with_signer(mut self, signer: UrlSigner) -> Self {
        self.signer = signer;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Observe state transitions without holding the session.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn last_error(&self) -> Option<&ChatError> {
        self.last_error.as_ref()
    }

    /// True after a transport-level fault, until the next successful `start`.
    pub fn connect_error(&self) -> bool {
        self.connect_error
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Text accumulated so far for the turn in flight.
    pub fn partial_reply(&self) -> &str {
        self.aggregator.result()
    }

    pub(super) fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "session state");
            self.state = state;
            self.state_tx.send_replace(state);
        }
    }

    pub(super) fn seed_history(&mut self) {
        if let Some(prompt) = self.config.system_prompt.clone() {
            self.history.append(Message::system(prompt));
        }
    }

    pub(super) async fn close_connection(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            conn.close().await;
            info!(chat_id = %self.chat_id, "connection closed");
        }
    }

    /// Drop the turn in flight without touching history.
    pub(super) fn discard_in_flight(&mut self) {
        if !self.aggregator.is_empty() {
            debug!(
                discarded = self.aggregator.result().len(),
                "discarding partial reply"
            );
        }
        self.aggregator.reset();
        self.pending_prompt = None;
    }

    /// Tear down after an error and return it for propagation.
    pub(super) async fn fault(&mut self, err: ChatError) -> ChatError {
        warn!(chat_id = %self.chat_id, error = %err, state = %self.state, "session faulted");
        self.close_connection().await;
        self.discard_in_flight();
        if matches!(err, ChatError::TransportError(_)) {
            self.connect_error = true;
        }
        self.last_error = Some(err.clone());
        self.set_state(SessionState::Faulted);
        err
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("state", &self.state)
            .field("chat_id", &self.chat_id)
            .field("endpoint", &self.config.endpoint)
            .field("history_len", &self.history.len())
            .field("connected", &self.connection.is_some())
            .finish()
    }
}
