//! Connection lifecycle and turn handling for ChatSession.

use tokio::time::{timeout_at, Instant};
use tracing::{debug, info};

use crate::protocol::{decode_fragment, encode_request, TurnRequest};
use crate::transport::TransportEvent;
use crate::{ChatError, Message};

use super::manager::ChatSession;
use super::types::{CompletedTurn, SessionEvent, SessionState};

impl ChatSession {
    /// Open a new connection with a freshly signed URL.
    ///
    /// Any previous connection is closed first; connections are never
    /// reused across `start` calls.
    pub async fn start(&mut self) -> Result<(), ChatError> {
        if !self.state.can_start() {
            return Err(ChatError::TurnInProgress);
        }
        self.close_connection().await;
        self.discard_in_flight();
        self.set_state(SessionState::Connecting);

        let creds = &self.config.credentials;
        let signed = match self
            .signer
            .sign(&self.config.endpoint.url, &creds.api_key, &creds.api_secret)
        {
            Ok(signed) => signed,
            Err(e) => return Err(self.fault(e).await),
        };
        info!(url = %signed.redacted(), chat_id = %self.chat_id, "connecting");

        match self.transport.connect(&signed.url).await {
            Ok(conn) => {
                self.connection = Some(conn);
                self.connect_error = false;
                self.last_error = None;
                self.set_state(SessionState::Ready);
                Ok(())
            }
            Err(e) => Err(self.fault(e).await),
        }
    }

    /// Send one user turn.
    ///
    /// The history is only updated once the request has been handed to the
    /// transport. A rejected call leaves history and connection untouched.
    pub async fn submit_turn(&mut self, text: impl Into<String>) -> Result<(), ChatError> {
        match self.state {
            SessionState::Ready => {}
            SessionState::AwaitingResponse => return Err(ChatError::TurnInProgress),
            _ => return Err(ChatError::NotConnected),
        }
        let text = text.into();

        let mut next = self.history.clone();
        let evicted = next.append(Message::user(text.clone()));
        let request = TurnRequest {
            app_id: self.config.credentials.app_id.clone(),
            uid: self.config.uid.clone(),
            domain: self.config.endpoint.domain.clone(),
            chat_id: self.chat_id.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_k: self.config.top_k,
            messages: next.snapshot(),
        };
        let frame = encode_request(&request)?;

        let Some(conn) = self.connection.as_mut() else {
            return Err(ChatError::NotConnected);
        };
        if let Err(e) = conn.send(frame).await {
            return Err(self.fault(e).await);
        }

        debug!(
            chat_id = %self.chat_id,
            messages = next.len(),
            total = next.total_length(),
            evicted,
            "turn submitted"
        );
        self.history = next;
        self.aggregator.reset();
        self.pending_prompt = Some(text);
        self.set_state(SessionState::AwaitingResponse);
        Ok(())
    }

    /// Wait for the next transport event and apply it.
    ///
    /// Frames that do not change anything visible are consumed silently.
    pub async fn next_event(&mut self) -> Result<SessionEvent, ChatError> {
        loop {
            let Some(event) = self.recv_transport_event().await else {
                return Err(ChatError::NotConnected);
            };
            if let Some(event) = self.handle_transport_event(event).await? {
                return Ok(event);
            }
        }
    }

    /// Receive from the open connection, `None` when there is none.
    pub(crate) async fn recv_transport_event(&mut self) -> Option<TransportEvent> {
        match self.connection.as_mut() {
            Some(conn) => Some(conn.recv().await),
            None => None,
        }
    }

    pub(crate) async fn handle_transport_event(
        &mut self,
        event: TransportEvent,
    ) -> Result<Option<SessionEvent>, ChatError> {
        match event {
            TransportEvent::Message(frame) => self.handle_frame(&frame).await,
            TransportEvent::Closed => {
                self.connection = None;
                if self.state == SessionState::AwaitingResponse {
                    return Err(self
                        .fault(ChatError::TransportError(
                            "connection closed before the reply completed".into(),
                        ))
                        .await);
                }
                info!(chat_id = %self.chat_id, "peer closed connection");
                self.discard_in_flight();
                self.set_state(SessionState::Closed);
                Ok(Some(SessionEvent::Closed))
            }
            TransportEvent::Error(cause) => {
                Err(self.fault(ChatError::TransportError(cause)).await)
            }
        }
    }

    async fn handle_frame(&mut self, frame: &str) -> Result<Option<SessionEvent>, ChatError> {
        let awaiting = self.state == SessionState::AwaitingResponse;
        let fragment = match decode_fragment(frame) {
            Ok(fragment) => fragment,
            Err(e) if awaiting => return Err(self.fault(e).await),
            Err(e) => {
                debug!(error = %e, "ignoring malformed frame outside a turn");
                return Ok(None);
            }
        };

        if fragment.is_error() {
            return Err(self
                .fault(ChatError::RemoteError {
                    code: fragment.status_code,
                    message: fragment.status_message,
                })
                .await);
        }
        if !awaiting {
            debug!(sid = %fragment.sid, "ignoring frame outside a turn");
            return Ok(None);
        }

        let outcome = self.aggregator.append_fragment(&fragment);
        if !outcome.is_final {
            return Ok(Some(SessionEvent::Delta(fragment.content_delta)));
        }
        let turn = self.complete_turn().await;
        Ok(Some(SessionEvent::TurnComplete {
            delta: fragment.content_delta,
            turn,
        }))
    }

    async fn complete_turn(&mut self) -> CompletedTurn {
        let sid = self.aggregator.sid().map(str::to_string);
        let usage = self.aggregator.usage();
        let content = self.aggregator.take();
        self.history.append(Message::assistant(content.clone()));

        let turn = CompletedTurn {
            prompt: self.pending_prompt.take().unwrap_or_default(),
            content,
            sid,
            usage,
        };
        info!(
            chat_id = %self.chat_id,
            sid = turn.sid.as_deref().unwrap_or(""),
            chars = turn.content.chars().count(),
            total_tokens = turn.usage.map(|u| u.total_tokens),
            "turn complete"
        );

        if let Some(transcript) = self.transcript.as_mut() {
            transcript.record(&self.chat_id, &turn).await;
        }

        if self.config.reconnect_on_complete {
            self.close_connection().await;
            self.set_state(SessionState::Closed);
        } else {
            self.set_state(SessionState::Ready);
        }
        turn
    }

    /// Run one complete turn: connect if needed, submit, and stream the
    /// reply through `on_delta` until it completes or the response timeout
    /// expires.
    pub async fn chat<F>(
        &mut self,
        text: impl Into<String>,
        mut on_delta: F,
    ) -> Result<CompletedTurn, ChatError>
    where
        F: FnMut(&str) + Send,
    {
        if self.state == SessionState::AwaitingResponse {
            return Err(ChatError::TurnInProgress);
        }
        if self.state != SessionState::Ready || self.connection.is_none() {
            self.start().await?;
        }
        self.submit_turn(text).await?;

        self.pump_turn(&mut on_delta).await
    }

    /// Stream the reply until the final fragment.
    ///
    /// Only the wait for inbound events is bounded by the response timeout.
    /// Applying an event, including committing a finished reply, always runs
    /// to completion.
    async fn pump_turn<F>(&mut self, on_delta: &mut F) -> Result<CompletedTurn, ChatError>
    where
        F: FnMut(&str) + Send,
    {
        let deadline = Instant::now() + self.config.response_timeout;
        loop {
            let event = match timeout_at(deadline, self.recv_transport_event()).await {
                Ok(Some(event)) => event,
                Ok(None) => return Err(ChatError::NotConnected),
                Err(_elapsed) => return Err(self.expire_turn().await),
            };
            match self.handle_transport_event(event).await? {
                None => {}
                Some(SessionEvent::Delta(delta)) => on_delta(&delta),
                Some(SessionEvent::TurnComplete { delta, turn }) => {
                    on_delta(&delta);
                    return Ok(turn);
                }
                Some(SessionEvent::Closed) => {
                    return Err(ChatError::TransportError(
                        "connection closed before the reply completed".into(),
                    ))
                }
            }
        }
    }

    /// Give up on the turn in flight after the response timeout.
    pub(crate) async fn expire_turn(&mut self) -> ChatError {
        let secs = self.config.response_timeout.as_secs_f64();
        self.fault(ChatError::TransportError(format!("no reply within {secs}s")))
            .await
    }

    /// Close the connection and discard any partial reply.
    pub async fn stop(&mut self) {
        self.close_connection().await;
        self.discard_in_flight();
        self.set_state(SessionState::Closed);
        info!(chat_id = %self.chat_id, "session stopped");
    }

    /// Start a new logical conversation: empty history, new chat id, system
    /// prompt re-seeded. The connection, if any, stays as it is.
    pub fn reset_conversation(&mut self) -> Result<(), ChatError> {
        if self.state == SessionState::AwaitingResponse {
            return Err(ChatError::TurnInProgress);
        }
        self.history.clear();
        self.seed_history();
        let old = std::mem::replace(&mut self.chat_id, spark_common::new_chat_id());
        info!(old = %old, new = %self.chat_id, "conversation reset");
        Ok(())
    }
}
