//! Actor wrapper that owns a ChatSession in a background task.
//!
//! Every mutation of the session happens inside that one task, which races
//! caller commands against inbound transport events. Callers talk to it
//! through [`SessionHandle`] and observe it through notices and a state
//! watch channel.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::debug;

use crate::ChatError;

use super::manager::ChatSession;
use super::types::{CompletedTurn, SessionEvent, SessionState};

/// Something the session did, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    StateChanged(SessionState),
    Delta(String),
    TurnComplete(CompletedTurn),
    Error(ChatError),
}

enum SessionCommand {
    Start {
        reply: oneshot::Sender<Result<(), ChatError>>,
    },
    Submit {
        text: String,
        reply: oneshot::Sender<Result<(), ChatError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle to a session running in its own task.
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<SessionCommand>,
    state_rx: watch::Receiver<SessionState>,
}

impl SessionHandle {
    /// Move `session` into a background task.
    /// Returns `(handle, notice_receiver)`.
    pub fn spawn(session: ChatSession) -> (Self, mpsc::Receiver<SessionNotice>) {
        let (notice_tx, notice_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(16);
        let state_rx = session.subscribe();

        tokio::spawn(run_session(session, command_rx, notice_tx));

        (
            Self {
                command_tx,
                state_rx,
            },
            notice_rx,
        )
    }

    /// Open a new connection. Resolves once it is open or has failed.
    pub async fn start(&self) -> Result<(), ChatError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionCommand::Start { reply }, rx).await?
    }

    /// Submit a user turn. Resolves as soon as the request is sent; the
    /// reply arrives as notices.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), ChatError> {
        let (reply, rx) = oneshot::channel();
        let cmd = SessionCommand::Submit {
            text: text.into(),
            reply,
        };
        self.request(cmd, rx).await?
    }

    /// Close the connection and discard any partial reply.
    pub async fn stop(&self) {
        let (reply, rx) = oneshot::channel();
        let _ = self.request(SessionCommand::Stop { reply }, rx).await;
    }

    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Wait until the session reaches a state matching `pred`.
    pub async fn wait_for(
        &self,
        pred: impl FnMut(&SessionState) -> bool,
    ) -> Result<SessionState, ChatError> {
        let mut rx = self.state_rx.clone();
        let state = rx.wait_for(pred).await.map_err(|_| ChatError::NotConnected)?;
        Ok(*state)
    }

    pub fn is_running(&self) -> bool {
        !self.command_tx.is_closed()
    }

    async fn request<T>(
        &self,
        cmd: SessionCommand,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, ChatError> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| ChatError::NotConnected)?;
        rx.await.map_err(|_| ChatError::NotConnected)
    }
}

async fn run_session(
    mut session: ChatSession,
    mut command_rx: mpsc::Receiver<SessionCommand>,
    notice_tx: mpsc::Sender<SessionNotice>,
) {
    let timeout = session.config().response_timeout;
    let mut deadline: Option<Instant> = None;
    let mut last_state = session.state();

    loop {
        let mut notices = Vec::new();

        tokio::select! {
            cmd = command_rx.recv() => {
                let Some(cmd) = cmd else {
                    session.stop().await;
                    break;
                };
                match cmd {
                    SessionCommand::Start { reply } => {
                        let _ = reply.send(session.start().await);
                    }
                    SessionCommand::Submit { text, reply } => {
                        let result = session.submit_turn(text).await;
                        if result.is_ok() {
                            deadline = Some(Instant::now() + timeout);
                        }
                        let _ = reply.send(result);
                    }
                    SessionCommand::Stop { reply } => {
                        session.stop().await;
                        let _ = reply.send(());
                    }
                }
            }
            Some(event) = session.recv_transport_event(), if session.is_connected() => {
                match session.handle_transport_event(event).await {
                    Ok(Some(SessionEvent::Delta(delta))) => {
                        notices.push(SessionNotice::Delta(delta));
                    }
                    Ok(Some(SessionEvent::TurnComplete { delta, turn })) => {
                        if !delta.is_empty() {
                            notices.push(SessionNotice::Delta(delta));
                        }
                        notices.push(SessionNotice::TurnComplete(turn));
                    }
                    Ok(Some(SessionEvent::Closed)) | Ok(None) => {}
                    Err(e) => notices.push(SessionNotice::Error(e)),
                }
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                notices.push(SessionNotice::Error(session.expire_turn().await));
            }
        }

        if session.state() != SessionState::AwaitingResponse {
            deadline = None;
        }
        let state = session.state();
        if state != last_state {
            last_state = state;
            notices.push(SessionNotice::StateChanged(state));
        }
        for notice in notices {
            // The receiver may be gone; the session keeps serving commands.
            let _ = notice_tx.send(notice).await;
        }
    }

    debug!(chat_id = %session.chat_id(), "session task finished");
}
