//! Conversation session: the connection state machine.
//!
//! A `ChatSession` owns the history, the in-flight aggregation and at most
//! one connection. Outbound turns go through `submit_turn`; inbound frames
//! are applied one at a time by `next_event`. `SessionHandle` runs the same
//! state machine inside a task for callers that need concurrent access.

mod handle;
mod manager;
mod turn;
mod types;


pub use handle::{SessionHandle, SessionNotice};
pub use manager::ChatSession;
pub use types::{CompletedTurn, Credentials, SessionConfig, SessionEvent, SessionState};
