//! Chat session behaviour.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum total characters kept in the rolling history.
    pub history_budget: usize,
    /// Close the connection after every completed turn and reconnect for the next.
    pub reconnect_on_complete: bool,
    /// Append every completed turn to a transcript file.
    pub persist_history: bool,
    /// Transcript location; defaults to `<data_dir>/spark/history.txt`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_file: Option<PathBuf>,
    /// Seconds to wait for the final fragment of a reply.
    pub response_timeout_secs: u64,
    /// Seconds to wait for the WebSocket handshake.
    pub connect_timeout_secs: u64,
    /// Optional system message seeded at the start of every conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Input that ends the interactive loop (case-insensitive).
    pub exit_keyword: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_budget: 8000,
            reconnect_on_complete: true,
            persist_history: false,
            history_file: None,
            response_timeout_secs: 60,
            connect_timeout_secs: 15,
            system_prompt: None,
            exit_keyword: "exit".into(),
        }
    }
}

impl SessionConfig {
    /// Resolve the transcript path if persistence is enabled.
    pub fn transcript_path(&self) -> Option<PathBuf> {
        if !self.persist_history {
            return None;
        }
        self.history_file.clone().or_else(|| {
            dirs::data_dir().map(|dir| dir.join("spark").join("history.txt"))
        })
    }
}
