//! Append-only text log of completed turns.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::session::CompletedTurn;

#[derive(Debug, Clone)]
pub struct Transcript {
    path: PathBuf,
    /// Chat id whose header was written last.
    current_chat: Option<String>,
}

impl Transcript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current_chat: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one turn. Failures are logged and otherwise ignored.
    pub async fn record(&mut self, chat_id: &str, turn: &CompletedTurn) {
        let mut entry = String::new();
        if self.current_chat.as_deref() != Some(chat_id) {
            entry.push_str(&format!(
                "# chat {chat_id} started {}\n",
                chrono::Local::now().to_rfc3339()
            ));
        }
        entry.push_str(&format!(
            "User: {}\nAssistant: {}\n\n",
            turn.prompt, turn.content
        ));

        match self.append(&entry).await {
            Ok(()) => {
                self.current_chat = Some(chat_id.to_string());
                debug!(path = %self.path.display(), "transcript updated");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to write transcript");
            }
        }
    }

    async fn append(&self, entry: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await
    }
}
