//! Rolling conversation history.
//!
//! Every turn re-submits the whole history, so its total size is capped.
//! After each append the oldest entries are dropped until the total content
//! length fits the budget again. Eviction is strict FIFO: a system message
//! at the front is evicted like any other entry, and callers that need it
//! to survive must insert it again.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::Message;

/// Default budget, in characters, across all retained messages.
pub const DEFAULT_HISTORY_BUDGET: usize = 8000;

#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: VecDeque<Message>,
    budget: usize,
    total: usize,
}

impl ConversationHistory {
    pub fn new(budget: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            budget,
            total: 0,
        }
    }

    /// Append a message, then evict from the front while over budget.
    /// Returns the number of evicted messages.
    pub fn append(&mut self, message: Message) -> usize {
        let len = message.len();
        if len > self.budget {
            warn!(
                len,
                budget = self.budget,
                "message alone exceeds the history budget"
            );
        }
        self.total += len;
        self.messages.push_back(message);

        let mut evicted = 0;
        while self.total > self.budget {
            match self.messages.pop_front() {
                Some(old) => {
                    self.total -= old.len();
                    evicted += 1;
                }
                None => break,
            }
        }
        if evicted > 0 {
            debug!(
                evicted,
                remaining = self.messages.len(),
                total = self.total,
                "history truncated"
            );
        }
        evicted
    }

    /// Ordered copy of the retained messages, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// Total content length across all retained messages.
    pub fn total_length(&self) -> usize {
        self.total
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.total = 0;
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_BUDGET)
    }
}
