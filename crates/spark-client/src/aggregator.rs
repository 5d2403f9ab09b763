//! Accumulates the fragments of one in-flight reply.

use crate::protocol::TurnResponseFragment;
use crate::TokenUsage;

/// Result of feeding one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub is_final: bool,
}

#[derive(Debug, Default, Clone)]
pub struct StreamAggregator {
    text: String,
    sid: Option<String>,
    usage: Option<TokenUsage>,
    fragments: usize,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything accumulated so far.
    pub fn reset(&mut self) {
        self.text.clear();
        self.sid = None;
        self.usage = None;
        self.fragments = 0;
    }

    pub fn append_fragment(&mut self, fragment: &TurnResponseFragment) -> AppendOutcome {
        self.text.push_str(&fragment.content_delta);
        if !fragment.sid.is_empty() {
            self.sid = Some(fragment.sid.clone());
        }
        if fragment.usage.is_some() {
            self.usage = fragment.usage;
        }
        self.fragments += 1;
        AppendOutcome {
            is_final: fragment.is_final(),
        }
    }

    pub fn result(&self) -> &str {
        &self.text
    }

    /// Take the accumulated text and reset.
    pub fn take(&mut self) -> String {
        let text = std::mem::take(&mut self.text);
        self.reset();
        text
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn usage(&self) -> Option<TokenUsage> {
        self.usage
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TurnStatus;
    use crate::Role;

    fn fragment(status: i64, delta: &str) -> TurnResponseFragment {
        TurnResponseFragment {
            status_code: 0,
            status_message: "Success".into(),
            sid: "sid-7".into(),
            turn_status: TurnStatus::from_code(status).unwrap(),
            role: Role::Assistant,
            content_delta: delta.into(),
            choice_index: 0,
            usage: None,
        }
    }

    #[test]
    fn concatenates_in_order_and_detects_last() {
        let mut agg = StreamAggregator::new();
        let finals: Vec<bool> = [(0, "a"), (1, "b"), (1, "c"), (2, "d")]
            .into_iter()
            .map(|(status, delta)| agg.append_fragment(&fragment(status, delta)).is_final)
            .collect();
        assert_eq!(finals, vec![false, false, false, true]);
        assert_eq!(agg.result(), "abcd");
        assert_eq!(agg.fragment_count(), 4);
        assert_eq!(agg.sid(), Some("sid-7"));
    }

    #[test]
    fn records_usage_from_final_fragment() {
        let mut agg = StreamAggregator::new();
        agg.append_fragment(&fragment(0, "x"));
        let mut last = fragment(2, "y");
        last.usage = Some(TokenUsage {
            question_tokens: 1,
            prompt_tokens: 2,
            completion_tokens: 3,
            total_tokens: 5,
        });
        agg.append_fragment(&last);
        assert_eq!(agg.usage().map(|u| u.total_tokens), Some(5));
    }

    #[test]
    fn reset_and_take_clear_state() {
        let mut agg = StreamAggregator::new();
        agg.append_fragment(&fragment(0, "partial"));
        agg.reset();
        assert!(agg.is_empty());
        assert_eq!(agg.result(), "");
        assert!(agg.sid().is_none());

        agg.append_fragment(&fragment(2, "done"));
        assert_eq!(agg.take(), "done");
        assert!(agg.is_empty());
        assert_eq!(agg.result(), "");
    }
}
