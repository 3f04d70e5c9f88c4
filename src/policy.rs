//! Continuation policy: whether a finished turn triggers compaction
//!
//! Purely count-based. No model call.

use crate::thread::ConversationState;

/// Default number of turns a thread may hold before it is compacted
pub const DEFAULT_SUMMARIZE_AFTER: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuationPolicy {
    threshold: usize,
}

impl Default for ContinuationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARIZE_AFTER)
    }
}

impl ContinuationPolicy {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(self) -> usize {
        self.threshold
    }

    /// True once the thread holds more turns than the threshold
    pub fn should_summarize(self, state: &ConversationState) -> bool {
        state.len() > self.threshold
    }
}
