//! Summarizer/compactor: folds old turns into the running summary
//!
//! Compaction is computed against a snapshot and applied as one
//! [`Compaction`] value, so the summary update and the turn deletions land
//! together or not at all.

use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmService, SystemContent};
use crate::prompts::{compaction_instruction, COMPACTION_PREAMBLE};
use crate::responder::history_messages;
use crate::thread::{Compaction, ConversationState, Retention};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompactionError {
    #[error("summary model failed: {0}")]
    Upstream(#[from] LlmError),
    #[error("summary model returned an empty summary")]
    EmptySummary,
}

pub struct Compactor {
    llm: Arc<dyn LlmService>,
    retention: Retention,
}

impl Compactor {
    pub fn new(llm: Arc<dyn LlmService>, retention: Retention) -> Self {
        Self { llm, retention }
    }

    /// Ask the summary model for an updated summary and pick the turns it
    /// replaces. The model runs even when nothing would be removed.
    pub async fn summarize(&self, state: &ConversationState) -> Result<Compaction, CompactionError> {
        let (history_system, mut messages) = history_messages(state.messages());
        messages.push(LlmMessage::user(compaction_instruction(state.summary())));

        let mut system = vec![SystemContent::new(COMPACTION_PREAMBLE)];
        system.extend(history_system);

        let request = LlmRequest {
            system,
            messages,
            tools: Vec::new(),
            max_tokens: None,
        };
        let response = self.llm.complete(&request).await?;

        let summary = response.text().trim().to_string();
        if summary.is_empty() {
            return Err(CompactionError::EmptySummary);
        }

        let removed = self.retention.removable_ids(state.messages());
        tracing::info!(
            removed = removed.len(),
            retained = state.len() - removed.len(),
            summary_chars = summary.len(),
            "Compaction computed"
        );
        Ok(Compaction { summary, removed })
    }

    /// Summarize and apply to a copy of `state`
    pub async fn compact(&self, state: &ConversationState) -> Result<ConversationState, CompactionError> {
        let compaction = self.summarize(state).await?;
        let mut next = state.clone();
        next.apply_compaction(&compaction);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{counting_summarizer, MockLlm};
    use crate::thread::Role;
    use proptest::prelude::*;

    fn state_of_len(n: usize) -> ConversationState {
        let mut state = ConversationState::new();
        for i in 0..n {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            state.append(role, format!("turn {i}"));
        }
        state
    }

    #[tokio::test]
    async fn test_compact_keeps_last_two() {
        let llm = Arc::new(MockLlm::new("summary"));
        llm.queue_text("  They talked about pie.  ");
        let compactor = Compactor::new(llm.clone(), Retention::default());

        let state = state_of_len(7);
        let next = compactor.compact(&state).await.unwrap();

        assert_eq!(next.summary(), "They talked about pie.");
        let kept: Vec<&str> = next.messages().iter().map(|t| t.content()).collect();
        assert_eq!(kept, vec!["turn 5", "turn 6"]);

        let request = &llm.recorded_requests()[0];
        assert_eq!(request.messages.len(), 8);
        assert!(request
            .last_user_text()
            .unwrap()
            .starts_with("Create a summary"));
    }

    #[tokio::test]
    async fn test_existing_summary_is_extended() {
        let llm = Arc::new(MockLlm::new("summary"));
        llm.queue_text("updated");
        let compactor = Compactor::new(llm.clone(), Retention::default());

        let mut state = state_of_len(3);
        state.apply_compaction(&Compaction {
            summary: "User is Sam.".to_string(),
            removed: vec![],
        });
        compactor.compact(&state).await.unwrap();

        let instruction = llm.recorded_requests()[0].last_user_text().unwrap();
        assert!(instruction.contains("User is Sam."));
        assert!(instruction.contains("Extend the summary"));
    }

    #[tokio::test]
    async fn test_short_history_still_runs_model() {
        let llm = Arc::new(counting_summarizer());
        let compactor = Compactor::new(llm.clone(), Retention::default());

        let state = state_of_len(2);
        let next = compactor.compact(&state).await.unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!(next.summary(), "summary #1");
        assert_eq!(llm.request_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_leaves_state_untouched() {
        let llm = Arc::new(MockLlm::new("summary"));
        llm.queue_error(LlmError::server_error("overloaded"));
        let compactor = Compactor::new(llm, Retention::default());

        let state = state_of_len(7);
        let before = state.clone();
        let err = compactor.compact(&state).await.unwrap_err();
        assert!(matches!(err, CompactionError::Upstream(_)));
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_empty_summary_rejected() {
        let llm = Arc::new(MockLlm::new("summary"));
        llm.queue_text("   ");
        let compactor = Compactor::new(llm, Retention::default());

        let err = compactor.compact(&state_of_len(7)).await.unwrap_err();
        assert!(matches!(err, CompactionError::EmptySummary));
    }

    #[tokio::test]
    async fn test_repeated_compaction_stays_bounded() {
        let compactor = Compactor::new(Arc::new(counting_summarizer()), Retention::default());

        let once = compactor.compact(&state_of_len(9)).await.unwrap();
        let twice = compactor.compact(&once).await.unwrap();
        assert_eq!(once.messages(), twice.messages());
        assert!(twice.len() <= 2);
        assert_eq!(twice.summary(), "summary #2");
    }

    fn arb_roles() -> impl Strategy<Value = Vec<Role>> {
        proptest::collection::vec(
            prop_oneof![
                Just(Role::User),
                Just(Role::Assistant),
                Just(Role::Tool),
                Just(Role::System),
            ],
            0..30,
        )
    }

    proptest! {
        #[test]
        fn prop_last_turns_retains_at_most_count(roles in arb_roles(), count in 0usize..5) {
            let mut state = ConversationState::new();
            for role in &roles {
                state.append(*role, "x");
            }
            let retention = Retention::LastTurns { count };
            let removed = retention.removable_ids(state.messages());
            state.apply_compaction(&Compaction { summary: "s".into(), removed });

            prop_assert!(state.len() <= count);
            prop_assert!(state.messages().first().map_or(true, |t| t.role() != Role::Tool));
            // the retained tail is a suffix of the original log
            let tail = &roles[roles.len() - state.len()..];
            let kept: Vec<Role> = state.messages().iter().map(|t| t.role()).collect();
            prop_assert_eq!(kept.as_slice(), tail);
        }

        #[test]
        fn prop_complete_exchanges_start_at_user(roles in arb_roles(), count in 1usize..4) {
            let mut state = ConversationState::new();
            for role in &roles {
                state.append(*role, "x");
            }
            let removed = Retention::CompleteExchanges { count }.removable_ids(state.messages());
            let removed_any = !removed.is_empty();
            state.apply_compaction(&Compaction { summary: "s".into(), removed });

            if removed_any {
                prop_assert_eq!(state.messages().first().map(|t| t.role()), Some(Role::User));
                let users = state.messages().iter().filter(|t| t.role() == Role::User).count();
                prop_assert_eq!(users, count);
            }
        }
    }
}
