//! Pure state transition function

use super::{Effect, Event, Phase, TurnContext};
use crate::thread::{ConversationState, Role};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub phase: Phase,
    pub state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(phase: Phase, state: ConversationState) -> Self {
        Self {
            phase,
            state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("user input is empty")]
    EmptyInput,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Start a turn: append the user's text and ask for routing.
///
/// Blank input is rejected here, before any model sees it.
pub fn begin(state: &ConversationState, text: &str) -> Result<TransitionResult, TransitionError> {
    if text.trim().is_empty() {
        return Err(TransitionError::EmptyInput);
    }

    let mut next = state.clone();
    next.append(Role::User, text);
    Ok(TransitionResult::new(Phase::Routing, next).with_effect(Effect::Route))
}

/// Pure transition function
pub fn transition(
    phase: &Phase,
    state: &ConversationState,
    context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (*phase, event) {
        // Routing + Routed -> Responding
        (Phase::Routing, Event::Routed { route }) => {
            Ok(TransitionResult::new(Phase::Responding { route }, state.clone())
                .with_effect(Effect::Respond { route }))
        }

        // Responding + Responded -> Summarizing | Terminal
        (Phase::Responding { route }, Event::Responded { reply }) => {
            if reply.route != route {
                return Err(TransitionError::InvalidTransition(format!(
                    "thread {}: reply from {} while responding for {route}",
                    context.thread_id, reply.route
                )));
            }

            let mut next = state.clone();
            if context.record_tool_turns {
                for invocation in &reply.tool_invocations {
                    next.append(Role::Tool, invocation.transcript_line());
                }
            }
            next.append(Role::Assistant, reply.content);

            if context.policy.should_summarize(&next) {
                Ok(TransitionResult::new(Phase::Summarizing, next).with_effect(Effect::Compact))
            } else {
                Ok(TransitionResult::new(Phase::Terminal, next).with_effect(Effect::Commit))
            }
        }

        // Summarizing + Compacted -> Terminal
        (Phase::Summarizing, Event::Compacted { compaction }) => {
            let mut next = state.clone();
            next.apply_compaction(&compaction);
            Ok(TransitionResult::new(Phase::Terminal, next).with_effect(Effect::Commit))
        }

        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "thread {}: no transition from {phase:?} with event {event:?}",
            context.thread_id
        ))),
    }
}
