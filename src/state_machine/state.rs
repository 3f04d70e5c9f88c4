//! Turn phases and per-turn context

use crate::policy::ContinuationPolicy;
use crate::router::RouteDecision;

/// Where one turn is in `Routing -> Responding -> (Summarizing) -> Terminal`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Routing,
    Responding { route: RouteDecision },
    Summarizing,
    Terminal,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Terminal)
    }
}

/// Inputs the transition function needs besides the thread itself
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub thread_id: String,
    pub policy: ContinuationPolicy,
    /// Append one tool turn per tool invocation before the assistant turn
    pub record_tool_turns: bool,
}

impl TurnContext {
    pub fn new(thread_id: impl Into<String>, policy: ContinuationPolicy) -> Self {
        Self {
            thread_id: thread_id.into(),
            policy,
            record_tool_turns: true,
        }
    }

    #[must_use]
    pub fn with_tool_turns(mut self, record: bool) -> Self {
        self.record_tool_turns = record;
        self
    }
}
