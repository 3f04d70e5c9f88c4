//! Effects produced by state transitions

use crate::router::RouteDecision;

/// Work the orchestrator must perform after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Classify the latest user turn
    Route,

    /// Run the responder for `route`
    Respond { route: RouteDecision },

    /// Summarize and prune the thread
    Compact,

    /// Persist the state carried by the transition result
    Commit,
}
