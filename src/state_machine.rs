//! Per-turn orchestration state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions. The
//! orchestrator performs each [`Effect`] and feeds the outcome back in as an
//! [`Event`]; nothing in this module does I/O.

mod effect;
mod event;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{Phase, TurnContext};
pub use transition::{begin, transition, TransitionError, TransitionResult};
