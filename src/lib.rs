//! Parley - a conversational orchestration engine
//!
//! Each user turn is routed to one of three responders (conversation with
//! tools, coding help, storytelling), answered, and appended to a per-thread
//! history that is compacted into a running summary once it grows past a
//! threshold. Threads are checkpointed so they can be resumed by id.

pub mod checkpoint;
pub mod compactor;
pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod policy;
pub mod prompts;
pub mod responder;
pub mod router;
pub mod state_machine;
pub mod thread;
pub mod tools;

#[cfg(test)]
mod testing;

pub use checkpoint::{CheckpointStore, InMemoryCheckpointStore};
pub use config::EngineConfig;
pub use error::EngineError;
pub use orchestrator::{Orchestrator, TurnOutcome};
pub use router::RouteDecision;
