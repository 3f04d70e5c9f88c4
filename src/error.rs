//! Caller-facing error taxonomy

use crate::checkpoint::CheckpointError;
use crate::compactor::CompactionError;
use crate::llm::LlmError;
use crate::responder::ResponderError;
use crate::router::RouteError;
use crate::state_machine::TransitionError;
use crate::tools::ToolError;
use std::time::Duration;
use thiserror::Error;

/// Everything `ask` can fail with. No variant leaves a partially updated
/// thread behind: state is only saved after a turn completes.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("user input is empty")]
    EmptyInput,

    #[error("router answered {raw:?}, which is not a known category")]
    Unroutable { raw: String },

    #[error("invalid arguments for tool {tool}: {reason}")]
    InvalidToolArguments { tool: String, reason: String },

    #[error("tool failed: {0}")]
    Tool(ToolError),

    #[error("upstream model error: {0}")]
    UpstreamModel(#[from] LlmError),

    #[error("compaction failed: {0}")]
    Compaction(CompactionError),

    #[error("checkpoint store error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: String, after: Duration },

    #[error("internal state machine error: {0}")]
    Transition(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ToolError> for EngineError {
    fn from(error: ToolError) -> Self {
        match error {
            ToolError::InvalidArguments { tool, reason } => {
                EngineError::InvalidToolArguments { tool, reason }
            }
            other => EngineError::Tool(other),
        }
    }
}

impl From<RouteError> for EngineError {
    fn from(error: RouteError) -> Self {
        match error {
            RouteError::Unroutable { raw } => EngineError::Unroutable { raw },
            RouteError::Upstream(e) => EngineError::UpstreamModel(e),
            missing @ RouteError::NoUserTurn => EngineError::Internal(missing.to_string()),
        }
    }
}

impl From<ResponderError> for EngineError {
    fn from(error: ResponderError) -> Self {
        match error {
            ResponderError::Tool(e) => e.into(),
            ResponderError::Upstream(e) => EngineError::UpstreamModel(e),
            ResponderError::Timeout { stage, after } => EngineError::Timeout { stage, after },
            missing @ ResponderError::NoUserTurn => EngineError::Internal(missing.to_string()),
        }
    }
}

impl From<CompactionError> for EngineError {
    fn from(error: CompactionError) -> Self {
        EngineError::Compaction(error)
    }
}

impl From<TransitionError> for EngineError {
    fn from(error: TransitionError) -> Self {
        match error {
            TransitionError::EmptyInput => EngineError::EmptyInput,
            TransitionError::InvalidTransition(msg) => EngineError::Transition(msg),
        }
    }
}
