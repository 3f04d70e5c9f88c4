//! Responders: handlers that turn conversation state into the next assistant turn
//!
//! Responders never touch the thread. They read a [`ConversationState`] and
//! return a [`Reply`]; the state machine appends it.

mod conversation;
mod single_shot;

pub use conversation::ConversationResponder;
pub use single_shot::SingleShotResponder;

use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmResponse, LlmService, SystemContent};
use crate::router::RouteDecision;
use crate::thread::{ConversationState, Role, Turn};
use crate::tools::{ToolError, ToolInvocation};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAX_TOOL_ROUND_TRIPS: usize = 4;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Output of one responder run
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub route: RouteDecision,
    pub content: String,
    /// Tool calls made while producing the reply, in call order
    pub tool_invocations: Vec<ToolInvocation>,
}

impl Reply {
    pub fn text(route: RouteDecision, content: impl Into<String>) -> Self {
        Self {
            route,
            content: content.into(),
            tool_invocations: Vec::new(),
        }
    }
}

/// Responder failure
#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("thread has no user turn to respond to")]
    NoUserTurn,
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("responder model failed: {0}")]
    Upstream(#[from] LlmError),
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: String, after: Duration },
}

/// Bounds applied to every responder run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponderLimits {
    /// Model rounds that may request tools before a tool-less final request
    pub max_tool_round_trips: usize,
    /// Applied to each model call and each tool call separately
    pub call_timeout: Duration,
}

impl Default for ResponderLimits {
    fn default() -> Self {
        Self {
            max_tool_round_trips: DEFAULT_MAX_TOOL_ROUND_TRIPS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

#[async_trait]
pub trait Responder: Send + Sync {
    /// Category this responder serves
    fn route(&self) -> RouteDecision;

    async fn respond(&self, state: &ConversationState) -> Result<Reply, ResponderError>;
}

/// One responder per route
#[derive(Clone)]
pub struct ResponderSet {
    conversation: Arc<dyn Responder>,
    coding: Arc<dyn Responder>,
    story: Arc<dyn Responder>,
}

impl ResponderSet {
    pub fn new(
        conversation: Arc<dyn Responder>,
        coding: Arc<dyn Responder>,
        story: Arc<dyn Responder>,
    ) -> Self {
        Self {
            conversation,
            coding,
            story,
        }
    }

    pub fn for_route(&self, route: RouteDecision) -> &dyn Responder {
        match route {
            RouteDecision::Conversation => self.conversation.as_ref(),
            RouteDecision::HelpWithCoding => self.coding.as_ref(),
            RouteDecision::TellAStory => self.story.as_ref(),
        }
    }
}

/// Map thread turns onto model messages.
///
/// System turns are returned separately since they belong in the system
/// prompt rather than the message list.
pub(crate) fn history_messages(turns: &[Turn]) -> (Vec<SystemContent>, Vec<LlmMessage>) {
    let mut system = Vec::new();
    let mut messages = Vec::with_capacity(turns.len());
    for turn in turns {
        match turn.role() {
            Role::System => system.push(SystemContent::new(turn.content())),
            Role::User => messages.push(LlmMessage::user(turn.content())),
            Role::Assistant => messages.push(LlmMessage::assistant(turn.content())),
            Role::Tool => messages.push(LlmMessage::tool(turn.content())),
        }
    }
    (system, messages)
}

/// Run one model call under a deadline
pub(crate) async fn complete_within(
    llm: &dyn LlmService,
    request: &LlmRequest,
    limit: Duration,
) -> Result<LlmResponse, ResponderError> {
    match tokio::time::timeout(limit, llm.complete(request)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ResponderError::Timeout {
            stage: format!("model {}", llm.model_id()),
            after: limit,
        }),
    }
}
