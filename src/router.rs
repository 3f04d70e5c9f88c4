//! Router: picks the responder for the latest user turn
//!
//! The routing model is asked for exactly one category token. Its answer is
//! case-normalized and mapped onto the closed [`RouteDecision`] set; anything
//! else is [`RouteError::Unroutable`] unless the configured
//! [`UnroutablePolicy`] says to fall back to conversation.

use crate::llm::{LlmError, LlmRequest, LlmService};
use crate::prompts::ROUTER_PREAMBLE;
use crate::thread::ConversationState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Classification answers are a single token
const ROUTE_MAX_TOKENS: u32 = 16;

/// Responder category for one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDecision {
    Conversation,
    HelpWithCoding,
    TellAStory,
}

impl RouteDecision {
    pub const ALL: [RouteDecision; 3] = [
        RouteDecision::Conversation,
        RouteDecision::HelpWithCoding,
        RouteDecision::TellAStory,
    ];

    /// Wire token the routing model answers with
    pub fn token(self) -> &'static str {
        match self {
            RouteDecision::Conversation => "conversation",
            RouteDecision::HelpWithCoding => "help_with_coding",
            RouteDecision::TellAStory => "tell_a_story",
        }
    }

    /// Map a raw model answer onto a category
    pub fn from_model_output(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        Self::ALL.into_iter().find(|d| d.token() == normalized)
    }
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Strip surrounding whitespace, quotes and punctuation in any order, then
/// lowercase
fn normalize(raw: &str) -> String {
    raw.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '.' | '!') || c.is_whitespace())
        .to_lowercase()
}

/// What to do when the routing model answers outside the category set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnroutablePolicy {
    /// Surface [`RouteError::Unroutable`]
    #[default]
    Reject,
    /// Treat the turn as conversation and log the raw answer
    FallbackToConversation,
}

impl FromStr for UnroutablePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(UnroutablePolicy::Reject),
            "conversation" | "fallback" => Ok(UnroutablePolicy::FallbackToConversation),
            other => Err(format!("unknown unroutable policy: {other}")),
        }
    }
}

/// Routing failure
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("thread has no user turn to route")]
    NoUserTurn,
    #[error("routing model answered {raw:?}, which is not a known category")]
    Unroutable { raw: String },
    #[error("routing model failed: {0}")]
    Upstream(#[from] LlmError),
}

/// Classifies the latest user turn
pub struct Router {
    llm: Arc<dyn LlmService>,
    policy: UnroutablePolicy,
}

impl Router {
    pub fn new(llm: Arc<dyn LlmService>, policy: UnroutablePolicy) -> Self {
        Self { llm, policy }
    }

    pub async fn route(&self, state: &ConversationState) -> Result<RouteDecision, RouteError> {
        let latest = state.latest_user_turn().ok_or(RouteError::NoUserTurn)?;

        let request =
            LlmRequest::single(ROUTER_PREAMBLE, latest.content()).with_max_tokens(ROUTE_MAX_TOKENS);
        let response = self.llm.complete(&request).await?;
        let raw = response.text();

        let decision = self.decide(&raw)?;
        tracing::info!(route = %decision, raw = %raw.trim(), "Route determined");
        Ok(decision)
    }

    fn decide(&self, raw: &str) -> Result<RouteDecision, RouteError> {
        match (RouteDecision::from_model_output(raw), self.policy) {
            (Some(decision), _) => Ok(decision),
            (None, UnroutablePolicy::FallbackToConversation) => {
                tracing::warn!(raw = %raw, "Unroutable model answer, falling back to conversation");
                Ok(RouteDecision::Conversation)
            }
            (None, UnroutablePolicy::Reject) => Err(RouteError::Unroutable {
                raw: raw.to_string(),
            }),
        }
    }
}
