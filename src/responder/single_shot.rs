//! Tool-less responders: one model call with a fixed preamble

use super::{complete_within, Reply, Responder, ResponderError, ResponderLimits};
use crate::llm::{LlmRequest, LlmService};
use crate::prompts::{CODING_PREAMBLE, STORY_PREAMBLE};
use crate::router::RouteDecision;
use crate::thread::ConversationState;
use async_trait::async_trait;
use std::sync::Arc;

/// Answers the latest user turn alone; earlier history and the summary are
/// not sent.
pub struct SingleShotResponder {
    route: RouteDecision,
    preamble: &'static str,
    llm: Arc<dyn LlmService>,
    limits: ResponderLimits,
}

impl SingleShotResponder {
    pub fn coding(llm: Arc<dyn LlmService>, limits: ResponderLimits) -> Self {
        Self {
            route: RouteDecision::HelpWithCoding,
            preamble: CODING_PREAMBLE,
            llm,
            limits,
        }
    }

    pub fn story(llm: Arc<dyn LlmService>, limits: ResponderLimits) -> Self {
        Self {
            route: RouteDecision::TellAStory,
            preamble: STORY_PREAMBLE,
            llm,
            limits,
        }
    }
}

#[async_trait]
impl Responder for SingleShotResponder {
    fn route(&self) -> RouteDecision {
        self.route
    }

    async fn respond(&self, state: &ConversationState) -> Result<Reply, ResponderError> {
        let latest = state
            .latest_user_turn()
            .ok_or(ResponderError::NoUserTurn)?;

        let request = LlmRequest::single(self.preamble, latest.content());
        let response =
            complete_within(self.llm.as_ref(), &request, self.limits.call_timeout).await?;

        Ok(Reply::text(self.route, response.text()))
    }
}
