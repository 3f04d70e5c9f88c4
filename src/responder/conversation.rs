//! General conversational responder with tool use

use super::{complete_within, history_messages, Reply, Responder, ResponderError, ResponderLimits};
use crate::llm::{ContentBlock, LlmMessage, LlmRequest, LlmService, MessageRole, SystemContent};
use crate::prompts::{summary_context, CONVERSATION_PREAMBLE};
use crate::router::RouteDecision;
use crate::thread::ConversationState;
use crate::tools::{ToolInvocation, ToolRegistry};
use async_trait::async_trait;
use std::sync::Arc;

/// Sees the whole retained history plus the running summary. May call tools
/// for up to `max_tool_round_trips` rounds; after that one more request is
/// made with no tools offered, so the model has to answer in text.
pub struct ConversationResponder {
    llm: Arc<dyn LlmService>,
    tools: ToolRegistry,
    limits: ResponderLimits,
}

impl ConversationResponder {
    pub fn new(llm: Arc<dyn LlmService>, tools: ToolRegistry, limits: ResponderLimits) -> Self {
        Self { llm, tools, limits }
    }

    fn system_prompt(state: &ConversationState) -> Vec<SystemContent> {
        let mut system = vec![SystemContent::new(CONVERSATION_PREAMBLE)];
        if !state.summary().is_empty() {
            system.push(SystemContent::new(summary_context(state.summary())));
        }
        system
    }

    async fn run_tools(
        &self,
        response_content: &[ContentBlock],
        invocations: &mut Vec<ToolInvocation>,
    ) -> Result<LlmMessage, ResponderError> {
        let limit = self.limits.call_timeout;
        let mut results = Vec::new();

        for block in response_content {
            let ContentBlock::ToolUse { id, name, input } = block else {
                continue;
            };
            let invocation = tokio::time::timeout(limit, self.tools.invoke(name, input.clone()))
                .await
                .map_err(|_| ResponderError::Timeout {
                    stage: format!("tool {name}"),
                    after: limit,
                })??;
            results.push(ContentBlock::tool_result(id, &invocation.result, false));
            invocations.push(invocation);
        }

        Ok(LlmMessage {
            role: MessageRole::User,
            content: results,
        })
    }
}

#[async_trait]
impl Responder for ConversationResponder {
    fn route(&self) -> RouteDecision {
        RouteDecision::Conversation
    }

    async fn respond(&self, state: &ConversationState) -> Result<Reply, ResponderError> {
        if state.latest_user_turn().is_none() {
            return Err(ResponderError::NoUserTurn);
        }

        let (history_system, mut messages) = history_messages(state.messages());
        let mut system = Self::system_prompt(state);
        system.extend(history_system);

        let mut invocations = Vec::new();
        let mut rounds = 0;

        loop {
            let tools = if rounds < self.limits.max_tool_round_trips {
                self.tools.definitions()
            } else {
                Vec::new()
            };
            let tools_offered = !tools.is_empty();

            let request = LlmRequest {
                system: system.clone(),
                messages: messages.clone(),
                tools,
                max_tokens: None,
            };
            let response =
                complete_within(self.llm.as_ref(), &request, self.limits.call_timeout).await?;

            if !tools_offered || !response.has_tool_use() {
                if response.has_tool_use() {
                    tracing::warn!(
                        rounds,
                        "Model requested tools after the round-trip cap; ignoring"
                    );
                }
                return Ok(Reply {
                    route: RouteDecision::Conversation,
                    content: response.text(),
                    tool_invocations: invocations,
                });
            }

            rounds += 1;
            tracing::debug!(round = rounds, calls = response.tool_uses().len(), "Running tools");

            let results = self.run_tools(&response.content, &mut invocations).await?;
            messages.push(LlmMessage {
                role: MessageRole::Assistant,
                content: response.content,
            });
            messages.push(results);
        }
    }
}
