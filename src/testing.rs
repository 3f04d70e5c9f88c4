//! Mock implementations for testing
//!
//! These mocks enable end-to-end testing of the engine without a model server.

use crate::checkpoint::{CheckpointError, CheckpointStore};
use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use crate::thread::ConversationState;
use crate::tools::{Tool, ToolError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock model services
// ============================================================================

/// Mock model that returns queued responses
pub struct MockLlm {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    delay: Option<Duration>,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering every request
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a plain text response
    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse::text_only(text));
    }

    /// Queue a response that calls one tool
    pub fn queue_tool_call(&self, name: &str, input: Value) {
        self.queue_response(LlmResponse {
            content: vec![ContentBlock::tool_use("call_0", name, input)],
            end_turn: false,
            usage: Usage::default(),
        });
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

type Script = Box<dyn Fn(&LlmRequest) -> Result<LlmResponse, LlmError> + Send + Sync>;

/// Mock model whose answer is computed from the request
pub struct ScriptedLlm {
    script: Script,
    model_id: String,
    delay: Option<Duration>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(
        model_id: impl Into<String>,
        script: impl Fn(&LlmRequest) -> Result<LlmResponse, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            model_id: model_id.into(),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering every request
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answers every request with the same text
    pub fn constant(model_id: impl Into<String>, text: &'static str) -> Self {
        Self::new(model_id, move |_| Ok(LlmResponse::text_only(text)))
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.script)(request)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Keyword classifier standing in for the routing model
pub fn keyword_classify(text: &str) -> &'static str {
    let text = text.to_lowercase();
    if ["function", "code", "script", "compile"]
        .iter()
        .any(|k| text.contains(k))
    {
        "help_with_coding"
    } else if text.contains("story") {
        "tell_a_story"
    } else {
        "conversation"
    }
}

/// Routing model that classifies the last user message by keyword
pub fn keyword_router() -> ScriptedLlm {
    ScriptedLlm::new("router", |request| {
        let text = request.last_user_text().unwrap_or_default();
        Ok(LlmResponse::text_only(keyword_classify(&text)))
    })
}

/// Model that echoes the last user message, prefixed with its name
pub fn echo_llm(model_id: &'static str) -> ScriptedLlm {
    ScriptedLlm::new(model_id, move |request| {
        let text = request.last_user_text().unwrap_or_default();
        Ok(LlmResponse::text_only(format!("{model_id}: {text}")))
    })
}

/// Summary model whose answer depends only on what it was sent
pub fn transcript_summarizer() -> ScriptedLlm {
    ScriptedLlm::new("summary", |request| {
        let turns = request.messages.len().saturating_sub(1);
        let last = request
            .messages
            .iter()
            .rev()
            .nth(1)
            .map(crate::llm::LlmMessage::text)
            .unwrap_or_default();
        Ok(LlmResponse::text_only(format!("{turns} turns, ending with {last:?}")))
    })
}

/// Summary model that counts how many times it has been asked
pub fn counting_summarizer() -> ScriptedLlm {
    let calls = AtomicUsize::new(0);
    ScriptedLlm::new("summary", move |_| {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(LlmResponse::text_only(format!("summary #{n}")))
    })
}

// ============================================================================
// Mock tool
// ============================================================================

/// Tool that records its arguments and returns a fixed output
pub struct RecordingTool {
    name: &'static str,
    output: String,
    /// Record of tool executions
    pub calls: Mutex<Vec<Value>>,
}

impl RecordingTool {
    pub fn new(name: &'static str, output: impl Into<String>) -> Self {
        Self {
            name,
            output: output.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> String {
        format!("Mock {}", self.name)
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn run(&self, input: Value) -> Result<String, ToolError> {
        self.calls.lock().unwrap().push(input);
        Ok(self.output.clone())
    }
}

// ============================================================================
// Mock checkpoint store
// ============================================================================

/// Store whose saves always fail
pub struct FailingStore;

#[async_trait]
impl CheckpointStore for FailingStore {
    async fn load(&self, _thread_id: &str) -> Result<Option<ConversationState>, CheckpointError> {
        Ok(None)
    }

    async fn save(&self, _thread_id: &str, _state: &ConversationState) -> Result<(), CheckpointError> {
        Err(CheckpointError::Backend("disk full".to_string()))
    }
}
