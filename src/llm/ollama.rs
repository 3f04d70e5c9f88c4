//! Ollama provider implementation (`/api/chat`, non-streaming)

use super::types::{ContentBlock, LlmMessage, LlmRequest, LlmResponse, MessageRole, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama chat service bound to one model
pub struct OllamaService {
    client: Client,
    endpoint: String,
    model_id: String,
}

impl OllamaService {
    pub fn new(base_url: &str, model_id: impl Into<String>, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                Client::new()
            });

        Self {
            client,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model_id: model_id.into(),
        }
    }

    fn translate_request(&self, request: &LlmRequest) -> OllamaRequest {
        let mut messages = Vec::new();

        if !request.system.is_empty() {
            messages.push(OllamaMessage::plain("system", request.system_text()));
        }

        for msg in &request.messages {
            messages.extend(Self::translate_message(msg));
        }

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| OllamaTool {
                        r#type: "function".to_string(),
                        function: OllamaFunction {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.input_schema.clone(),
                        },
                    })
                    .collect(),
            )
        };

        OllamaRequest {
            model: self.model_id.clone(),
            messages,
            tools,
            stream: false,
            options: request.max_tokens.map(|n| OllamaOptions { num_predict: n }),
        }
    }

    /// Translate a message to Ollama format.
    /// Returns a Vec because tool results need separate messages with role "tool".
    fn translate_message(msg: &LlmMessage) -> Vec<OllamaMessage> {
        let role = match msg.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };

        let mut text_parts = Vec::new();
        let mut tool_calls = Vec::new();
        let mut tool_results = Vec::new();

        for block in &msg.content {
            match block {
                ContentBlock::Text { text } => text_parts.push(text.clone()),
                ContentBlock::ToolUse { name, input, .. } => {
                    tool_calls.push(OllamaToolCall {
                        function: OllamaFunctionCall {
                            name: name.clone(),
                            arguments: input.clone(),
                        },
                    });
                }
                ContentBlock::ToolResult {
                    content, is_error, ..
                } => {
                    tool_results.push(if *is_error {
                        format!("Error: {content}")
                    } else {
                        content.clone()
                    });
                }
            }
        }

        let mut messages = Vec::new();

        if !text_parts.is_empty() || !tool_calls.is_empty() {
            messages.push(OllamaMessage {
                role: role.to_string(),
                content: text_parts.join("\n"),
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls)
                },
            });
        }

        for content in tool_results {
            messages.push(OllamaMessage::plain("tool", content));
        }

        if messages.is_empty() {
            messages.push(OllamaMessage::plain(role, String::new()));
        }

        messages
    }

    fn normalize_response(resp: OllamaResponse) -> LlmResponse {
        let mut content = Vec::new();

        if !resp.message.content.is_empty() {
            content.push(ContentBlock::Text {
                text: resp.message.content,
            });
        }

        // Ollama does not assign call ids; synthesize positional ones
        for (index, tc) in resp
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .enumerate()
        {
            if tc.function.name.is_empty() {
                continue;
            }
            content.push(ContentBlock::ToolUse {
                id: format!("call_{index}"),
                name: tc.function.name,
                input: tc.function.arguments,
            });
        }

        let has_tool_calls = content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }));

        LlmResponse {
            content,
            end_turn: resp.done && !has_tool_calls,
            usage: Usage {
                input_tokens: resp.prompt_eval_count.unwrap_or(0),
                output_tokens: resp.eval_count.unwrap_or(0),
            },
        }
    }
}

#[async_trait]
impl LlmService for OllamaService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = self.translate_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::timeout(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OllamaErrorResponse>(&text)
                .map_or(text, |err| err.error);
            return Err(match status.as_u16() {
                401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
                429 => {
                    let err = LlmError::rate_limit(format!("Rate limit exceeded: {message}"));
                    match retry_after {
                        Some(after) => err.with_retry_after(after),
                        None => err,
                    }
                }
                400 | 404 => LlmError::invalid_request(format!("Invalid request: {message}")),
                500..=599 => LlmError::server_error(format!("Server error: {message}")),
                _ => LlmError::unknown(format!("HTTP {status}: {message}")),
            });
        }

        let parsed: OllamaResponse = serde_json::from_str(&text).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {text}"))
        })?;

        Ok(Self::normalize_response(parsed))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OllamaTool>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

impl OllamaMessage {
    fn plain(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content,
            tool_calls: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    r#type: String,
    function: OllamaFunction,
}

#[derive(Debug, Serialize)]
struct OllamaFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorResponse {
    error: String,
}
