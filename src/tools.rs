//! Tools the conversational responder may invoke
//!
//! Tools are stateless singletons. Each declares a JSON schema for its
//! arguments and validates incoming arguments against a typed record before
//! doing any work; a schema violation is [`ToolError::InvalidArguments`],
//! never a generic failure.

mod roll_dice;

pub use roll_dice::RollDiceTool;

use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Tool failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },
}

impl ToolError {
    pub fn invalid(tool: &str, reason: impl Into<String>) -> Self {
        ToolError::InvalidArguments {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }
}

/// Deserialize tool arguments into their typed record
pub fn parse_arguments<T: DeserializeOwned>(tool: &str, input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::invalid(tool, e.to_string()))
}

/// A completed tool call, as seen by the responder that made it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
    pub result: String,
}

impl ToolInvocation {
    /// Text recorded in the thread for this invocation
    pub fn transcript_line(&self) -> String {
        format!("{}({}) -> {}", self.name, self.arguments, self.result)
    }
}

/// Trait for tools that can be executed by the conversational responder
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for the model
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Validate `input` and execute
    async fn run(&self, input: Value) -> Result<String, ToolError>;
}

/// Collection of tools available to the conversational responder
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with no tools
    pub fn empty() -> Self {
        Self::default()
    }

    /// Standard tool set
    pub fn standard() -> Self {
        Self::empty().with_tool(Arc::new(RollDiceTool))
    }

    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        tracing::debug!(tool = %tool.name(), "Registering tool");
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Get tool definitions for the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Invoke a tool by name
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<ToolInvocation, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        match tool.run(arguments.clone()).await {
            Ok(result) => {
                tracing::info!(tool = %name, "Tool completed");
                Ok(ToolInvocation {
                    name: name.to_string(),
                    arguments,
                    result,
                })
            }
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool failed");
                Err(e)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseInteger {
    Int(i64),
    Text(String),
}

/// Deserialize an integer that a model may have sent as a string
pub(crate) fn loose_integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match LooseInteger::deserialize(deserializer)? {
        LooseInteger::Int(n) => Ok(n),
        LooseInteger::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected an integer, got {s:?}"))),
    }
}
