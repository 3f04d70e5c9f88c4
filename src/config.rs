//! Engine configuration, read from `PARLEY_*` environment variables

use crate::llm::DEFAULT_OLLAMA_URL;
use crate::policy::DEFAULT_SUMMARIZE_AFTER;
use crate::responder::{ResponderLimits, DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_TOOL_ROUND_TRIPS};
use crate::router::UnroutablePolicy;
use crate::thread::Retention;
use std::str::FromStr;
use std::time::Duration;

/// Model identifier for each role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAssignments {
    pub router: String,
    pub chat: String,
    pub code: String,
    pub story: String,
    pub summary: String,
}

impl Default for ModelAssignments {
    fn default() -> Self {
        Self {
            router: "llama3.2".to_string(),
            chat: "llama3.2".to_string(),
            code: "codellama".to_string(),
            story: "mistral".to_string(),
            summary: "llama3.2".to_string(),
        }
    }
}

impl ModelAssignments {
    pub fn all(&self) -> [&str; 5] {
        [
            self.router.as_str(),
            self.chat.as_str(),
            self.code.as_str(),
            self.story.as_str(),
            self.summary.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub ollama_url: String,
    pub models: ModelAssignments,
    pub summarize_after: usize,
    pub max_tool_round_trips: usize,
    pub call_timeout: Duration,
    pub unroutable: UnroutablePolicy,
    pub retention: Retention,
    pub record_tool_turns: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            models: ModelAssignments::default(),
            summarize_after: DEFAULT_SUMMARIZE_AFTER,
            max_tool_round_trips: DEFAULT_MAX_TOOL_ROUND_TRIPS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            unroutable: UnroutablePolicy::default(),
            retention: Retention::default(),
            record_tool_turns: true,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or unparsable values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let models = ModelAssignments {
            router: text("PARLEY_ROUTER_MODEL", defaults.models.router),
            chat: text("PARLEY_CHAT_MODEL", defaults.models.chat),
            code: text("PARLEY_CODE_MODEL", defaults.models.code),
            story: text("PARLEY_STORY_MODEL", defaults.models.story),
            summary: text("PARLEY_SUMMARY_MODEL", defaults.models.summary),
        };

        Self {
            ollama_url: text("PARLEY_OLLAMA_URL", defaults.ollama_url),
            models,
            summarize_after: parsed(&lookup, "PARLEY_SUMMARIZE_AFTER", defaults.summarize_after),
            max_tool_round_trips: parsed(
                &lookup,
                "PARLEY_MAX_TOOL_ROUND_TRIPS",
                defaults.max_tool_round_trips,
            ),
            call_timeout: Duration::from_secs(parsed(
                &lookup,
                "PARLEY_CALL_TIMEOUT_SECS",
                defaults.call_timeout.as_secs(),
            )),
            unroutable: parsed(&lookup, "PARLEY_UNROUTABLE", defaults.unroutable),
            retention: lookup("PARLEY_RETENTION")
                .and_then(|v| parse_retention(&v))
                .unwrap_or(defaults.retention),
            record_tool_turns: defaults.record_tool_turns,
        }
    }

    pub fn responder_limits(&self) -> ResponderLimits {
        ResponderLimits {
            max_tool_round_trips: self.max_tool_round_trips,
            call_timeout: self.call_timeout,
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

fn parse_retention(raw: &str) -> Option<Retention> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "last_turns" => Some(Retention::LastTurns { count: 2 }),
        "complete_exchanges" => Some(Retention::CompleteExchanges { count: 2 }),
        other => {
            tracing::warn!(value = %other, "Unknown PARLEY_RETENTION, using default");
            None
        }
    }
}
