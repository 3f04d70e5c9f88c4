//! Model registry: model id -> service

use super::{LlmError, LlmService, LoggingService, OllamaService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Registry of available model services
#[derive(Default)]
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
}

impl ModelRegistry {
    /// Create an empty registry (tests register their own services)
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// One Ollama service per distinct model id, each wrapped with logging
    pub fn for_ollama<'a>(
        base_url: &str,
        model_ids: impl IntoIterator<Item = &'a str>,
        request_timeout: Duration,
    ) -> Self {
        let mut registry = Self::new_empty();
        for model_id in model_ids {
            if registry.services.contains_key(model_id) {
                continue;
            }
            let service = Arc::new(OllamaService::new(base_url, model_id, request_timeout));
            registry.register(Arc::new(LoggingService::new(service)));
        }
        registry
    }

    /// Register a service under its own model id, replacing any previous one
    pub fn register(&mut self, service: Arc<dyn LlmService>) {
        tracing::debug!(model = %service.model_id(), "Registering model service");
        self.services.insert(service.model_id().to_string(), service);
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Like [`get`](Self::get) but an unknown id is an error
    pub fn resolve(&self, model_id: &str) -> Result<Arc<dyn LlmService>, LlmError> {
        self.get(model_id)
            .ok_or_else(|| LlmError::invalid_request(format!("No model registered as {model_id}")))
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }
}
