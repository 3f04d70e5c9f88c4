//! Orchestrator: runs one user turn through the state machine
//!
//! Each `ask` loads (or creates) the thread, performs the effects the pure
//! transition function asks for, and saves the resulting state once the
//! machine commits. A failure anywhere before the commit leaves the stored
//! thread exactly as it was. Calls for the same thread are serialized;
//! different threads run independently.

use crate::checkpoint::CheckpointStore;
use crate::compactor::Compactor;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::llm::ModelRegistry;
use crate::policy::ContinuationPolicy;
use crate::responder::{ConversationResponder, ResponderSet, SingleShotResponder};
use crate::router::{RouteDecision, Router};
use crate::state_machine::{begin, transition, Effect, Event, TurnContext};
use crate::thread::ConversationState;
use crate::tools::ToolRegistry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Per-turn behavior shared by every thread
#[derive(Debug, Clone, Copy)]
pub struct TurnSettings {
    pub policy: ContinuationPolicy,
    pub record_tool_turns: bool,
    /// Deadline for the routing and compaction calls
    pub call_timeout: Duration,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            policy: ContinuationPolicy::default(),
            record_tool_turns: true,
            call_timeout: crate::responder::DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Result of one completed turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub route: RouteDecision,
    /// Whether this turn compacted the thread
    pub compacted: bool,
    /// Thread state as saved
    pub state: ConversationState,
}

pub struct Orchestrator {
    router: Router,
    responders: ResponderSet,
    compactor: Compactor,
    store: Arc<dyn CheckpointStore>,
    settings: TurnSettings,
    thread_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        router: Router,
        responders: ResponderSet,
        compactor: Compactor,
        store: Arc<dyn CheckpointStore>,
        settings: TurnSettings,
    ) -> Self {
        Self {
            router,
            responders,
            compactor,
            store,
            settings,
            thread_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Engine backed by Ollama models, as configured
    pub fn from_config(
        config: &EngineConfig,
        store: Arc<dyn CheckpointStore>,
    ) -> Result<Self, EngineError> {
        let registry =
            ModelRegistry::for_ollama(&config.ollama_url, config.models.all(), config.call_timeout);
        Self::from_registry(config, &registry, ToolRegistry::standard(), store)
    }

    /// Engine whose models are looked up in `registry` by the configured ids
    pub fn from_registry(
        config: &EngineConfig,
        registry: &ModelRegistry,
        tools: ToolRegistry,
        store: Arc<dyn CheckpointStore>,
    ) -> Result<Self, EngineError> {
        let limits = config.responder_limits();
        let models = &config.models;

        let router = Router::new(registry.resolve(&models.router)?, config.unroutable);
        let responders = ResponderSet::new(
            Arc::new(ConversationResponder::new(
                registry.resolve(&models.chat)?,
                tools,
                limits,
            )),
            Arc::new(SingleShotResponder::coding(registry.resolve(&models.code)?, limits)),
            Arc::new(SingleShotResponder::story(registry.resolve(&models.story)?, limits)),
        );
        let compactor = Compactor::new(registry.resolve(&models.summary)?, config.retention);

        let settings = TurnSettings {
            policy: ContinuationPolicy::new(config.summarize_after),
            record_tool_turns: config.record_tool_turns,
            call_timeout: config.call_timeout,
        };
        Ok(Self::new(router, responders, compactor, store, settings))
    }

    /// Answer one user turn on `thread_id`
    pub async fn ask(&self, thread_id: &str, text: &str) -> Result<String, EngineError> {
        Ok(self.ask_detailed(thread_id, text).await?.reply)
    }

    pub async fn ask_detailed(&self, thread_id: &str, text: &str) -> Result<TurnOutcome, EngineError> {
        if text.trim().is_empty() {
            return Err(EngineError::EmptyInput);
        }

        let lock = self.thread_lock(thread_id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.run_turn(thread_id, text).await
        };
        drop(lock);
        self.release_thread_lock(thread_id).await;
        outcome
    }

    /// One turn's effect loop. The caller holds the thread's lock.
    async fn run_turn(&self, thread_id: &str, text: &str) -> Result<TurnOutcome, EngineError> {
        let state = self.store.load(thread_id).await?.unwrap_or_default();
        let context = TurnContext::new(thread_id, self.settings.policy)
            .with_tool_turns(self.settings.record_tool_turns);

        let mut result = begin(&state, text)?;
        let mut route = None;
        let mut reply = None;
        let mut compacted = false;

        loop {
            let Some(effect) = result.effects.first().copied() else {
                return Err(EngineError::Transition(format!(
                    "no effect in phase {:?}",
                    result.phase
                )));
            };

            let event = match effect {
                Effect::Route => {
                    let decision = self.within("route", self.router.route(&result.state)).await?;
                    route = Some(decision);
                    Event::Routed { route: decision }
                }
                Effect::Respond { route } => {
                    let responder = self.responders.for_route(route);
                    let answer = responder.respond(&result.state).await?;
                    reply = Some(answer.content.clone());
                    Event::Responded { reply: answer }
                }
                Effect::Compact => {
                    let compaction = self
                        .within("compaction", self.compactor.summarize(&result.state))
                        .await?;
                    compacted = true;
                    Event::Compacted { compaction }
                }
                Effect::Commit => {
                    self.store.save(thread_id, &result.state).await?;
                    break;
                }
            };

            result = transition(&result.phase, &result.state, &context, event)?;
        }

        let (Some(route), Some(reply)) = (route, reply) else {
            return Err(EngineError::Transition(
                "turn committed without routing and responding".to_string(),
            ));
        };

        tracing::info!(
            thread_id = %thread_id,
            route = %route,
            compacted,
            turns = result.state.len(),
            "Turn completed"
        );

        Ok(TurnOutcome {
            reply,
            route,
            compacted,
            state: result.state,
        })
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.thread_locks.lock().await;
        locks.entry(thread_id.to_string()).or_default().clone()
    }

    /// Drop the thread's lock entry once no caller holds or waits on it.
    /// Clones are only taken under the map lock, so a count of one cannot
    /// race with a new caller.
    async fn release_thread_lock(&self, thread_id: &str) {
        let mut locks = self.thread_locks.lock().await;
        if locks
            .get(thread_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(thread_id);
        }
    }

    async fn within<T, E>(
        &self,
        stage: &str,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, EngineError>
    where
        EngineError: From<E>,
    {
        let limit = self.settings.call_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(stage, timeout_ms = %limit.as_millis(), "Call timed out");
                Err(EngineError::Timeout {
                    stage: stage.to_string(),
                    after: limit,
                })
            }
        }
    }
}
