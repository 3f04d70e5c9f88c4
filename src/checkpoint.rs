//! Checkpoint store: per-thread persistence of [`ConversationState`]
//!
//! The store is the engine's only shared mutable resource. `load` of an
//! unknown thread is `Ok(None)`; the orchestrator creates the state on first
//! use and the first `save` makes it durable.

use crate::thread::ConversationState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("checkpoint backend failed: {0}")]
    Backend(String),
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, CheckpointError>;

    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), CheckpointError>;
}

/// Stored form of one thread
#[derive(Debug, Clone)]
struct Checkpoint {
    json: String,
    saved_at: DateTime<Utc>,
    version: u64,
}

/// Process-lifetime store. States are kept serialized so a resume goes
/// through the same encoding a durable backend would.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: RwLock<HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saves for `thread_id`; 0 if never saved
    pub async fn version(&self, thread_id: &str) -> u64 {
        self.checkpoints
            .read()
            .await
            .get(thread_id)
            .map_or(0, |c| c.version)
    }

    pub async fn saved_at(&self, thread_id: &str) -> Option<DateTime<Utc>> {
        self.checkpoints
            .read()
            .await
            .get(thread_id)
            .map(|c| c.saved_at)
    }

    pub async fn thread_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.checkpoints.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, CheckpointError> {
        let checkpoints = self.checkpoints.read().await;
        match checkpoints.get(thread_id) {
            Some(checkpoint) => Ok(Some(serde_json::from_str(&checkpoint.json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), CheckpointError> {
        let json = serde_json::to_string(state)?;
        let mut checkpoints = self.checkpoints.write().await;
        let version = checkpoints.get(thread_id).map_or(0, |c| c.version) + 1;
        checkpoints.insert(
            thread_id.to_string(),
            Checkpoint {
                json,
                saved_at: Utc::now(),
                version,
            },
        );
        tracing::debug!(thread_id = %thread_id, version, turns = state.len(), "Checkpoint saved");
        Ok(())
    }
}
