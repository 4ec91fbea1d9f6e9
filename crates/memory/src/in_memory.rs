//! In-memory backend: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use doppel_core::error::StoreError;
use doppel_core::message::{ConversationHistory, ConversationId, Turn};
use doppel_core::store::ConversationStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Conversations held in a map for the lifetime of the process.
pub struct InMemoryStore {
    conversations: Arc<RwLock<HashMap<ConversationId, ConversationHistory>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of conversations with at least one stored turn.
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, id: &ConversationId) -> Result<ConversationHistory, StoreError> {
        Ok(self
            .conversations
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, id: &ConversationId, turns: &[Turn]) -> Result<(), StoreError> {
        if turns.is_empty() {
            return Ok(());
        }

        let mut conversations = self.conversations.write().await;
        let history = conversations.entry(id.clone()).or_default();
        history
            .extend(turns)
            .map_err(|reason| StoreError::OutOfSequence {
                conversation_id: id.to_string(),
                reason,
            })
    }
}
