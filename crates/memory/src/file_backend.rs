//! File-based conversation store: one JSON file per conversation.
//!
//! Storage location: `<memory_dir>/<conversation-id>.json`
//!
//! Every append rewrites the whole file. The new content is written to a
//! sibling temp file and renamed over the old one, so a reader sees either
//! the previous record or the new one, never a half-written file.

use async_trait::async_trait;
use doppel_core::error::StoreError;
use doppel_core::message::{ConversationHistory, ConversationId, Turn};
use doppel_core::store::ConversationStore;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::record;

/// A directory of per-conversation JSON records.
pub struct LocalFileStore {
    dir: PathBuf,
}

impl LocalFileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "Local conversation store ready");
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The record path for one conversation.
    pub fn path_for(&self, id: &ConversationId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read(&self, id: &ConversationId) -> Result<ConversationHistory, StoreError> {
        let path = self.path_for(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(record::decode_or_empty(id, &bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConversationHistory::new()),
            Err(e) => Err(StoreError::StorageUnavailable(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn write(&self, id: &ConversationId, history: &ConversationHistory) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            StoreError::StorageUnavailable(format!("Failed to create memory directory: {e}"))
        })?;

        let bytes = record::encode(history)?;
        let target = self.path_for(id);
        let tmp = self.dir.join(format!(".{id}.{}.tmp", Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::StorageUnavailable(format!(
                "Failed to write conversation record: {e}"
            )));
        }

        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::StorageUnavailable(format!(
                "Failed to replace {}: {e}",
                target.display()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ConversationStore for LocalFileStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn get(&self, id: &ConversationId) -> Result<ConversationHistory, StoreError> {
        self.read(id).await
    }

    async fn append(&self, id: &ConversationId, turns: &[Turn]) -> Result<(), StoreError> {
        let mut history = self.read(id).await?;
        history
            .extend(turns)
            .map_err(|reason| StoreError::OutOfSequence {
                conversation_id: id.to_string(),
                reason,
            })?;
        self.write(id, &history).await?;
        debug!(conversation_id = %id, turns = history.len(), "Conversation record written");
        Ok(())
    }
}
