//! Object-storage conversation store: one object per conversation in an
//! S3-compatible bucket.
//!
//! Key layout: `<prefix><conversation-id>.json`. The record format is the
//! same JSON array the local backend writes. An object PUT replaces the
//! whole record in one request, so readers never observe a partial append.

use async_trait::async_trait;
use doppel_config::StorageConfig;
use doppel_core::error::StoreError;
use doppel_core::message::{ConversationHistory, ConversationId, Turn};
use doppel_core::store::ConversationStore;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;
use tracing::{debug, info};

use crate::record;

pub struct RemoteObjectStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl RemoteObjectStore {
    /// Wrap any `ObjectStore` implementation.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Build an S3 client from the storage section of the config.
    ///
    /// Credentials come from the usual `AWS_*` environment variables.
    pub fn s3(config: &StorageConfig) -> Result<Self, StoreError> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);

        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let s3 = builder.build().map_err(|e| {
            StoreError::StorageUnavailable(format!("Failed to configure S3 client: {e}"))
        })?;

        info!(bucket = %config.bucket, prefix = %config.prefix, "Remote conversation store ready");
        Ok(Self::new(Arc::new(s3), config.prefix.clone()))
    }

    fn key_for(&self, id: &ConversationId) -> Result<ObjectPath, StoreError> {
        ObjectPath::parse(format!("{}{id}.json", self.prefix)).map_err(|e| {
            StoreError::StorageUnavailable(format!("Invalid object key for '{id}': {e}"))
        })
    }

    async fn read(
        &self,
        id: &ConversationId,
        key: &ObjectPath,
    ) -> Result<ConversationHistory, StoreError> {
        let result = match self.store.get(key).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(ConversationHistory::new()),
            Err(e) => return Err(unavailable("read", key, e)),
        };
        let bytes = result.bytes().await.map_err(|e| unavailable("read", key, e))?;
        Ok(record::decode_or_empty(id, &bytes))
    }
}

fn unavailable(op: &str, key: &ObjectPath, e: object_store::Error) -> StoreError {
    StoreError::StorageUnavailable(format!("Failed to {op} object '{key}': {e}"))
}

#[async_trait]
impl ConversationStore for RemoteObjectStore {
    fn name(&self) -> &str {
        "remote"
    }

    async fn get(&self, id: &ConversationId) -> Result<ConversationHistory, StoreError> {
        let key = self.key_for(id)?;
        self.read(id, &key).await
    }

    async fn append(&self, id: &ConversationId, turns: &[Turn]) -> Result<(), StoreError> {
        let key = self.key_for(id)?;
        let mut history = self.read(id, &key).await?;
        history
            .extend(turns)
            .map_err(|reason| StoreError::OutOfSequence {
                conversation_id: id.to_string(),
                reason,
            })?;

        let bytes = record::encode(&history)?;
        self.store
            .put(&key, PutPayload::from(bytes))
            .await
            .map_err(|e| unavailable("write", &key, e))?;

        debug!(conversation_id = %id, key = %key, turns = history.len(), "Conversation object written");
        Ok(())
    }
}
