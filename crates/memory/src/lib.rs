//! Conversation store implementations for Doppel.

pub mod file_backend;
pub mod in_memory;
pub mod object_backend;
pub mod record;

pub use file_backend::LocalFileStore;
pub use in_memory::InMemoryStore;
pub use object_backend::RemoteObjectStore;

use doppel_config::StorageConfig;
use doppel_core::error::StoreError;
use doppel_core::store::{ConversationStore, StorageKind};
use std::sync::Arc;

/// Build the configured conversation store.
pub fn build_from_config(config: &StorageConfig) -> Result<Arc<dyn ConversationStore>, StoreError> {
    let store: Arc<dyn ConversationStore> = match config.backend {
        StorageKind::Local => Arc::new(LocalFileStore::new(&config.memory_dir)),
        StorageKind::Remote => Arc::new(RemoteObjectStore::s3(config)?),
        StorageKind::Memory => Arc::new(InMemoryStore::new()),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_each_local_backend() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = StorageConfig {
            memory_dir: tmp.path().display().to_string(),
            ..StorageConfig::default()
        };
        assert_eq!(build_from_config(&config).unwrap().name(), "local");

        config.backend = StorageKind::Memory;
        assert_eq!(build_from_config(&config).unwrap().name(), "memory");
    }

    #[test]
    fn builds_remote_backend_with_endpoint() {
        let config = StorageConfig {
            backend: StorageKind::Remote,
            bucket: "doppel-test".into(),
            prefix: "chats/".into(),
            region: Some("eu-west-1".into()),
            endpoint: Some("http://localhost:9000".into()),
            ..StorageConfig::default()
        };
        assert_eq!(build_from_config(&config).unwrap().name(), "remote");
    }
}
