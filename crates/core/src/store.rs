//! Conversation store trait: durable per-conversation history.
//!
//! A store maps a [`ConversationId`] to its [`ConversationHistory`]. It
//! supports exactly two operations:
//! - `get`: read the whole history (empty for unknown ids)
//! - `append`: add turns atomically for one id
//!
//! Backends: local filesystem, remote object storage, in-memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::message::{ConversationHistory, ConversationId, Turn};

/// Which storage backend to use. Resolved once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// One JSON file per conversation in a local directory.
    #[default]
    Local,
    /// One object per conversation in an S3-compatible bucket.
    Remote,
    /// Process memory only; lost on exit.
    Memory,
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Memory => "memory",
        })
    }
}

impl std::str::FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" | "s3" => Ok(Self::Remote),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "unknown storage backend '{other}' (expected local, remote or memory)"
            )),
        }
    }
}

/// The core ConversationStore trait.
///
/// `get` must never fail for a well-formed id except when the backend
/// itself is unreachable; an unreadable record is logged and treated as an
/// empty history. `append` must be atomic per id: a concurrent reader sees
/// the history either before or after the append, never in between.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g., "local", "remote", "memory").
    fn name(&self) -> &str;

    /// Read the full history of a conversation.
    async fn get(&self, id: &ConversationId) -> std::result::Result<ConversationHistory, StoreError>;

    /// Append turns to a conversation, in order.
    async fn append(&self, id: &ConversationId, turns: &[Turn]) -> std::result::Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_kind_parses() {
        assert_eq!("local".parse::<StorageKind>().unwrap(), StorageKind::Local);
        assert_eq!("S3".parse::<StorageKind>().unwrap(), StorageKind::Remote);
        assert_eq!(" memory ".parse::<StorageKind>().unwrap(), StorageKind::Memory);
        assert!("sqlite".parse::<StorageKind>().is_err());
    }

    #[test]
    fn storage_kind_serde_lowercase() {
        let json = serde_json::to_string(&StorageKind::Remote).unwrap();
        assert_eq!(json, "\"remote\"");
    }
}
