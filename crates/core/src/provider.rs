//! Inference gateway trait: the abstraction over LLM backends.
//!
//! A gateway knows how to send an assembled [`PromptPayload`] to a model
//! and get the reply text back. It makes exactly one attempt and classifies
//! any failure as an [`InferenceError`]; retry policy belongs to callers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;
use crate::message::{Role, Turn};

/// Role of a block in the prompt sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl From<Role> for PromptRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
        }
    }
}

/// One role-tagged message block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBlock {
    pub role: PromptRole,
    pub content: String,
}

impl PromptBlock {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }
}

impl From<&Turn> for PromptBlock {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.into(),
            content: turn.content.clone(),
        }
    }
}

/// The ordered system + history + new-message bundle for one request.
/// Built per request, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPayload {
    pub blocks: Vec<PromptBlock>,
}

impl PromptPayload {
    /// Total characters across all blocks (a rough size signal for logs).
    pub fn char_count(&self) -> usize {
        self.blocks.iter().map(|b| b.content.len()).sum()
    }
}

/// The core InferenceGateway trait.
///
/// The session coordinator calls `infer()` without knowing which backend
/// answers, so tests can substitute a deterministic stub.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// A human-readable name for this gateway (e.g., "openai").
    fn name(&self) -> &str;

    /// The model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Send the payload and return the generated reply text.
    async fn infer(&self, payload: &PromptPayload) -> std::result::Result<String, InferenceError>;

    /// Health check: can we reach the endpoint?
    async fn health_check(&self) -> std::result::Result<bool, InferenceError> {
        Ok(true)
    }
}
