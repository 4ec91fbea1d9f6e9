//! Session coordinator: runs one chat exchange end to end.
//!
//! Each request moves through:
//!
//! ```text
//! Start → HistoryLoaded → ContextAssembled → Inferred → Persisted → Done
//!   └──────────────┴──────────────┴─────────────┴───────────┴──→ Failed
//! ```
//!
//! Requests for the same conversation are serialized by a per-id async
//! mutex held from the history read to the append. Different conversations
//! never wait on each other.

use chrono::Utc;
use doppel_config::SessionConfig;
use doppel_core::error::{InferenceError, SessionError};
use doppel_core::message::{ConversationHistory, ConversationId, Role, Turn};
use doppel_core::persona::PersonaProfile;
use doppel_core::provider::InferenceGateway;
use doppel_core::store::ConversationStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::context::ContextAssembler;

/// Where a request is in its lifecycle. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Start,
    HistoryLoaded,
    ContextAssembled,
    Inferred,
    Persisted,
    Done,
    Failed,
}

impl std::fmt::Display for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::HistoryLoaded => "history_loaded",
            Self::ContextAssembled => "context_assembled",
            Self::Inferred => "inferred",
            Self::Persisted => "persisted",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Tunables for the coordinator.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Turns of history included in each prompt.
    pub window_size: usize,
    /// Longest accepted user message, in characters.
    pub max_message_chars: usize,
    /// Bound on each store call.
    pub storage_timeout: Duration,
    /// Bound on the inference call.
    pub inference_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            window_size: config.window_size,
            max_message_chars: config.max_message_chars,
            storage_timeout: Duration::from_secs(config.storage_timeout_secs),
            inference_timeout: Duration::from_secs(config.inference_timeout_secs),
        }
    }
}

/// Orchestrates load → assemble → infer → persist for each message.
pub struct SessionCoordinator {
    persona: Arc<PersonaProfile>,
    store: Arc<dyn ConversationStore>,
    gateway: Arc<dyn InferenceGateway>,
    options: SessionOptions,
    // TODO: evict idle entries; the map holds one mutex per id ever seen.
    locks: Mutex<HashMap<ConversationId, Arc<AsyncMutex<()>>>>,
}

impl SessionCoordinator {
    pub fn new(
        persona: Arc<PersonaProfile>,
        store: Arc<dyn ConversationStore>,
        gateway: Arc<dyn InferenceGateway>,
        options: SessionOptions,
    ) -> Self {
        Self {
            persona,
            store,
            gateway,
            options,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn persona(&self) -> &PersonaProfile {
        &self.persona
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn gateway(&self) -> &Arc<dyn InferenceGateway> {
        &self.gateway
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Handle one user message and return the persona's reply.
    ///
    /// On success both the user turn and the reply are persisted together.
    /// On any failure the stored history is left exactly as it was.
    pub async fn handle_message(
        &self,
        id: &ConversationId,
        user_text: &str,
    ) -> Result<String, SessionError> {
        self.validate(user_text)?;

        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let started = Instant::now();
        let mut stage = SessionStage::Start;
        let result = self.run(id, user_text, &mut stage).await;

        match &result {
            Ok(reply) => info!(
                conversation_id = %id,
                stage = %SessionStage::Done,
                reply_chars = reply.chars().count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Message handled"
            ),
            Err(e) => warn!(
                conversation_id = %id,
                stage = %SessionStage::Failed,
                failed_after = %stage,
                error = %e,
                "Message failed"
            ),
        }
        result
    }

    /// Read the stored history of a conversation.
    pub async fn history(&self, id: &ConversationId) -> Result<ConversationHistory, SessionError> {
        self.load(id).await
    }

    fn validate(&self, user_text: &str) -> Result<(), SessionError> {
        if user_text.trim().is_empty() {
            return Err(SessionError::InvalidInput("message must not be empty".into()));
        }
        let chars = user_text.chars().count();
        if chars > self.options.max_message_chars {
            return Err(SessionError::InvalidInput(format!(
                "message is {chars} characters, the limit is {}",
                self.options.max_message_chars
            )));
        }
        Ok(())
    }

    async fn run(
        &self,
        id: &ConversationId,
        user_text: &str,
        stage: &mut SessionStage,
    ) -> Result<String, SessionError> {
        let history = self.load(id).await?;
        advance(stage, SessionStage::HistoryLoaded, id);

        let user_turn = Turn::at(Role::User, user_text, history.next_timestamp());
        let payload = ContextAssembler::assemble(
            &self.persona,
            &history,
            &user_turn,
            self.options.window_size,
        );
        debug!(
            conversation_id = %id,
            history_turns = history.len(),
            blocks = payload.blocks.len(),
            chars = payload.char_count(),
            "Prompt assembled"
        );
        advance(stage, SessionStage::ContextAssembled, id);

        let reply = tokio::time::timeout(self.options.inference_timeout, self.gateway.infer(&payload))
            .await
            .map_err(|_| {
                InferenceError::timeout(format!(
                    "no reply within {}s",
                    self.options.inference_timeout.as_secs()
                ))
            })??;
        advance(stage, SessionStage::Inferred, id);

        let reply_at = Utc::now().max(user_turn.timestamp);
        let assistant_turn = Turn::at(Role::Assistant, reply.clone(), reply_at);

        tokio::time::timeout(
            self.options.storage_timeout,
            self.store.append(id, &[user_turn, assistant_turn]),
        )
        .await
        .map_err(|_| SessionError::Unavailable("conversation store timed out on write".into()))??;
        advance(stage, SessionStage::Persisted, id);

        Ok(reply)
    }

    async fn load(&self, id: &ConversationId) -> Result<ConversationHistory, SessionError> {
        let history = tokio::time::timeout(self.options.storage_timeout, self.store.get(id))
            .await
            .map_err(|_| SessionError::Unavailable("conversation store timed out on read".into()))??;
        Ok(history)
    }

    fn lock_for(&self, id: &ConversationId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(id.clone()).or_default().clone()
    }
}

fn advance(stage: &mut SessionStage, next: SessionStage, id: &ConversationId) {
    debug!(conversation_id = %id, from = %stage, to = %next, "Session stage");
    *stage = next;
}
