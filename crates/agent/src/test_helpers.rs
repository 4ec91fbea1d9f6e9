//! Shared test doubles for coordinator tests.

use async_trait::async_trait;
use doppel_core::error::{InferenceError, StoreError};
use doppel_core::message::{ConversationHistory, ConversationId, Turn};
use doppel_core::persona::PersonaProfile;
use doppel_core::provider::{InferenceGateway, PromptPayload};
use doppel_core::store::ConversationStore;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub fn sample_persona() -> PersonaProfile {
    PersonaProfile {
        full_name: "Ada Lovelace".into(),
        display_name: "Ada".into(),
        summary: "Mathematician; wrote the first published algorithm.".into(),
        style_guide: "Curious and precise.".into(),
        resume_extract: None,
    }
}

/// A gateway that returns a scripted sequence of outcomes and records every
/// payload it was given.
///
/// Panics if more calls are made than outcomes provided.
pub struct ScriptedGateway {
    outcomes: Mutex<VecDeque<Result<String, InferenceError>>>,
    seen: Mutex<Vec<PromptPayload>>,
}

impl ScriptedGateway {
    pub fn new(outcomes: Vec<Result<String, InferenceError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn payloads(&self) -> Vec<PromptPayload> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn infer(&self, payload: &PromptPayload) -> Result<String, InferenceError> {
        self.seen.lock().unwrap().push(payload.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedGateway: no more outcomes")
    }
}

/// A gateway that sleeps before echoing the last prompt block.
pub struct SlowGateway {
    delay: Duration,
}

impl SlowGateway {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl InferenceGateway for SlowGateway {
    fn name(&self) -> &str {
        "slow"
    }

    fn model(&self) -> &str {
        "slow-model"
    }

    async fn infer(&self, payload: &PromptPayload) -> Result<String, InferenceError> {
        tokio::time::sleep(self.delay).await;
        let last = payload.blocks.last().map(|b| b.content.as_str()).unwrap_or("");
        Ok(format!("echo: {last}"))
    }
}

/// A store whose calls never complete.
pub struct StallingStore;

#[async_trait]
impl ConversationStore for StallingStore {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn get(&self, _id: &ConversationId) -> Result<ConversationHistory, StoreError> {
        std::future::pending().await
    }

    async fn append(&self, _id: &ConversationId, _turns: &[Turn]) -> Result<(), StoreError> {
        std::future::pending().await
    }
}
