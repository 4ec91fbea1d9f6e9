//! OpenAI-compatible inference gateway.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Groq, Together AI and any
//! endpoint exposing `/chat/completions`.
//!
//! One request per `infer` call. Every failure is classified into an
//! [`InferenceFailure`] so the session layer can decide between "rejected"
//! and "retry later" without looking at HTTP details.

use async_trait::async_trait;
use doppel_core::error::{InferenceError, InferenceFailure};
use doppel_core::provider::{InferenceGateway, PromptPayload, PromptRole};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Bodies longer than this are cut before they go into error details.
const MAX_ERROR_BODY: usize = 500;

/// An OpenAI-compatible chat completion gateway.
pub struct OpenAiCompatGateway {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatGateway {
    /// Create a gateway with default sampling (temperature 0.7, top_p 0.9,
    /// 2000 max tokens).
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 2000,
            client,
        })
    }

    /// Create an OpenAI gateway (convenience constructor).
    pub fn openai(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, InferenceError> {
        Self::new(
            "openai",
            "https://api.openai.com/v1",
            api_key,
            model,
            Duration::from_secs(60),
        )
    }

    /// Create an Ollama gateway (convenience constructor).
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Result<Self, InferenceError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama ignores the key
            model,
            Duration::from_secs(120),
        )
    }

    pub fn with_sampling(mut self, temperature: f32, top_p: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self.max_tokens = max_tokens;
        self
    }

    fn request_body<'a>(&'a self, payload: &'a PromptPayload) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            messages: payload
                .blocks
                .iter()
                .map(|b| ApiMessage {
                    role: match b.role {
                        PromptRole::System => "system",
                        PromptRole::User => "user",
                        PromptRole::Assistant => "assistant",
                    },
                    content: &b.content,
                })
                .collect(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }
}

#[async_trait]
impl InferenceGateway for OpenAiCompatGateway {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn infer(&self, payload: &PromptPayload) -> Result<String, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            provider = %self.name,
            model = %self.model,
            blocks = payload.blocks.len(),
            chars = payload.char_count(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(payload))
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_status(status, &body);
            warn!(provider = %self.name, status, reason = %err.reason, "Inference request failed");
            return Err(err);
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::timeout(e.to_string())
            } else {
                InferenceError::unknown(format!("Failed to parse response: {e}"))
            }
        })?;

        extract_reply(api_response)
    }

    async fn health_check(&self) -> Result<bool, InferenceError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        Ok(response.status().is_success())
    }
}

/// Classify a failure that happened before any HTTP status arrived.
fn classify_transport(e: &reqwest::Error) -> InferenceError {
    if e.is_timeout() {
        InferenceError::timeout(e.to_string())
    } else if e.is_connect() {
        InferenceError::model_unavailable(e.to_string())
    } else {
        InferenceError::unknown(e.to_string())
    }
}

/// Classify a non-success HTTP status.
pub fn classify_status(status: u16, body: &str) -> InferenceError {
    let detail = format!("HTTP {status}: {}", truncate(body, MAX_ERROR_BODY));
    let reason = match status {
        408 | 504 => InferenceFailure::Timeout,
        402 | 429 => InferenceFailure::QuotaExceeded,
        413 => InferenceFailure::PayloadTooLarge,
        400 if mentions_context_overflow(body) => InferenceFailure::PayloadTooLarge,
        404 | 500 | 502 | 503 | 529 => InferenceFailure::ModelUnavailable,
        _ => InferenceFailure::Unknown,
    };
    InferenceError::new(reason, detail)
}

fn mentions_context_overflow(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("context_length")
        || lower.contains("context length")
        || lower.contains("too long")
        || lower.contains("maximum context")
}

fn extract_reply(response: ApiResponse) -> Result<String, InferenceError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(InferenceError::unknown("Model returned an empty reply"));
    }
    Ok(content)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiReply,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    #[serde(default)]
    content: Option<String>,
}
