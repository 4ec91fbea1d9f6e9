//! Error types for the Doppel domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; the session layer folds
//! them into [`SessionError`], which is what callers of the core see.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type used by the process wiring (startup, serving).
#[derive(Debug, Error)]
pub enum Error {
    // --- Inference errors ---
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    // --- Persona errors ---
    #[error("Persona error: {0}")]
    Persona(#[from] PersonaError),

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- I/O (socket bind, serve) ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Why an inference call failed. One attempt, one classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InferenceFailure {
    /// The endpoint did not answer within the configured bound.
    Timeout,
    /// Rate limit or billing quota hit.
    QuotaExceeded,
    /// The assembled prompt is larger than the model accepts.
    PayloadTooLarge,
    /// The model or endpoint is unreachable / overloaded / unknown.
    ModelUnavailable,
    /// Anything we could not classify.
    Unknown,
}

impl fmt::Display for InferenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::QuotaExceeded => "quota exceeded",
            Self::PayloadTooLarge => "payload too large",
            Self::ModelUnavailable => "model unavailable",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A classified failure from the inference endpoint.
#[derive(Debug, Clone, Error)]
#[error("Inference failed ({reason}): {detail}")]
pub struct InferenceError {
    pub reason: InferenceFailure,
    pub detail: String,
}

impl InferenceError {
    pub fn new(reason: InferenceFailure, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(InferenceFailure::Timeout, detail)
    }

    pub fn quota_exceeded(detail: impl Into<String>) -> Self {
        Self::new(InferenceFailure::QuotaExceeded, detail)
    }

    pub fn payload_too_large(detail: impl Into<String>) -> Self {
        Self::new(InferenceFailure::PayloadTooLarge, detail)
    }

    pub fn model_unavailable(detail: impl Into<String>) -> Self {
        Self::new(InferenceFailure::ModelUnavailable, detail)
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::new(InferenceFailure::Unknown, detail)
    }

    /// A payload that is too large stays too large until the history
    /// window shrinks, so repeating the request cannot help.
    pub fn is_permanent(&self) -> bool {
        self.reason == InferenceFailure::PayloadTooLarge
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Corrupt record for conversation {conversation_id}: {reason}")]
    CorruptRecord {
        conversation_id: String,
        reason: String,
    },

    #[error("Out-of-sequence append for conversation {conversation_id}: {reason}")]
    OutOfSequence {
        conversation_id: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Persona file missing: {path}")]
    MissingFile { path: PathBuf },

    #[error("Failed to read persona file {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("Failed to parse persona file {path}: {reason}")]
    ParseFailed { path: PathBuf, reason: String },

    #[error("Persona field '{field}' is missing or empty in {path}")]
    MissingField { field: &'static str, path: PathBuf },
}

/// Errors surfaced by `SessionCoordinator::handle_message`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid conversation id: {0}")]
    InvalidConversationId(String),

    #[error("Conversation storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// How a failure should be presented to the end user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// "Message rejected": repeating the same request will fail again.
    Rejected,
    /// "Temporarily unavailable, please retry".
    RetryLater,
}

impl SessionError {
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::InvalidInput(_) | Self::InvalidConversationId(_) => Disposition::Rejected,
            Self::Unavailable(_) => Disposition::RetryLater,
            Self::Inference(e) if e.is_permanent() => Disposition::Rejected,
            Self::Inference(_) => Disposition::RetryLater,
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        // Corrupt records never reach here (backends recover them); a
        // sequence conflict means another writer got in first.
        Self::Unavailable(err.to_string())
    }
}
