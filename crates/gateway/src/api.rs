//! Request handlers.
//!
//! | Method | Path | Body / Response |
//! |--------|------|-----------------|
//! | `GET` | `/` | `{"status": "ok"}` |
//! | `GET` | `/health` | `{"status": "healthy"}` |
//! | `POST` | `/chat` | `{message, session_id?}` → `{response, session_id}` |
//! | `GET` | `/conversation/{session_id}` | `{session_id, messages}` |
//!
//! Errors are returned as `{"error": "...", "retryable": bool}` so a UI can
//! tell "message rejected" apart from "temporarily unavailable".

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use doppel_core::error::{Disposition, InferenceFailure, SessionError};
use doppel_core::message::{ConversationId, Turn};
use serde::{Deserialize, Serialize};

use crate::SharedState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

#[derive(Serialize)]
pub struct ConversationResponse {
    pub session_id: String,
    pub messages: Vec<Turn>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub retryable: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub async fn root_handler() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

pub async fn health_handler() -> Json<StatusResponse> {
    Json(StatusResponse { status: "healthy" })
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(body) = body.map_err(rejected_body)?;
    let id = match body.session_id.as_deref() {
        None | Some("") => ConversationId::generate(),
        Some(raw) => ConversationId::parse(raw).map_err(into_api_error)?,
    };

    let response = state
        .coordinator
        .handle_message(&id, &body.message)
        .await
        .map_err(into_api_error)?;

    Ok(Json(ChatResponse {
        response,
        session_id: id.to_string(),
    }))
}

pub async fn conversation_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let id = ConversationId::parse(&session_id).map_err(into_api_error)?;
    let history = state
        .coordinator
        .history(&id)
        .await
        .map_err(into_api_error)?;

    Ok(Json(ConversationResponse {
        session_id: id.to_string(),
        messages: history.turns().to_vec(),
    }))
}

/// HTTP status for a session failure.
pub fn status_for(err: &SessionError) -> StatusCode {
    match err {
        SessionError::InvalidInput(_) | SessionError::InvalidConversationId(_) => {
            StatusCode::BAD_REQUEST
        }
        SessionError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Inference(e) => match e.reason {
            InferenceFailure::Timeout => StatusCode::GATEWAY_TIMEOUT,
            InferenceFailure::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            InferenceFailure::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            InferenceFailure::ModelUnavailable | InferenceFailure::Unknown => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        },
    }
}

/// Malformed, incomplete or oversized request bodies. Never retryable.
fn rejected_body(rejection: JsonRejection) -> ApiError {
    (
        rejection.status(),
        Json(ErrorResponse {
            error: rejection.body_text(),
            retryable: false,
        }),
    )
}

fn into_api_error(err: SessionError) -> ApiError {
    let status = status_for(&err);
    // Upstream details stay in the logs; callers get a stable message.
    let message = match &err {
        SessionError::InvalidInput(_) | SessionError::InvalidConversationId(_) => err.to_string(),
        SessionError::Inference(e) if e.reason == InferenceFailure::PayloadTooLarge => {
            "This conversation is too long for the model. Please start a new one.".into()
        }
        _ => "The service is temporarily unavailable. Please try again.".into(),
    };
    (
        status,
        Json(ErrorResponse {
            error: message,
            retryable: err.disposition() == Disposition::RetryLater,
        }),
    )
}
