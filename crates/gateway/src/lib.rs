//! HTTP API gateway for Doppel.
//!
//! Exposes the chat endpoint, conversation history lookup and health
//! checks. Built on Axum.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use doppel_agent::{SessionCoordinator, SessionOptions};
use doppel_config::AppConfig;
use doppel_core::Error;
use doppel_core::persona::PersonaProfile;

/// Request bodies larger than this are refused with 413.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state for the gateway.
pub struct AppState {
    pub coordinator: Arc<SessionCoordinator>,
}

pub type SharedState = Arc<AppState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS restricted to the configured origins
/// - Request body size limit (64 KiB)
/// - HTTP trace logging
pub fn build_router(state: SharedState, cors_origins: &[String]) -> doppel_core::Result<Router> {
    Ok(Router::new()
        .route("/", get(api::root_handler))
        .route("/health", get(api::health_handler))
        .route("/chat", post(api::chat_handler))
        .route("/conversation/{session_id}", get(api::conversation_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(cors_origins)?)
        .layer(tower_http::trace::TraceLayer::new_for_http()))
}

fn cors_layer(origins: &[String]) -> doppel_core::Result<CorsLayer> {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed = origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o).map_err(|e| Error::Config {
                    message: format!("invalid CORS origin '{o}': {e}"),
                })
            })
            .collect::<doppel_core::Result<Vec<_>>>()?;
        AllowOrigin::list(parsed)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600)))
}

/// Wire persona, store and inference gateway into a coordinator.
///
/// Shared by the HTTP server and the CLI commands so both talk to the same
/// configured backends.
pub fn build_coordinator(config: &AppConfig) -> doppel_core::Result<SessionCoordinator> {
    let persona = PersonaProfile::load_dir(Path::new(&config.persona.data_dir))?;
    let store = doppel_memory::build_from_config(&config.storage)?;
    let gateway = doppel_providers::build_from_config(config)?;

    info!(
        persona = %persona.full_name,
        storage = store.name(),
        provider = gateway.name(),
        model = gateway.model(),
        "Session coordinator ready"
    );

    Ok(SessionCoordinator::new(
        Arc::new(persona),
        store,
        gateway,
        SessionOptions::from(&config.session),
    ))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> doppel_core::Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(AppState {
        coordinator: Arc::new(build_coordinator(&config)?),
    });
    let app = build_router(state, &config.gateway.cors_origins)?;

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
