//! Inference gateway implementations for Doppel.
//!
//! All gateways implement the `doppel_core::InferenceGateway` trait.
//! `build_from_config` wires up the one selected by configuration.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatGateway;

use doppel_config::AppConfig;
use doppel_core::error::InferenceError;
use doppel_core::provider::InferenceGateway;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured inference gateway.
pub fn build_from_config(
    config: &AppConfig,
) -> Result<Arc<dyn InferenceGateway>, InferenceError> {
    let gateway = OpenAiCompatGateway::new(
        &config.provider,
        config.resolved_api_url(),
        config.api_key.clone().unwrap_or_default(),
        &config.model,
        Duration::from_secs(config.session.inference_timeout_secs),
    )?
    .with_sampling(config.temperature, config.top_p, config.max_tokens);

    Ok(Arc::new(gateway))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_from_default_config() {
        let config = AppConfig::default();
        let gateway = build_from_config(&config).unwrap();
        assert_eq!(gateway.name(), "openai");
        assert_eq!(gateway.model(), "gpt-4o-mini");
    }

    #[test]
    fn build_honours_custom_provider() {
        let config = AppConfig {
            provider: "ollama".into(),
            model: "llama3.1".into(),
            ..AppConfig::default()
        };
        let gateway = build_from_config(&config).unwrap();
        assert_eq!(gateway.name(), "ollama");
        assert_eq!(gateway.model(), "llama3.1");
    }
}
