//! Configuration loading, validation, and management for Doppel.
//!
//! Loads configuration from `~/.doppel/config.toml` (or the file named by
//! `DOPPEL_CONFIG`) with environment variable overrides. Validates all
//! settings at startup.

use doppel_core::store::StorageKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.doppel/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the inference endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Inference provider name ("openai", "openrouter", "ollama", ...)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL override; defaults to the provider's well-known URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Max tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Persona data location
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Conversation storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session behavior (window, limits, timeouts)
    #[serde(default)]
    pub session: SessionConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}
fn default_max_tokens() -> u32 {
    2000
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("persona", &self.persona)
            .field("storage", &self.storage)
            .field("session", &self.session)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Directory holding facts.json, summary.txt, style.txt, resume.txt
    #[serde(default = "default_persona_dir")]
    pub data_dir: String,
}

fn default_persona_dir() -> String {
    "./data".into()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            data_dir: default_persona_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageKind,

    /// Directory for the local backend
    #[serde(default = "default_memory_dir")]
    pub memory_dir: String,

    /// Bucket for the remote backend
    #[serde(default)]
    pub bucket: String,

    /// Key prefix inside the bucket (e.g. "conversations/")
    #[serde(default)]
    pub prefix: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible stores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_memory_dir() -> String {
    "../memory".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::default(),
            memory_dir: default_memory_dir(),
            bucket: String::new(),
            prefix: String::new(),
            region: None,
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Prior turns included in each prompt
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    #[serde(default = "default_storage_timeout")]
    pub storage_timeout_secs: u64,

    #[serde(default = "default_inference_timeout")]
    pub inference_timeout_secs: u64,
}

fn default_window_size() -> usize {
    20
}
fn default_max_message_chars() -> usize {
    4000
}
fn default_storage_timeout() -> u64 {
    10
}
fn default_inference_timeout() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            max_message_chars: default_max_message_chars(),
            storage_timeout_secs: default_storage_timeout(),
            inference_timeout_secs: default_inference_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Origins allowed by CORS
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `DOPPEL_CONFIG` or `~/.doppel/config.toml`,
    /// then apply environment overrides:
    /// - `DOPPEL_API_KEY` (highest priority), `OPENAI_API_KEY`
    /// - `DOPPEL_PROVIDER`, `DOPPEL_API_URL`, `DOPPEL_MODEL`
    /// - `DOPPEL_STORAGE`, `DOPPEL_S3_BUCKET`, `DOPPEL_MEMORY_DIR`
    /// - `DOPPEL_CORS_ORIGINS` (comma-separated)
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::read_from(&Self::active_path())?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_from(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(config)
    }

    /// Apply overrides from an environment-like lookup.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(key) = lookup("DOPPEL_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(provider) = lookup("DOPPEL_PROVIDER") {
            self.provider = provider;
        }
        if let Some(url) = lookup("DOPPEL_API_URL") {
            self.api_url = Some(url);
        }
        if let Some(model) = lookup("DOPPEL_MODEL") {
            self.model = model;
        }
        if let Some(kind) = lookup("DOPPEL_STORAGE") {
            self.storage.backend = kind.parse().map_err(ConfigError::ValidationError)?;
        }
        if let Some(bucket) = lookup("DOPPEL_S3_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Some(dir) = lookup("DOPPEL_MEMORY_DIR") {
            self.storage.memory_dir = dir;
        }
        if let Some(origins) = lookup("DOPPEL_CORS_ORIGINS") {
            self.gateway.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".doppel")
    }

    /// Default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// The file `load()` reads: `$DOPPEL_CONFIG` if set, else `config_path()`.
    pub fn active_path() -> PathBuf {
        std::env::var("DOPPEL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_path())
    }

    /// The base URL requests go to.
    pub fn resolved_api_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| default_base_url(&self.provider))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.top_p <= 0.0 || self.top_p > 1.0 {
            return Err(ConfigError::ValidationError(
                "top_p must be in (0.0, 1.0]".into(),
            ));
        }

        if self.storage.backend == StorageKind::Remote && self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.bucket is required for the remote backend".into(),
            ));
        }

        if self.session.storage_timeout_secs == 0 || self.session.inference_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "session timeouts must be greater than zero".into(),
            ));
        }

        if self.session.max_message_chars == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_message_chars must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            persona: PersonaConfig::default(),
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.backend, StorageKind::Local);
        assert_eq!(config.session.window_size, 20);
        assert_eq!(config.max_tokens, 2000);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.storage.backend, config.storage.backend);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn remote_backend_requires_bucket() {
        let mut config = AppConfig::default();
        config.storage.backend = StorageKind::Remote;
        assert!(config.validate().is_err());

        config.storage.bucket = "conversations".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.session.inference_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider, "openai");
    }

    #[test]
    fn parses_partial_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            r#"
model = "amazon.nova-lite"

[storage]
backend = "remote"
bucket = "twin-memory"
prefix = "conversations/"

[session]
window_size = 6
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.model, "amazon.nova-lite");
        assert_eq!(config.storage.backend, StorageKind::Remote);
        assert_eq!(config.storage.prefix, "conversations/");
        assert_eq!(config.session.window_size, 6);
        assert_eq!(config.session.max_message_chars, 4000);
    }

    #[test]
    fn unknown_backend_is_parse_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[storage]\nbackend = \"sqlite\"\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(tmp.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("DOPPEL_STORAGE", "remote"),
            ("DOPPEL_S3_BUCKET", "bucket-1"),
            ("DOPPEL_CORS_ORIGINS", "https://a.example, https://b.example,"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.storage.backend, StorageKind::Remote);
        assert_eq!(config.storage.bucket, "bucket-1");
        assert_eq!(
            config.gateway.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn bad_storage_override_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|k| (k == "DOPPEL_STORAGE").then(|| "ftp".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn resolved_url_prefers_override() {
        let mut config = AppConfig::default();
        assert!(config.resolved_api_url().contains("api.openai.com"));
        config.provider = "ollama".into();
        assert!(config.resolved_api_url().contains("localhost:11434"));
        config.api_url = Some("http://proxy.local/v1".into());
        assert_eq!(config.resolved_api_url(), "http://proxy.local/v1");
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("window_size"));
    }
}
