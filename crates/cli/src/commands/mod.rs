//! Subcommand implementations.

pub mod chat;
pub mod doctor;
pub mod history;
pub mod init;
pub mod serve;

use doppel_config::AppConfig;
use tracing::debug;

/// Load config with a readable error.
pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = AppConfig::active_path();
    debug!(path = %path.display(), "Loading config");
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}
