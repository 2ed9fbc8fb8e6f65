//! Engine configuration loader for Mentorline.
//!
//! Reads `config.toml` from the data directory (`~/.mentorline/` in production)
//! and deserializes it into [`EngineConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::Path;

use mentorline_types::config::EngineConfig;

/// Upper bound on a single page of messages.
const MAX_MESSAGE_PAGE: u32 = 500;

/// Load engine configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`EngineConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_config(data_dir: &Path) -> EngineConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => {
            tracing::info!(
                bill_while_offline = config.bill_while_offline,
                "Loaded {}",
                config_path.display()
            );
            config
        }
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            EngineConfig::default()
        }
    }
}

/// Resolve the page size for a message listing.
///
/// A caller-supplied limit wins over `message_page_size`; both are clamped to
/// `1..=500`.
pub fn resolve_page_size(config: &EngineConfig, requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(config.message_page_size)
        .clamp(1, MAX_MESSAGE_PAGE)
}
