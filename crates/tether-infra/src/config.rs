//! Client configuration loader for Tether.
//!
//! Reads `config.toml` from the data directory (`~/.tether/` in production)
//! and deserializes it into [`ClientConfig`]. Falls back to defaults when the
//! file is missing or malformed, then applies environment overrides.

use std::path::Path;

use tether_types::config::ClientConfig;

/// Overrides the identity backend base URL.
pub const IDENTITY_URL_ENV: &str = "TETHER_IDENTITY_URL";

/// Overrides the agent backend base URL.
pub const AGENT_URL_ENV: &str = "TETHER_AGENT_URL";

/// Load client configuration from `{data_dir}/config.toml`, then apply
/// environment overrides.
pub async fn load_client_config(data_dir: &Path) -> ClientConfig {
    let mut config = read_config_file(data_dir).await;
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    check_session_settings(&mut config);
    config
}

/// Warn about and repair a renewal buffer that is not shorter than the
/// credential validity. Such a credential would be renewed on every call.
fn check_session_settings(config: &mut ClientConfig) {
    let configured = config.session.clone();
    if config.session.clamp_renewal_buffer() {
        tracing::warn!(
            token_validity_secs = configured.token_validity_secs,
            renewal_buffer_secs = configured.renewal_buffer_secs,
            clamped_validity_secs = config.session.token_validity_secs,
            clamped_buffer_secs = config.session.renewal_buffer_secs,
            "renewal buffer must be shorter than token validity; clamping"
        );
    }
}

async fn read_config_file(data_dir: &Path) -> ClientConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ClientConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ClientConfig::default();
        }
    };

    match toml::from_str::<ClientConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ClientConfig::default()
        }
    }
}

/// Apply environment overrides using `lookup` (injectable for tests).
pub fn apply_overrides(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(IDENTITY_URL_ENV).filter(|v| !v.is_empty()) {
        config.identity_url = url;
    }
    if let Some(url) = lookup(AGENT_URL_ENV).filter(|v| !v.is_empty()) {
        config.agent_url = url;
    }
}
