//! Client configuration types for Tether.
//!
//! `ClientConfig` represents the `config.toml` in the data directory.
//! All fields have defaults, so an empty file is a valid configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use serde::{Deserialize, Serialize};

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the identity backend (renewal and revocation).
    #[serde(default = "default_identity_url")]
    pub identity_url: String,

    /// Base URL of the agent backend (chat streaming).
    #[serde(default = "default_agent_url")]
    pub agent_url: String,

    /// Transport timeout for non-streaming requests, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Where the credential is persisted between runs.
    #[serde(default)]
    pub storage: StorageKind,

    #[serde(default)]
    pub session: SessionSettings,
}

fn default_identity_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_agent_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            identity_url: default_identity_url(),
            agent_url: default_agent_url(),
            request_timeout_secs: default_request_timeout_secs(),
            storage: StorageKind::default(),
            session: SessionSettings::default(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.request_timeout_secs)
    }
}

/// Durable credential storage backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Keychain,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::File => write!(f, "file"),
            StorageKind::Keychain => write!(f, "keychain"),
        }
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(StorageKind::File),
            "keychain" => Ok(StorageKind::Keychain),
            other => Err(format!("invalid storage kind: '{other}'")),
        }
    }
}

/// Credential lifetime and session maintenance timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Validity horizon given to every freshly issued credential.
    #[serde(default = "default_token_validity_secs")]
    pub token_validity_secs: u64,

    /// Window before expiry in which the credential is renewed proactively.
    #[serde(default = "default_renewal_buffer_secs")]
    pub renewal_buffer_secs: u64,

    /// Period of the expiry sweep.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Period of the independent auto-refresh timer.
    #[serde(default = "default_auto_refresh_interval_secs")]
    pub auto_refresh_interval_secs: u64,
}

fn default_token_validity_secs() -> u64 {
    24 * 60 * 60
}

fn default_renewal_buffer_secs() -> u64 {
    5 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_auto_refresh_interval_secs() -> u64 {
    30 * 60
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            token_validity_secs: default_token_validity_secs(),
            renewal_buffer_secs: default_renewal_buffer_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            auto_refresh_interval_secs: default_auto_refresh_interval_secs(),
        }
    }
}

impl SessionSettings {
    pub fn token_validity(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_validity_secs as i64)
    }

    pub fn renewal_buffer(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.renewal_buffer_secs as i64)
    }

    pub fn sweep_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn auto_refresh_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.auto_refresh_interval_secs.max(1))
    }

    /// Whether a fresh credential starts outside the renewal buffer.
    pub fn is_consistent(&self) -> bool {
        self.token_validity_secs > self.renewal_buffer_secs
    }

    /// Shrink the renewal buffer to half the validity when it would
    /// otherwise swallow the whole credential lifetime. Returns whether
    /// anything changed.
    pub fn clamp_renewal_buffer(&mut self) -> bool {
        if self.token_validity_secs == 0 {
            self.token_validity_secs = default_token_validity_secs();
            self.renewal_buffer_secs = self.renewal_buffer_secs.min(default_renewal_buffer_secs());
            return true;
        }
        if self.is_consistent() {
            return false;
        }
        self.renewal_buffer_secs = self.token_validity_secs / 2;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default_values() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.storage, StorageKind::File);
        assert_eq!(config.session.token_validity_secs, 86_400);
        assert_eq!(config.session.renewal_buffer_secs, 300);
        assert_eq!(config.session.sweep_interval_secs, 60);
        assert_eq!(config.session.auto_refresh_interval_secs, 1_800);
    }

    #[test]
    fn test_client_config_deserialize_with_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_client_config_deserialize_with_values() {
        let toml_str = r#"
identity_url = "https://id.example.com"
agent_url = "https://agent.example.com"
storage = "keychain"

[session]
renewal_buffer_secs = 120
"#;
        let config: ClientConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.identity_url, "https://id.example.com");
        assert_eq!(config.agent_url, "https://agent.example.com");
        assert_eq!(config.storage, StorageKind::Keychain);
        assert_eq!(config.session.renewal_buffer_secs, 120);
        // Unspecified session fields keep their defaults
        assert_eq!(config.session.token_validity_secs, 86_400);
    }

    #[test]
    fn test_session_settings_durations() {
        let settings = SessionSettings::default();
        assert_eq!(settings.token_validity(), chrono::Duration::hours(24));
        assert_eq!(settings.renewal_buffer(), chrono::Duration::minutes(5));
        assert_eq!(settings.sweep_interval(), StdDuration::from_secs(60));
        assert_eq!(settings.auto_refresh_interval(), StdDuration::from_secs(1_800));
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let settings = SessionSettings {
            sweep_interval_secs: 0,
            auto_refresh_interval_secs: 0,
            ..SessionSettings::default()
        };
        assert_eq!(settings.sweep_interval(), StdDuration::from_secs(1));
        assert_eq!(settings.auto_refresh_interval(), StdDuration::from_secs(1));
    }

    #[test]
    fn test_buffer_covering_validity_is_halved() {
        let mut settings = SessionSettings {
            token_validity_secs: 600,
            renewal_buffer_secs: 900,
            ..SessionSettings::default()
        };
        assert!(!settings.is_consistent());

        assert!(settings.clamp_renewal_buffer());
        assert_eq!(settings.renewal_buffer_secs, 300);
        assert!(settings.is_consistent());
    }

    #[test]
    fn test_equal_buffer_and_validity_is_inconsistent() {
        let mut settings = SessionSettings {
            token_validity_secs: 300,
            renewal_buffer_secs: 300,
            ..SessionSettings::default()
        };
        assert!(settings.clamp_renewal_buffer());
        assert_eq!(settings.renewal_buffer_secs, 150);
    }

    #[test]
    fn test_zero_validity_falls_back_to_default() {
        let mut settings = SessionSettings {
            token_validity_secs: 0,
            renewal_buffer_secs: 0,
            ..SessionSettings::default()
        };
        assert!(settings.clamp_renewal_buffer());
        assert_eq!(settings.token_validity_secs, 86_400);
        assert!(settings.is_consistent());
    }

    #[test]
    fn test_default_settings_are_left_alone() {
        let mut settings = SessionSettings::default();
        assert!(!settings.clamp_renewal_buffer());
        assert_eq!(settings, SessionSettings::default());
    }
}
