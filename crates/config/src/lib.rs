//! Configuration loading and validation for heliolab.
//!
//! Loads configuration from a TOML file with environment variable
//! overrides. Validates all settings at startup so bad values fail fast
//! instead of surfacing mid-exchange.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Provider API key; usually supplied via HELIOLAB_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Target model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens per model reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Session store settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Gateway adapter settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".into()
}
fn default_max_tokens() -> u32 {
    4096
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("session", &self.session)
            .field("retrieval", &self.retrieval)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Turn window cap per session; oldest turns drop past this
    #[serde(default = "default_turn_cap")]
    pub turn_cap: usize,

    /// Idle seconds before a session is eligible for the TTL sweep
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_turn_cap() -> usize {
    10
}
fn default_ttl_secs() -> u64 {
    3600
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_cap: default_turn_cap(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum knowledge entries folded into one prompt
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    4
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the provider API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-attempt timeout for a gateway call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry attempts after the first failure (retryable errors only)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed backoff between retry attempts
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    500
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides and
    /// validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path)?;
        let mut config: AppConfig = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        debug!(path = %path.as_ref().display(), model = %config.model, "Loaded configuration");
        Ok(config)
    }

    /// Defaults plus env overrides, for embedders that ship no file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = AppConfig {
            model: default_model(),
            max_tokens: default_max_tokens(),
            ..Default::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("HELIOLAB_API_KEY") {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("HELIOLAB_MODEL") {
            if !model.is_empty() {
                self.model = model;
            }
        }
        if let Ok(url) = std::env::var("HELIOLAB_BASE_URL") {
            if !url.is_empty() {
                self.gateway.base_url = url;
            }
        }
    }

    /// Check invariants the rest of the system assumes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be positive".into()));
        }
        if self.session.turn_cap < 2 {
            return Err(ConfigError::Invalid(
                "session.turn_cap must hold at least one exchange (2 turns)".into(),
            ));
        }
        if self.session.ttl_secs == 0 {
            return Err(ConfigError::Invalid("session.ttl_secs must be positive".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k must be positive".into()));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::Invalid("gateway.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig {
            model: default_model(),
            max_tokens: default_max_tokens(),
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.session.turn_cap, 10);
        assert_eq!(config.session.ttl_secs, 3600);
        assert_eq!(config.retrieval.top_k, 4);
    }

    #[test]
    fn load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
model = "claude-sonnet-4-5-20250929"
max_tokens = 2048

[session]
turn_cap = 20
ttl_secs = 7200

[gateway]
timeout_secs = 30
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.session.turn_cap, 20);
        assert_eq!(config.session.ttl_secs, 7200);
        assert_eq!(config.gateway.timeout_secs, 30);
        // Unspecified sections keep their defaults
        assert_eq!(config.retrieval.top_k, 4);
    }

    #[test]
    fn invalid_turn_cap_rejected() {
        let config = AppConfig {
            model: default_model(),
            max_tokens: default_max_tokens(),
            session: SessionConfig {
                turn_cap: 1,
                ttl_secs: 3600,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_key_redacted_in_debug() {
        let config = AppConfig {
            api_key: Some("sk-ant-secret".into()),
            model: default_model(),
            max_tokens: default_max_tokens(),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-ant-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
