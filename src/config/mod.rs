//! Application configuration
//!
//! Resolution order: TOML file (`TUTOR_CONFIG` path, or `./tutor.toml` when
//! present), then environment overrides, then built-in defaults.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint the tutor gateway listens on.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Bound on one gateway round-trip, in seconds. Expiry is classified as
    /// a transport failure.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gateway_url() -> String {
    "http://localhost:3000/api/gemini".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Resolve the effective configuration for this session.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("TUTOR_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let fallback = Path::new("tutor.toml");
                if fallback.exists() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(url) = env::var("TUTOR_GATEWAY_URL") {
            config.gateway_url = url;
        }
        if let Some(secs) = env::var("TUTOR_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.request_timeout_secs = secs;
        }

        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
