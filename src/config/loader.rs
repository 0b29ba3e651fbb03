//! Configuration loading from disk and environment.

use std::path::Path;
use std::fs;
use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => RelayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay deployment values and secrets from the environment.
///
/// Secrets are expected here rather than in the file. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let overrides: [(&str, &mut String); 9] = [
        ("CHAT_RELAY_BIND_ADDRESS", &mut config.listener.bind_address),
        ("IDENTITY_API_KEY", &mut config.identity.api_key),
        ("RATE_STORE_URL", &mut config.rate_limit.redis.url),
        ("RATE_STORE_TOKEN", &mut config.rate_limit.redis.token),
        ("GENERATION_ENDPOINT", &mut config.generation.endpoint),
        ("GENERATION_API_KEY", &mut config.generation.api_key),
        ("FIRESTORE_PROJECT_ID", &mut config.recorder.firestore.project_id),
        ("FIRESTORE_ACCESS_TOKEN", &mut config.recorder.firestore.access_token),
        ("GOOGLE_APPLICATION_CREDENTIALS", &mut config.recorder.firestore.credentials_path),
    ];

    for (key, slot) in overrides {
        if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(key, "Configuration value taken from environment");
            *slot = value;
        }
    }
}
