//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the chat relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration for inbound and outbound calls.
    pub timeouts: TimeoutConfig,

    /// Identity provider settings.
    pub identity: IdentityConfig,

    /// Per-subject admission policy and its backing store.
    pub rate_limit: RateLimitConfig,

    /// Upstream generation service.
    pub generation: GenerationConfig,

    /// Retry configuration for the generation relay.
    pub retries: RetryConfig,

    /// Exchange persistence.
    pub recorder: RecorderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole inbound request deadline in seconds.
    pub request_secs: u64,

    /// Identity provider call timeout in seconds.
    pub identity_secs: u64,

    /// Rate store call timeout in seconds.
    pub rate_store_secs: u64,

    /// Generation service call timeout in seconds.
    pub generation_secs: u64,

    /// Document store write timeout in seconds.
    pub recorder_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 90,
            identity_secs: 5,
            rate_store_secs: 2,
            generation_secs: 60,
            recorder_secs: 5,
        }
    }
}

/// Identity provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Base URL of the Identity Toolkit REST API.
    pub endpoint: String,

    /// Web API key of the identity project.
    pub api_key: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://identitytoolkit.googleapis.com/v1".to_string(),
            api_key: String::new(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable admission control. Disabling admits every request.
    pub enabled: bool,

    /// Requests admitted per subject within one window.
    pub limit: u32,

    /// Trailing window length in seconds.
    pub window_secs: u64,

    /// Prefix for counter keys in the shared store.
    pub key_prefix: String,

    /// Which store holds the counters.
    pub store: RateStoreKind,

    /// Managed Redis (REST) settings, used when `store = "redis"`.
    pub redis: RedisRestConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 5,
            window_secs: 60,
            key_prefix: "chat-relay".to_string(),
            store: RateStoreKind::Redis,
            redis: RedisRestConfig::default(),
        }
    }
}

/// Backing store for admission counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateStoreKind {
    /// Shared managed Redis over REST. Correct across instances.
    Redis,
    /// Process-local sliding log. Single instance only.
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RedisRestConfig {
    /// REST endpoint of the Redis database.
    pub url: String,

    /// Bearer token for the REST endpoint.
    pub token: String,
}

/// Upstream generation service configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GenerationConfig {
    /// Full URL that receives `{query, user}` POSTs.
    pub endpoint: String,

    /// Static service credential sent as a Bearer token.
    pub api_key: String,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries of the upstream relay call.
    pub enabled: bool,

    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 1,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Exchange recorder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Which store receives exchange records.
    pub store: ExchangeStoreKind,

    /// Cloud Firestore settings, used when `store = "firestore"`.
    pub firestore: FirestoreConfig,

    /// Local file path, used when `store = "jsonl"`.
    pub jsonl_path: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            store: ExchangeStoreKind::Firestore,
            firestore: FirestoreConfig::default(),
            jsonl_path: "exchanges.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStoreKind {
    Firestore,
    Jsonl,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FirestoreConfig {
    /// Base URL of the Firestore REST API.
    pub endpoint: String,

    /// Project that owns the database. Taken from the service-account key
    /// when left empty.
    pub project_id: String,

    /// Collection receiving one document per exchange.
    pub collection: String,

    /// Service-account key file (JSON). Tokens are minted from it and
    /// refreshed before they expire.
    pub credentials_path: String,

    /// Fixed bearer token, for emulators and local runs. Ignored when
    /// `credentials_path` is set.
    pub access_token: String,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://firestore.googleapis.com/v1".to_string(),
            project_id: String::new(),
            collection: "chatLogs".to_string(),
            credentials_path: String::new(),
            access_token: String::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024, // 64KB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.rate_limit.limit, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.rate_limit.store, RateStoreKind::Redis);
        assert!(!config.retries.enabled);
        assert_eq!(config.recorder.firestore.collection, "chatLogs");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            [rate_limit]
            limit = 10
            store = "memory"

            [recorder]
            store = "jsonl"
            jsonl_path = "/tmp/x.jsonl"
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.limit, 10);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.rate_limit.store, RateStoreKind::Memory);
        assert_eq!(config.recorder.store, ExchangeStoreKind::Jsonl);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
