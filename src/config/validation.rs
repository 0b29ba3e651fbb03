//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every enabled backend has its endpoint and credential
//! - Validate value ranges (timeouts > 0, window > 0, retry bounds)
//! - Check the request deadline covers the slowest path through every stage
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{ExchangeStoreKind, RateStoreKind, RelayConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be set")]
    Missing { field: &'static str },

    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    BackoffBounds { base: u64, max: u64 },

    #[error("timeouts.request_secs ({request_secs}s) is shorter than the slowest path through every stage ({required_ms}ms)")]
    DeadlineTooShort { request_secs: u64, required_ms: u64 },
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.request_secs", timeouts.request_secs),
        ("timeouts.identity_secs", timeouts.identity_secs),
        ("timeouts.rate_store_secs", timeouts.rate_store_secs),
        ("timeouts.generation_secs", timeouts.generation_secs),
        ("timeouts.recorder_secs", timeouts.recorder_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    check_url(&mut errors, "identity.endpoint", &config.identity.endpoint);
    check_set(&mut errors, "identity.api_key", &config.identity.api_key);

    let rate = &config.rate_limit;
    if rate.enabled {
        if rate.limit == 0 {
            errors.push(ValidationError::Zero { field: "rate_limit.limit" });
        }
        if rate.window_secs == 0 {
            errors.push(ValidationError::Zero { field: "rate_limit.window_secs" });
        }
        if rate.store == RateStoreKind::Redis {
            check_url(&mut errors, "rate_limit.redis.url", &rate.redis.url);
            check_set(&mut errors, "rate_limit.redis.token", &rate.redis.token);
        }
    }

    check_url(&mut errors, "generation.endpoint", &config.generation.endpoint);
    check_set(&mut errors, "generation.api_key", &config.generation.api_key);

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::Zero { field: "retries.max_attempts" });
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::BackoffBounds {
            base: retries.base_delay_ms,
            max: retries.max_delay_ms,
        });
    }

    let required_ms = slowest_path_ms(config);
    if timeouts.request_secs.saturating_mul(1000) < required_ms {
        errors.push(ValidationError::DeadlineTooShort {
            request_secs: timeouts.request_secs,
            required_ms,
        });
    }

    match config.recorder.store {
        ExchangeStoreKind::Firestore => {
            let fs = &config.recorder.firestore;
            check_url(&mut errors, "recorder.firestore.endpoint", &fs.endpoint);
            check_set(&mut errors, "recorder.firestore.collection", &fs.collection);
            // A service-account key carries its own project and mints tokens.
            if fs.credentials_path.trim().is_empty() {
                check_set(&mut errors, "recorder.firestore.project_id", &fs.project_id);
                check_set(&mut errors, "recorder.firestore.credentials_path", &fs.access_token);
            }
        }
        ExchangeStoreKind::Jsonl => {
            check_set(&mut errors, "recorder.jsonl_path", &config.recorder.jsonl_path);
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero { field: "security.max_body_size" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Worst case for one request: every stage runs to its own timeout, the
/// generation call on every attempt, with the largest jittered backoff between.
fn slowest_path_ms(config: &RelayConfig) -> u64 {
    let timeouts = &config.timeouts;
    let attempts = if config.retries.enabled {
        u64::from(config.retries.max_attempts.max(1))
    } else {
        1
    };
    let backoff_ms = config.retries.max_delay_ms.saturating_add(config.retries.max_delay_ms / 10);

    let fixed_secs = timeouts
        .identity_secs
        .saturating_add(timeouts.rate_store_secs)
        .saturating_add(timeouts.recorder_secs)
        .saturating_add(timeouts.generation_secs.saturating_mul(attempts));

    fixed_secs
        .saturating_mul(1000)
        .saturating_add(backoff_ms.saturating_mul(attempts - 1))
}

fn check_set(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::Missing { field });
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::Missing { field });
    } else if Url::parse(value).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> RelayConfig {
        let mut config = RelayConfig::default();
        config.identity.api_key = "web-key".into();
        config.rate_limit.redis.url = "https://redis.example.com".into();
        config.rate_limit.redis.token = "token".into();
        config.generation.endpoint = "https://gen.example.com/v1/chat".into();
        config.generation.api_key = "service-key".into();
        config.recorder.firestore.project_id = "demo".into();
        config.recorder.firestore.access_token = "ya29.token".into();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_default_config_reports_every_missing_secret() {
        let errors = validate_config(&RelayConfig::default()).unwrap_err();
        let missing: Vec<_> = errors
            .iter()
            .filter_map(|e| match e {
                ValidationError::Missing { field } => Some(*field),
                _ => None,
            })
            .collect();

        assert!(missing.contains(&"identity.api_key"));
        assert!(missing.contains(&"rate_limit.redis.url"));
        assert!(missing.contains(&"rate_limit.redis.token"));
        assert!(missing.contains(&"generation.endpoint"));
        assert!(missing.contains(&"generation.api_key"));
        assert!(missing.contains(&"recorder.firestore.project_id"));
    }

    #[test]
    fn test_memory_store_needs_no_redis() {
        let mut config = valid_config();
        config.rate_limit.store = RateStoreKind::Memory;
        config.rate_limit.redis.url.clear();
        config.rate_limit.redis.token.clear();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_range_checks() {
        let mut config = valid_config();
        config.rate_limit.window_secs = 0;
        config.timeouts.generation_secs = 0;
        config.retries.base_delay_ms = 5000;
        config.listener.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero { field: "rate_limit.window_secs" }));
        assert!(errors.contains(&ValidationError::Zero { field: "timeouts.generation_secs" }));
        assert!(errors.contains(&ValidationError::BackoffBounds { base: 5000, max: 2000 }));
    }

    #[test]
    fn test_default_deadline_covers_every_stage() {
        // 5 + 2 + 60 + 5 seconds against the 90s default.
        assert_eq!(slowest_path_ms(&valid_config()), 72_000);
    }

    #[test]
    fn test_deadline_shorter_than_generation() {
        let mut config = valid_config();
        config.timeouts.request_secs = 1;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DeadlineTooShort { request_secs: 1, required_ms: 72_000 }]
        );
    }

    #[test]
    fn test_deadline_accounts_for_retries() {
        let mut config = valid_config();
        config.retries.enabled = true;
        config.retries.max_attempts = 3;

        // 12s of other stages, 3 x 60s of generation, 2 x 2.2s of backoff.
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DeadlineTooShort { request_secs: 90, required_ms: 196_400 }]
        );

        config.timeouts.request_secs = 200;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_service_account_replaces_project_and_token() {
        let mut config = valid_config();
        config.recorder.firestore.project_id.clear();
        config.recorder.firestore.access_token.clear();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![
                ValidationError::Missing { field: "recorder.firestore.project_id" },
                ValidationError::Missing { field: "recorder.firestore.credentials_path" },
            ]
        );

        config.recorder.firestore.credentials_path = "/etc/relay/service-account.json".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let mut config = valid_config();
        config.generation.endpoint = "not a url".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidUrl {
                field: "generation.endpoint",
                value: "not a url".into(),
            }]
        );
    }
}
