//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a failed upstream attempt is retryable
//! - Decide whether another attempt is allowed
//! - Provide the delay before the next attempt
//!
//! # Design Decisions
//! - Disabled config means exactly one attempt
//! - Connection errors and timeouts always retryable; only 502/503/504 statuses
//! - Jittered backoff prevents thundering herd

use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        if !config.enabled {
            return Self::none();
        }
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    /// Whether attempt number `attempt` (1-based) may be followed by another.
    pub fn should_retry(&self, attempt: u32, retryable: bool) -> bool {
        retryable && attempt < self.max_attempts
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

/// Statuses worth another attempt: the upstream (or its gateway) was briefly unavailable.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 502..=504)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_config_means_single_attempt() {
        let config = RetryConfig {
            enabled: false,
            max_attempts: 5,
            ..RetryConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy, RetryPolicy::none());
        assert!(!policy.should_retry(1, true));
    }

    #[test]
    fn test_enabled_policy_bounds_attempts() {
        let config = RetryConfig {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
        };
        let policy = RetryPolicy::from_config(&config);
        assert!(policy.should_retry(1, true));
        assert!(policy.should_retry(2, true));
        assert!(!policy.should_retry(3, true));
        assert!(!policy.should_retry(1, false));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(502));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(504));
        assert!(!is_retryable_status(500));
        assert!(!is_retryable_status(429));
        assert!(!is_retryable_status(400));
    }
}
