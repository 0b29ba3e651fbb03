//! Per-subject admission control.
//!
//! # Data Flow
//! ```text
//! Subject
//!     → AdmissionGate::admit (policy: limit per trailing window)
//!     → RateStore::consume (atomic sliding window, shared store)
//!     → AdmissionDecision
//! ```
//!
//! # Design Decisions
//! - Counter state lives outside the process; the store provides atomicity
//! - An admitted call consumes its slot immediately, whatever happens downstream
//! - Denied attempts do not extend the window
//! - Fail closed: a store error is an error, never an implicit allow

pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::Subject;
use crate::config::RateLimitConfig;

pub use memory::InMemoryRateStore;
pub use redis::RedisRestStore;

/// Current wall-clock time in unix millis.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Outcome of one "consume a unit" call against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateVerdict {
    pub success: bool,
    pub remaining: u32,
    /// When the oldest counted request leaves the window (unix millis).
    pub reset_at_ms: u64,
}

#[derive(Debug, Error)]
pub enum RateStoreError {
    #[error("rate store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rate store returned status {0}")]
    Status(u16),

    #[error("rate store error: {0}")]
    Store(String),

    #[error("unexpected rate store reply: {0}")]
    Reply(String),
}

/// Shared counter store offering an atomic sliding-window consume.
#[async_trait]
pub trait RateStore: Send + Sync {
    async fn consume(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<RateVerdict, RateStoreError>;
}

/// Admission decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub subject: Subject,
    /// Requests counted in the current window, this one included when admitted.
    pub count: u32,
    pub remaining: u32,
    pub reset_at_ms: u64,
    pub allowed: bool,
}

impl AdmissionDecision {
    /// Whole seconds until a slot frees up, never zero.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        let millis = self.reset_at_ms.saturating_sub(now_ms);
        millis.div_ceil(1000).max(1)
    }
}

/// Applies the configured policy to a subject.
#[derive(Clone)]
pub struct AdmissionGate {
    store: Option<Arc<dyn RateStore>>,
    limit: u32,
    window: Duration,
    key_prefix: String,
}

impl AdmissionGate {
    pub fn new(store: Arc<dyn RateStore>, limit: u32, window: Duration, key_prefix: impl Into<String>) -> Self {
        Self {
            store: Some(store),
            limit,
            window,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn from_config(store: Arc<dyn RateStore>, config: &RateLimitConfig) -> Self {
        Self::new(
            store,
            config.limit,
            Duration::from_secs(config.window_secs),
            config.key_prefix.clone(),
        )
    }

    /// A gate that admits everything without touching a store.
    pub fn disabled() -> Self {
        Self {
            store: None,
            limit: u32::MAX,
            window: Duration::ZERO,
            key_prefix: String::new(),
        }
    }

    pub fn key_for(&self, subject: &Subject) -> String {
        format!("{}:{}", self.key_prefix, subject)
    }

    pub async fn admit(&self, subject: &Subject) -> Result<AdmissionDecision, RateStoreError> {
        let Some(store) = &self.store else {
            return Ok(AdmissionDecision {
                subject: subject.clone(),
                count: 0,
                remaining: self.limit,
                reset_at_ms: 0,
                allowed: true,
            });
        };

        let verdict = store
            .consume(&self.key_for(subject), self.limit, self.window)
            .await?;

        Ok(AdmissionDecision {
            subject: subject.clone(),
            count: self.limit.saturating_sub(verdict.remaining),
            remaining: verdict.remaining,
            reset_at_ms: verdict.reset_at_ms,
            allowed: verdict.success,
        })
    }
}
