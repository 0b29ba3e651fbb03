//! Generation relay subsystem.
//!
//! # Data Flow
//! ```text
//! (Subject, message text)
//!     → GenerationService::generate
//!     → POST {query, user} to the upstream with the service credential
//!     → GenerationResult {answer, ..pass-through fields}
//! ```
//!
//! # Design Decisions
//! - The caller's credential never leaves this process; upstream sees the service key
//! - One outbound call per request unless retries are switched on
//! - Upstream fields other than `answer` are kept verbatim and returned to the caller

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::auth::Subject;
use crate::resilience::retries::is_retryable_status;

pub use client::HttpGenerationClient;

/// Parsed upstream answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub answer: String,

    /// Every other top-level field of the upstream reply.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl GenerationResult {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            metadata: Map::new(),
        }
    }
}

/// Body sent upstream.
#[derive(Debug, Serialize)]
pub struct GenerationRequest<'a> {
    pub query: &'a str,
    pub user: &'a str,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream timed out")]
    Timeout,

    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("upstream reply could not be decoded: {0}")]
    Decode(String),
}

impl RelayError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::Timeout | RelayError::Transport(_) => true,
            RelayError::Status(status) => is_retryable_status(*status),
            RelayError::Decode(_) => false,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Timeout => "timeout",
            RelayError::Transport(_) => "transport",
            RelayError::Status(_) => "status",
            RelayError::Decode(_) => "decode",
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RelayError::Timeout
        } else if e.is_decode() {
            RelayError::Decode(e.to_string())
        } else {
            RelayError::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, subject: &Subject, text: &str) -> Result<GenerationResult, RelayError>;
}
