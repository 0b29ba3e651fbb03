//! Chat request orchestration.
//!
//! # State Machine
//! ```text
//! START → METHOD → VERIFY → ADMIT → VALIDATE_INPUT → RELAY → RECORD → RESPOND
//!           │        │        │           │            │        │
//!          405      401      429         400          500    (logged only)
//! ```
//!
//! Every stage is awaited in order and the first failure ends the request.
//! Collaborators are trait objects so tests can substitute them.

use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::{bearer_token, AuthError, IdentityVerifier};
use crate::observability::metrics;
use crate::ratelimit::{unix_millis, AdmissionGate};
use crate::recorder::Recorder;
use crate::relay::{GenerationResult, GenerationService};

/// Everything a caller can be told. Messages never carry internal detail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    #[error("Message must be a non-empty string")]
    InvalidInput,

    #[error("Failed to generate a response")]
    Upstream,

    #[error("Internal server error")]
    Internal,
}

#[derive(Deserialize)]
struct ChatBody {
    message: String,
}

/// The four collaborators, wired once at startup.
pub struct ChatPipeline {
    verifier: Arc<dyn IdentityVerifier>,
    gate: AdmissionGate,
    relay: Arc<dyn GenerationService>,
    recorder: Recorder,
}

impl ChatPipeline {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        gate: AdmissionGate,
        relay: Arc<dyn GenerationService>,
        recorder: Recorder,
    ) -> Self {
        Self {
            verifier,
            gate,
            relay,
            recorder,
        }
    }

    /// Run one inbound request through every stage.
    pub async fn run(
        &self,
        method: &Method,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<GenerationResult, ChatError> {
        if method != Method::POST {
            return Err(ChatError::MethodNotAllowed);
        }

        // VERIFY
        let credential = bearer_token(headers).map_err(|e| {
            tracing::debug!(error = %e, "Rejected request without usable credential");
            ChatError::Unauthenticated
        })?;
        let identity = self.verifier.verify(credential).await.map_err(|e| match e {
            AuthError::Unauthenticated(reason) => {
                tracing::info!(reason, "Credential rejected");
                ChatError::Unauthenticated
            }
            AuthError::ProviderUnavailable(detail) => {
                tracing::error!(error = %detail, "Identity provider unavailable");
                ChatError::Internal
            }
        })?;
        let subject = identity.subject;

        // ADMIT
        let decision = self.gate.admit(&subject).await.map_err(|e| {
            tracing::error!(subject = %subject, error = %e, "Rate store unavailable");
            ChatError::Internal
        })?;
        if !decision.allowed {
            tracing::warn!(
                subject = %subject,
                count = decision.count,
                reset_at_ms = decision.reset_at_ms,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited();
            return Err(ChatError::RateLimited {
                retry_after_secs: decision.retry_after_secs(unix_millis()),
            });
        }

        // VALIDATE_INPUT
        let message = parse_message(body)?;

        // RELAY
        let result = self.relay.generate(&subject, &message).await.map_err(|e| {
            tracing::error!(subject = %subject, error = %e, "Upstream generation failed");
            ChatError::Upstream
        })?;

        // RECORD
        self.recorder.record(&subject, &message, &result.answer).await;

        tracing::info!(subject = %subject, remaining = decision.remaining, "Chat exchange completed");
        Ok(result)
    }

    /// Release collaborator resources after the server has drained.
    pub async fn shutdown(&self) {
        self.recorder.close().await;
    }
}

/// Extract the message; missing, non-string or blank messages are rejected.
pub fn parse_message(body: &[u8]) -> Result<String, ChatError> {
    let body: ChatBody = serde_json::from_slice(body).map_err(|_| ChatError::InvalidInput)?;
    if body.message.trim().is_empty() {
        return Err(ChatError::InvalidInput);
    }
    Ok(body.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message() {
        assert_eq!(parse_message(br#"{"message":"hello"}"#).unwrap(), "hello");
        assert_eq!(
            parse_message(br#"{"message":"  padded "}"#).unwrap(),
            "  padded "
        );
    }

    #[test]
    fn test_parse_message_rejections() {
        for body in [
            &b""[..],
            b"not json",
            br#"{}"#,
            br#"{"message":null}"#,
            br#"{"message":42}"#,
            br#"{"message":""}"#,
            br#"{"message":" \n\t "}"#,
        ] {
            assert_eq!(parse_message(body), Err(ChatError::InvalidInput));
        }
    }
}
