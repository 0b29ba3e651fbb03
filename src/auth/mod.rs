//! Caller identity verification.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <credential>
//!     → bearer_token() (header parsing)
//!     → IdentityVerifier::verify (external identity provider)
//!     → Subject (stable caller id)
//! ```
//!
//! # Design Decisions
//! - Verification is fully delegated to the provider; no local token parsing
//! - Nothing is cached, every request is verified once
//! - A rejected credential and an unreachable provider are distinct errors

pub mod identity_toolkit;

use std::fmt;

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use thiserror::Error;

pub use identity_toolkit::IdentityToolkitVerifier;

/// Stable identifier of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subject(String);

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A verified caller plus whatever the provider reported alongside it.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub subject: Subject,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, malformed, expired or rejected credential.
    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),

    /// The provider could not give an answer.
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, AuthError>;
}

/// Extract the bearer credential from request headers.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::Unauthenticated("missing authorization header"))?
        .to_str()
        .map_err(|_| AuthError::Unauthenticated("authorization header is not ascii"))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::Unauthenticated("malformed authorization header"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Unauthenticated("unsupported authorization scheme"));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Unauthenticated("empty bearer credential"));
    }

    Ok(token)
}
