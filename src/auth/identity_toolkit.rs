//! Identity Toolkit (`accounts:lookup`) verifier.
//!
//! # Responsibilities
//! - Send the caller's ID token to the provider with the project web key
//! - Turn the provider's answer into a Subject
//! - Separate "credential rejected" (4xx) from "provider broken" (5xx, IO)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, IdentityVerifier, Subject, VerifiedIdentity};
use crate::config::IdentityConfig;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Verifier backed by the Identity Toolkit REST API.
#[derive(Clone)]
pub struct IdentityToolkitVerifier {
    client: Client,
    lookup_url: String,
    api_key: String,
}

impl IdentityToolkitVerifier {
    pub fn new(config: &IdentityConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            lookup_url: format!("{}/accounts:lookup", config.endpoint.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl IdentityVerifier for IdentityToolkitVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, AuthError> {
        let response = self
            .client
            .post(&self.lookup_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&LookupRequest { id_token: credential })
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            tracing::debug!(status = %status, "Identity provider rejected credential");
            return Err(AuthError::Unauthenticated("credential rejected by provider"));
        }
        if !status.is_success() {
            return Err(AuthError::ProviderUnavailable(format!("status {}", status)));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        identity_from_lookup(body)
    }
}

fn identity_from_lookup(body: LookupResponse) -> Result<VerifiedIdentity, AuthError> {
    let user = body
        .users
        .into_iter()
        .next()
        .filter(|u| !u.local_id.is_empty())
        .ok_or(AuthError::Unauthenticated("no user for credential"))?;

    Ok(VerifiedIdentity {
        subject: Subject::new(user.local_id),
        email: user.email,
    })
}

impl std::fmt::Debug for IdentityToolkitVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToolkitVerifier")
            .field("lookup_url", &self.lookup_url)
            .finish()
    }
}
