//! Bearer tokens for the document store.
//!
//! Production writes use a service-account key: `yup-oauth2` signs a JWT
//! grant, exchanges it at the key's `token_uri` and keeps the access token in
//! memory until shortly before it expires. A fixed token is accepted for
//! emulators and local runs.

use std::path::Path;

use async_trait::async_trait;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

use crate::recorder::StoreError;

/// Scope needed to commit documents.
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A currently valid bearer token.
    async fn access_token(&self) -> Result<String, StoreError>;
}

/// Always hands out the same token.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, StoreError> {
        Ok(self.0.clone())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

/// Tokens minted from a service-account key and refreshed on expiry.
pub struct ServiceAccountTokens {
    authenticator: DefaultAuthenticator,
    client_email: String,
}

impl ServiceAccountTokens {
    pub async fn from_key(key: ServiceAccountKey) -> std::io::Result<Self> {
        let client_email = key.client_email.clone();
        let authenticator = ServiceAccountAuthenticator::builder(key).build().await?;
        Ok(Self {
            authenticator,
            client_email,
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> Result<String, StoreError> {
        let token = self
            .authenticator
            .token(&[DATASTORE_SCOPE])
            .await
            .map_err(|e| StoreError::Token(e.to_string()))?;

        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| StoreError::Token("token endpoint returned no access token".into()))
    }
}

impl std::fmt::Debug for ServiceAccountTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountTokens")
            .field("client_email", &self.client_email)
            .finish()
    }
}

/// Read a service-account key file as downloaded from the cloud console.
pub async fn read_service_account(path: impl AsRef<Path>) -> std::io::Result<ServiceAccountKey> {
    yup_oauth2::read_service_account_key(path).await
}
