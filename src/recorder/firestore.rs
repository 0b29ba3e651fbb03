//! Cloud Firestore over REST.
//!
//! # Responsibilities
//! - Create one document per exchange in the configured collection
//! - Let the server stamp `timestamp` (`REQUEST_TIME` transform)
//!
//! # Design Decisions
//! - `documents:commit` with `exists: false`, so a write can only ever create
//! - Document IDs are UUID v4, generated here
//! - A bearer token is fetched per write; the token source caches and refreshes

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::FirestoreConfig;
use crate::recorder::{ExchangeStore, NewExchange, StoreError, TokenSource};

#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    commit_url: String,
    documents_root: String,
    collection: String,
    tokens: Arc<dyn TokenSource>,
}

impl FirestoreStore {
    pub fn new(
        config: &FirestoreConfig,
        timeout: Duration,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        let documents_root = format!(
            "projects/{}/databases/(default)/documents",
            config.project_id
        );
        Ok(Self {
            client,
            commit_url: format!(
                "{}/{}:commit",
                config.endpoint.trim_end_matches('/'),
                documents_root
            ),
            documents_root,
            collection: config.collection.clone(),
            tokens,
        })
    }

    fn commit_body(&self, document_id: &str, exchange: &NewExchange) -> Value {
        json!({
            "writes": [{
                "update": {
                    "name": format!("{}/{}/{}", self.documents_root, self.collection, document_id),
                    "fields": {
                        "userId": { "stringValue": exchange.user_id },
                        "message": { "stringValue": exchange.message },
                        "response": { "stringValue": exchange.response },
                    }
                },
                "updateTransforms": [{
                    "fieldPath": "timestamp",
                    "setToServerValue": "REQUEST_TIME"
                }],
                "currentDocument": { "exists": false }
            }]
        })
    }
}

#[async_trait]
impl ExchangeStore for FirestoreStore {
    async fn append(&self, exchange: &NewExchange) -> Result<(), StoreError> {
        let document_id = Uuid::new_v4().to_string();
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .post(&self.commit_url)
            .bearer_auth(token)
            .json(&self.commit_body(&document_id, exchange))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for FirestoreStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreStore")
            .field("commit_url", &self.commit_url)
            .field("collection", &self.collection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::recorder::StaticToken;

    fn store() -> FirestoreStore {
        let config = FirestoreConfig {
            endpoint: "https://firestore.example.com/v1/".into(),
            project_id: "demo".into(),
            collection: "chatLogs".into(),
            ..FirestoreConfig::default()
        };
        FirestoreStore::new(
            &config,
            Duration::from_secs(1),
            Arc::new(StaticToken::new("ya29.secret")),
        )
        .unwrap()
    }

    #[test]
    fn test_commit_url() {
        assert_eq!(
            store().commit_url,
            "https://firestore.example.com/v1/projects/demo/databases/(default)/documents:commit"
        );
    }

    #[test]
    fn test_commit_body_creates_with_server_timestamp() {
        let body = store().commit_body(
            "doc-1",
            &NewExchange {
                user_id: "u1".into(),
                message: "hello".into(),
                response: "hi".into(),
            },
        );
        let write = &body["writes"][0];

        assert_eq!(
            write["update"]["name"],
            "projects/demo/databases/(default)/documents/chatLogs/doc-1"
        );
        assert_eq!(write["update"]["fields"]["userId"]["stringValue"], "u1");
        assert_eq!(write["update"]["fields"]["response"]["stringValue"], "hi");
        assert_eq!(write["updateTransforms"][0]["setToServerValue"], "REQUEST_TIME");
        assert_eq!(write["currentDocument"]["exists"], false);
    }

    #[test]
    fn test_debug_hides_token() {
        assert!(!format!("{:?}", store()).contains("ya29.secret"));
    }
}
