//! Exchange persistence.
//!
//! # Data Flow
//! ```text
//! (Subject, message, answer)
//!     → Recorder::record (spawned write, awaited)
//!     → ExchangeStore::append (Firestore or JSONL)
//!     → failure: warn log + chat_record_failures_total, never an error to the caller
//! ```
//!
//! # Design Decisions
//! - Best effort: a successful relay is never turned into an error by a failed write
//! - The write runs on its own task so a client disconnect does not cut it short
//! - Records are append-only; the timestamp is assigned by the storage side

pub mod credentials;
pub mod firestore;
pub mod jsonl;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::Subject;
use crate::observability::metrics;

pub use credentials::{ServiceAccountTokens, StaticToken, TokenSource};
pub use firestore::FirestoreStore;
pub use jsonl::JsonlStore;

/// An exchange about to be written; the store adds the timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExchange {
    pub user_id: String,
    pub message: String,
    pub response: String,
}

/// A persisted exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRecord {
    pub user_id: String,
    pub message: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl ExchangeRecord {
    pub fn stamped(exchange: &NewExchange, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id: exchange.user_id.clone(),
            message: exchange.message.clone(),
            response: exchange.response.clone(),
            timestamp,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned status {0}")]
    Status(u16),

    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("could not obtain store credentials: {0}")]
    Token(String),
}

#[async_trait]
pub trait ExchangeStore: Send + Sync {
    async fn append(&self, exchange: &NewExchange) -> Result<(), StoreError>;

    /// Flush and release resources at shutdown.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Best-effort writer in front of an [`ExchangeStore`].
#[derive(Clone)]
pub struct Recorder {
    store: Arc<dyn ExchangeStore>,
}

impl Recorder {
    pub fn new(store: Arc<dyn ExchangeStore>) -> Self {
        Self { store }
    }

    /// Append one exchange. Failures are logged and counted, never returned.
    pub async fn record(&self, subject: &Subject, message: &str, response: &str) {
        let exchange = NewExchange {
            user_id: subject.to_string(),
            message: message.to_string(),
            response: response.to_string(),
        };
        let store = self.store.clone();

        let write = tokio::spawn(async move { store.append(&exchange).await });

        match write.await {
            Ok(Ok(())) => {
                tracing::debug!(subject = %subject, "Exchange recorded");
            }
            Ok(Err(e)) => {
                tracing::warn!(subject = %subject, error = %e, "Failed to record exchange");
                metrics::record_persistence_failure();
            }
            Err(e) => {
                tracing::error!(subject = %subject, error = %e, "Exchange write task failed");
                metrics::record_persistence_failure();
            }
        }
    }

    pub async fn close(&self) {
        if let Err(e) = self.store.close().await {
            tracing::warn!(error = %e, "Failed to close exchange store");
        }
    }
}
