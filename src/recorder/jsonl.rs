//! Append-only JSON lines file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::recorder::{ExchangeRecord, ExchangeStore, NewExchange, StoreError};

/// One JSON object per line, stamped with the UTC time of the write.
pub struct JsonlStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        tracing::info!(path = %path.display(), "Exchange log opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ExchangeStore for JsonlStore {
    async fn append(&self, exchange: &NewExchange) -> Result<(), StoreError> {
        let mut file = self.file.lock().await;

        let record = ExchangeRecord::stamped(exchange, Utc::now());
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        let file = self.file.lock().await;
        file.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exchanges.jsonl");

        let store = JsonlStore::open(&path).await.unwrap();
        for (message, response) in [("hello", "hi"), ("bye", "see you")] {
            store
                .append(&NewExchange {
                    user_id: "u1".into(),
                    message: message.into(),
                    response: response.into(),
                })
                .await
                .unwrap();
        }
        store.close().await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let records: Vec<ExchangeRecord> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].user_id, "u1");
        assert_eq!(records[1].response, "see you");
        assert!(records[0].timestamp <= records[1].timestamp);
    }

    #[tokio::test]
    async fn test_reopen_keeps_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exchanges.jsonl");
        let exchange = NewExchange {
            user_id: "u1".into(),
            message: "hello".into(),
            response: "hi".into(),
        };

        JsonlStore::open(&path).await.unwrap().append(&exchange).await.unwrap();
        JsonlStore::open(&path).await.unwrap().append(&exchange).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
