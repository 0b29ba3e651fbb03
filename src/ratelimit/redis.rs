//! Managed Redis over its REST interface.
//!
//! # Responsibilities
//! - Run the sliding-window script (`EVAL`) against the shared database
//! - Decode `{"result": [allowed, remaining, reset_ms]}` replies
//!
//! # Design Decisions
//! - The script reads the Redis clock, so instances never disagree on "now"
//! - Each attempt gets a unique sorted-set member (UUID v4)
//! - Keys expire with the window, so idle subjects cost nothing

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::RedisRestConfig;
use crate::ratelimit::{RateStore, RateStoreError, RateVerdict};

const SLIDING_WINDOW_SCRIPT: &str = include_str!("sliding_window.lua");

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct RedisRestStore {
    client: Client,
    url: String,
    token: String,
}

impl RedisRestStore {
    pub fn new(config: &RedisRestConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl RateStore for RedisRestStore {
    async fn consume(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<RateVerdict, RateStoreError> {
        let command = json!([
            "EVAL",
            SLIDING_WINDOW_SCRIPT,
            "1",
            key,
            window.as_millis().to_string(),
            limit.to_string(),
            Uuid::new_v4().to_string(),
        ]);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await?;

        let status = response.status();
        let reply: RestReply = match response.json().await {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => return Err(RateStoreError::Status(status.as_u16())),
            Err(e) => return Err(RateStoreError::Reply(e.to_string())),
        };

        if let Some(error) = reply.error {
            return Err(RateStoreError::Store(error));
        }
        if !status.is_success() {
            return Err(RateStoreError::Status(status.as_u16()));
        }

        verdict_from_result(reply.result.unwrap_or(Value::Null))
    }
}

fn verdict_from_result(result: Value) -> Result<RateVerdict, RateStoreError> {
    let (allowed, remaining, reset_at_ms): (i64, i64, i64) =
        serde_json::from_value(result.clone()).map_err(|_| RateStoreError::Reply(result.to_string()))?;

    Ok(RateVerdict {
        success: allowed == 1,
        remaining: remaining.clamp(0, i64::from(u32::MAX)) as u32,
        reset_at_ms: reset_at_ms.max(0) as u64,
    })
}

impl std::fmt::Debug for RedisRestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRestStore")
            .field("url", &self.url)
            .finish()
    }
}
