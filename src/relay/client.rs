//! HTTP client for the upstream generation service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

use crate::auth::Subject;
use crate::config::GenerationConfig;
use crate::observability::metrics;
use crate::relay::{GenerationRequest, GenerationResult, GenerationService, RelayError};
use crate::resilience::RetryPolicy;

/// Relay to a single configured endpoint.
#[derive(Clone)]
pub struct HttpGenerationClient {
    client: Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
}

impl HttpGenerationClient {
    pub fn new(
        config: &GenerationConfig,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            retry,
        })
    }

    async fn attempt(&self, subject: &Subject, text: &str) -> Result<GenerationResult, RelayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&GenerationRequest {
                query: text,
                user: subject.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| RelayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    async fn generate(&self, subject: &Subject, text: &str) -> Result<GenerationResult, RelayError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let start_time = Instant::now();
            let outcome = self.attempt(subject, text).await;

            match outcome {
                Ok(result) => {
                    metrics::record_upstream("ok", start_time);
                    return Ok(result);
                }
                Err(e) => {
                    metrics::record_upstream(e.kind(), start_time);

                    if self.retry.should_retry(attempt, e.is_retryable()) {
                        let delay = self.retry.delay(attempt);
                        tracing::info!(
                            subject = %subject,
                            attempt,
                            delay = ?delay,
                            error = %e,
                            "Retrying upstream generation"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    return Err(e);
                }
            }
        }
    }
}

impl std::fmt::Debug for HttpGenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGenerationClient")
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .finish()
    }
}
