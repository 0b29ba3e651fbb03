//! Startup orchestration.
//!
//! # Responsibilities
//! - Build one client per external service from validated configuration
//! - Pick the rate and exchange stores
//! - Start background upkeep tasks
//! - Hand back a fully wired ChatPipeline
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Every outbound client carries its own timeout from `[timeouts]`

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time;

use crate::auth::IdentityToolkitVerifier;
use crate::config::{ExchangeStoreKind, FirestoreConfig, RateStoreKind, RelayConfig};
use crate::lifecycle::Shutdown;
use crate::pipeline::ChatPipeline;
use crate::ratelimit::{AdmissionGate, InMemoryRateStore, RateStore, RedisRestStore};
use crate::recorder::credentials::read_service_account;
use crate::recorder::{
    ExchangeStore, FirestoreStore, JsonlStore, Recorder, ServiceAccountTokens, StaticToken,
    StoreError, TokenSource,
};
use crate::relay::HttpGenerationClient;
use crate::resilience::RetryPolicy;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build {service} client: {source}")]
    Client {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to open exchange store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to load service account {path}: {source}")]
    Credentials {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("recorder.firestore.project_id is empty and the service account names no project")]
    MissingProject,
}

fn client_error(service: &'static str) -> impl FnOnce(reqwest::Error) -> StartupError {
    move |source| StartupError::Client { service, source }
}

/// Wire every collaborator described by `config`.
pub async fn build_pipeline(
    config: &RelayConfig,
    shutdown: &Shutdown,
) -> Result<ChatPipeline, StartupError> {
    let timeouts = &config.timeouts;

    let verifier = IdentityToolkitVerifier::new(
        &config.identity,
        Duration::from_secs(timeouts.identity_secs),
    )
    .map_err(client_error("identity"))?;

    let gate = build_gate(config, shutdown)?;

    let retry = RetryPolicy::from_config(&config.retries);
    let relay = HttpGenerationClient::new(
        &config.generation,
        Duration::from_secs(timeouts.generation_secs),
        retry,
    )
    .map_err(client_error("generation"))?;

    let store: Arc<dyn ExchangeStore> = match config.recorder.store {
        ExchangeStoreKind::Firestore => Arc::new(
            build_firestore(
                &config.recorder.firestore,
                Duration::from_secs(timeouts.recorder_secs),
            )
            .await?,
        ),
        ExchangeStoreKind::Jsonl => Arc::new(JsonlStore::open(&config.recorder.jsonl_path).await?),
    };

    tracing::info!(
        rate_store = ?config.rate_limit.store,
        rate_limit_enabled = config.rate_limit.enabled,
        exchange_store = ?config.recorder.store,
        retry_attempts = retry.max_attempts,
        "Pipeline collaborators initialized"
    );

    Ok(ChatPipeline::new(
        Arc::new(verifier),
        gate,
        Arc::new(relay),
        Recorder::new(store),
    ))
}

async fn build_firestore(
    config: &FirestoreConfig,
    timeout: Duration,
) -> Result<FirestoreStore, StartupError> {
    let mut config = config.clone();

    let tokens: Arc<dyn TokenSource> = if config.credentials_path.trim().is_empty() {
        tracing::warn!("Firestore uses a fixed access token; it will not be refreshed");
        Arc::new(StaticToken::new(config.access_token.clone()))
    } else {
        let path = config.credentials_path.clone();
        let credentials_error = |source| StartupError::Credentials {
            path: path.clone(),
            source,
        };

        let key = read_service_account(&path).await.map_err(credentials_error)?;
        if config.project_id.trim().is_empty() {
            config.project_id = key.project_id.clone().unwrap_or_default();
        }
        let tokens = ServiceAccountTokens::from_key(key)
            .await
            .map_err(credentials_error)?;
        tracing::info!(client_email = tokens.client_email(), "Firestore service account loaded");
        Arc::new(tokens)
    };

    if config.project_id.trim().is_empty() {
        return Err(StartupError::MissingProject);
    }

    FirestoreStore::new(&config, timeout, tokens).map_err(client_error("firestore"))
}

fn build_gate(config: &RelayConfig, shutdown: &Shutdown) -> Result<AdmissionGate, StartupError> {
    let rate = &config.rate_limit;
    if !rate.enabled {
        tracing::warn!("Rate limiting disabled, every verified request is admitted");
        return Ok(AdmissionGate::disabled());
    }

    let store: Arc<dyn RateStore> = match rate.store {
        RateStoreKind::Redis => Arc::new(
            RedisRestStore::new(
                &rate.redis,
                Duration::from_secs(config.timeouts.rate_store_secs),
            )
            .map_err(client_error("rate store"))?,
        ),
        RateStoreKind::Memory => {
            tracing::warn!("Using in-memory rate store; limits are per instance");
            let store = Arc::new(InMemoryRateStore::new());
            let window = Duration::from_secs(rate.window_secs);
            tokio::spawn(purge_idle_keys(store.clone(), window, shutdown.subscribe()));
            store
        }
    };

    Ok(AdmissionGate::from_config(store, rate))
}

/// Periodically forget subjects that have been idle for a whole window.
async fn purge_idle_keys(
    store: Arc<InMemoryRateStore>,
    window: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = time::interval(window);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                store.purge_idle(window);
                tracing::debug!(tracked = store.tracked_keys(), "Purged idle rate limit keys");
            }
            _ = shutdown.recv() => {
                tracing::debug!("Rate key purge task exiting");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jsonl_config(path: &std::path::Path) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.identity.api_key = "web-key".into();
        config.generation.endpoint = "http://127.0.0.1:9/generate".into();
        config.generation.api_key = "service-key".into();
        config.rate_limit.store = RateStoreKind::Memory;
        config.recorder.store = ExchangeStoreKind::Jsonl;
        config.recorder.jsonl_path = path.to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn test_builds_with_local_stores() {
        let dir = tempfile::tempdir().unwrap();
        let config = jsonl_config(&dir.path().join("log.jsonl"));
        let shutdown = Shutdown::new();

        let pipeline = build_pipeline(&config, &shutdown).await.unwrap();
        // The purge task holds a receiver until shutdown.
        assert_eq!(shutdown.receiver_count(), 1);

        shutdown.trigger();
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_service_account_is_startup_error() {
        let mut config = jsonl_config(std::path::Path::new("unused.jsonl"));
        config.recorder.store = ExchangeStoreKind::Firestore;
        config.recorder.firestore.credentials_path = "/nonexistent/key.json".into();

        let result = build_pipeline(&config, &Shutdown::new()).await;
        assert!(matches!(result, Err(StartupError::Credentials { .. })));
    }

    #[tokio::test]
    async fn test_fixed_token_needs_project() {
        let mut config = jsonl_config(std::path::Path::new("unused.jsonl"));
        config.recorder.store = ExchangeStoreKind::Firestore;
        config.recorder.firestore.access_token = "ya29.local".into();

        let result = build_pipeline(&config, &Shutdown::new()).await;
        assert!(matches!(result, Err(StartupError::MissingProject)));

        config.recorder.firestore.project_id = "demo".into();
        assert!(build_pipeline(&config, &Shutdown::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unwritable_log_is_startup_error() {
        let config = jsonl_config(std::path::Path::new("/nonexistent-dir/log.jsonl"));
        let result = build_pipeline(&config, &Shutdown::new()).await;
        assert!(matches!(result, Err(StartupError::Store(_))));
    }
}
