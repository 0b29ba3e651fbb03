//! Shared fakes and servers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;

use chat_relay::auth::{AuthError, IdentityVerifier, Subject, VerifiedIdentity};
use chat_relay::config::RelayConfig;
use chat_relay::ratelimit::{RateStore, RateStoreError, RateVerdict};
use chat_relay::recorder::{ExchangeStore, NewExchange, StoreError};
use chat_relay::relay::{GenerationResult, GenerationService, RelayError};
use chat_relay::{ChatPipeline, HttpServer, Shutdown};

/// Serve `app` on an ephemeral local port.
pub async fn spawn_app(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Run the relay's own HTTP server around `pipeline`.
pub async fn spawn_relay(pipeline: ChatPipeline) -> (SocketAddr, Shutdown) {
    spawn_relay_with(RelayConfig::default(), pipeline).await
}

pub async fn spawn_relay_with(config: RelayConfig, pipeline: ChatPipeline) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, Arc::new(pipeline));
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Accepts `token-<subject>` credentials. `provider-down` behaves like an
/// unreachable identity provider.
#[derive(Default)]
pub struct StubVerifier {
    pub calls: AtomicUsize,
}

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if credential == "provider-down" {
            return Err(AuthError::ProviderUnavailable("connection refused".into()));
        }
        match credential.strip_prefix("token-") {
            Some(subject) if !subject.is_empty() => Ok(VerifiedIdentity {
                subject: Subject::new(subject),
                email: None,
            }),
            _ => Err(AuthError::Unauthenticated("unknown token")),
        }
    }
}

/// Counts calls and delegates, or fails every call when `inner` is `None`.
pub struct CountingRateStore {
    pub inner: Option<Arc<dyn RateStore>>,
    pub calls: AtomicUsize,
}

impl CountingRateStore {
    pub fn wrapping(inner: Arc<dyn RateStore>) -> Self {
        Self { inner: Some(inner), calls: AtomicUsize::new(0) }
    }

    pub fn failing() -> Self {
        Self { inner: None, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl RateStore for CountingRateStore {
    async fn consume(&self, key: &str, limit: u32, window: Duration) -> Result<RateVerdict, RateStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.inner {
            Some(inner) => inner.consume(key, limit, window).await,
            None => Err(RateStoreError::Store("connection refused".into())),
        }
    }
}

/// Answers with a fixed result, or fails with the given status, optionally
/// after a delay.
pub struct StubRelay {
    pub answer: Result<GenerationResult, u16>,
    pub delay: Option<Duration>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl StubRelay {
    pub fn answering(answer: &str) -> Self {
        Self { answer: Ok(GenerationResult::new(answer)), delay: None, calls: Mutex::new(Vec::new()) }
    }

    pub fn failing(status: u16) -> Self {
        Self { answer: Err(status), delay: None, calls: Mutex::new(Vec::new()) }
    }

    pub fn slow(answer: &str, delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::answering(answer) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationService for StubRelay {
    async fn generate(&self, subject: &Subject, text: &str) -> Result<GenerationResult, RelayError> {
        self.calls
            .lock()
            .unwrap()
            .push((subject.to_string(), text.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.answer {
            Ok(result) => Ok(result.clone()),
            Err(status) => Err(RelayError::Status(*status)),
        }
    }
}

/// Keeps records in memory, or rejects every write when `fail` is set.
#[derive(Default)]
pub struct MemoryExchangeStore {
    pub fail: bool,
    pub records: Mutex<Vec<NewExchange>>,
    pub attempts: AtomicUsize,
}

impl MemoryExchangeStore {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn records(&self) -> Vec<NewExchange> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeStore for MemoryExchangeStore {
    async fn append(&self, exchange: &NewExchange) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::Status(503));
        }
        self.records.lock().unwrap().push(exchange.clone());
        Ok(())
    }
}
