//! Process-local sliding log.
//!
//! Counts are kept per process, so limits are only correct with a single
//! instance. Use the Redis store when more than one instance serves traffic.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::ratelimit::{unix_millis, RateStore, RateStoreError, RateVerdict};

#[derive(Default)]
pub struct InMemoryRateStore {
    logs: DashMap<String, VecDeque<Instant>>,
}

impl InMemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop keys whose every entry is older than `window`.
    pub fn purge_idle(&self, window: Duration) {
        let now = Instant::now();
        self.logs.retain(|_, log| {
            log.back()
                .is_some_and(|&newest| now.duration_since(newest) < window)
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.logs.len()
    }
}

#[async_trait]
impl RateStore for InMemoryRateStore {
    async fn consume(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<RateVerdict, RateStoreError> {
        let now = Instant::now();
        let mut log = self.logs.entry(key.to_string()).or_default();

        while let Some(&oldest) = log.front() {
            if now.duration_since(oldest) >= window {
                log.pop_front();
            } else {
                break;
            }
        }

        let success = (log.len() as u64) < u64::from(limit);
        if success {
            log.push_back(now);
        }

        let remaining = limit.saturating_sub(log.len() as u32);
        let reset_in = log
            .front()
            .map(|&oldest| (oldest + window).saturating_duration_since(now))
            .unwrap_or(window);

        Ok(RateVerdict {
            success,
            remaining,
            reset_at_ms: unix_millis() + reset_in.as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_sixth_request_denied_until_window_passes() {
        let store = InMemoryRateStore::new();

        for i in 0..5 {
            let verdict = store.consume("u1", 5, WINDOW).await.unwrap();
            assert!(verdict.success, "request {} should be admitted", i + 1);
            assert_eq!(verdict.remaining, 4 - i);
        }

        let denied = store.consume("u1", 5, WINDOW).await.unwrap();
        assert!(!denied.success);
        assert_eq!(denied.remaining, 0);

        tokio::time::advance(WINDOW).await;

        let admitted = store.consume("u1", 5, WINDOW).await.unwrap();
        assert!(admitted.success);
        assert_eq!(admitted.remaining, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let store = InMemoryRateStore::new();

        for _ in 0..3 {
            assert!(store.consume("u1", 5, WINDOW).await.unwrap().success);
        }
        tokio::time::advance(Duration::from_secs(30)).await;
        for _ in 0..2 {
            assert!(store.consume("u1", 5, WINDOW).await.unwrap().success);
        }
        assert!(!store.consume("u1", 5, WINDOW).await.unwrap().success);

        // The first three fall out; the two from t=30s still count.
        tokio::time::advance(Duration::from_secs(30)).await;
        for _ in 0..3 {
            assert!(store.consume("u1", 5, WINDOW).await.unwrap().success);
        }
        assert!(!store.consume("u1", 5, WINDOW).await.unwrap().success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subjects_are_independent() {
        let store = InMemoryRateStore::new();
        assert!(store.consume("a", 1, WINDOW).await.unwrap().success);
        assert!(!store.consume("a", 1, WINDOW).await.unwrap().success);
        assert!(store.consume("b", 1, WINDOW).await.unwrap().success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_idle() {
        let store = InMemoryRateStore::new();
        store.consume("a", 5, WINDOW).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        store.consume("b", 5, WINDOW).await.unwrap();

        tokio::time::advance(Duration::from_secs(55)).await;
        store.purge_idle(WINDOW);
        assert_eq!(store.tracked_keys(), 1);
    }
}
