//! Metrics collection and exposition.
//!
//! # Metrics
//! - `chat_requests_total` (counter): chat requests by response status
//! - `chat_request_duration_seconds` (histogram): end-to-end pipeline latency
//! - `chat_rate_limited_total` (counter): requests denied admission
//! - `chat_record_failures_total` (counter): exchange writes that failed
//! - `chat_upstream_requests_total` (counter): upstream attempts by outcome
//! - `chat_upstream_duration_seconds` (histogram): upstream attempt latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint and install the global recorder.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(status: u16, start_time: Instant) {
    counter!("chat_requests_total", "status" => status.to_string()).increment(1);
    histogram!("chat_request_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("chat_rate_limited_total").increment(1);
}

pub fn record_persistence_failure() {
    counter!("chat_record_failures_total").increment(1);
}

pub fn record_upstream(outcome: &'static str, start_time: Instant) {
    counter!("chat_upstream_requests_total", "outcome" => outcome).increment(1);
    histogram!("chat_upstream_duration_seconds", "outcome" => outcome)
        .record(start_time.elapsed().as_secs_f64());
}
