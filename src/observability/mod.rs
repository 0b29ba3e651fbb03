//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (subject, request_id, status) instead of formatted strings
//! - Request ID flows through every log line of a request via the trace span
//! - Metrics are cheap (atomic increments); recording without an exporter is a no-op
//! - Secrets are never logged

pub mod logging;
pub mod metrics;
