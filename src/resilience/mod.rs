//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Relay call to the generation service:
//!     → bounded by the client timeout (always on)
//!     → On failure: retries.rs (check if retryable, retry with backoff)
//!     → backoff.rs (exponential delay with jitter)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries are opt-in; the relay POST is not idempotent on the upstream side
//! - Only transport failures and gateway-style statuses are retryable

pub mod backoff;
pub mod retries;

pub use retries::RetryPolicy;
