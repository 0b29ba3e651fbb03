//! Sign-in gated chat relay.
//!
//! Verifies the caller, applies a per-user rate budget, relays the message to
//! an upstream generation service and records the exchange.

pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod ratelimit;
pub mod recorder;
pub mod relay;
pub mod resilience;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{ChatError, ChatPipeline};
