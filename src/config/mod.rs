//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → consumed once by lifecycle::startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Secrets come from the environment, not the file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::RelayConfig;
pub use schema::{
    ExchangeStoreKind, FirestoreConfig, GenerationConfig, IdentityConfig, ListenerConfig,
    ObservabilityConfig, RateLimitConfig, RateStoreKind, RecorderConfig, RedisRestConfig,
    RetryConfig, SecurityConfig, TimeoutConfig,
};
