//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, per-request span)
//!     → chat.rs (hands method/headers/body to the pipeline)
//!     → response.rs (ChatError → status + JSON error body)
//!     → Send to client
//! ```

pub mod chat;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
