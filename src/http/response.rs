//! Error responses.
//!
//! # Responsibilities
//! - Map each ChatError to its status code
//! - Render `{"error": "<generic message>"}` bodies
//! - Add `Allow` on 405 and `Retry-After` on 429
//!
//! # Design Decisions
//! - Bodies never carry internal detail; that goes to the log only
//! - Panics caught at the top become the same 500 body as any internal error

use std::any::Any;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::pipeline::ChatError;

impl ChatError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ChatError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ChatError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ChatError::InvalidInput => StatusCode::BAD_REQUEST,
            ChatError::Upstream | ChatError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let mut response =
            (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response();

        match self {
            ChatError::MethodNotAllowed => {
                response
                    .headers_mut()
                    .insert(header::ALLOW, HeaderValue::from_static("POST"));
            }
            ChatError::RateLimited { retry_after_secs } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            }
            _ => {}
        }

        response
    }
}

/// Handler for `CatchPanicLayer`.
pub fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Request handler panicked");
    ChatError::Internal.into_response()
}
