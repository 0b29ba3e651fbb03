//! `/chat` handler.

use std::time::Instant;

use tokio::time;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pipeline::ChatError;

/// Accepts every method so non-POST requests get the pipeline's own 405 body.
pub async fn chat_handler(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start_time = Instant::now();

    let outcome = time::timeout(
        state.request_timeout,
        state.pipeline.run(&method, &headers, &body),
    )
    .await
    .unwrap_or_else(|_| {
        tracing::error!(deadline = ?state.request_timeout, "Chat request deadline exceeded");
        Err(ChatError::Upstream)
    });

    let response = match outcome {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    };

    metrics::record_request(response.status().as_u16(), start_time);
    response
}
