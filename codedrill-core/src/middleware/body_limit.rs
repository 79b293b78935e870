//! Request body cap.
//!
//! Two checks back each other up: the declared content length is rejected
//! here before any handler runs, and `RequestBodyLimitLayer` (stacked below
//! this middleware in the router) caps the body stream itself, since the
//! declared length is caller-supplied and untrustworthy alone.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::server::AppState;

/// Rejects requests whose declared `Content-Length` exceeds the cap.
pub async fn content_length_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    if let Some(length) = declared {
        if length > state.max_body_bytes as u64 {
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    }

    next.run(request).await
}
