//! Per-client rate limiting middleware.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::limiter::client_identity;
use crate::server::AppState;

/// Rejects requests over the fixed-window limit with 429 before they reach
/// the request guard or any handler. Rejections are HTTP-level outcomes and
/// are never counted as execution errors.
pub async fn rate_limit(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let identity = client_identity(request.headers(), peer);
    if !state.limiter.allow(&identity) {
        debug!(client = %identity, "rate limit exceeded");
        return (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response();
    }
    next.run(request).await
}
