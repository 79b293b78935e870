//! HTTP service assembly and startup.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tracing::info;

use crate::catalog::Catalog;
use crate::config::CoreConfig;
use crate::gate::ImportGate;
use crate::limiter::FixedWindowLimiter;
use crate::middleware::{access_log, content_length_guard, rate_limit, security_headers};
use crate::sandbox::ProcessSandbox;
use crate::trainer::Trainer;

/// Shared resources behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub trainer: Arc<Trainer>,
    pub limiter: Arc<FixedWindowLimiter>,
    pub max_body_bytes: usize,
}

/// Builds the application router with the full middleware chain.
///
/// Layer order is outermost first: header policy, rate limiter, request
/// guard (declared-length check, then the streaming cap), access logger.
pub fn build_router(state: AppState) -> Router {
    let max_body_bytes = state.max_body_bytes;
    Router::new()
        .route("/api/lessons", get(handlers::list_lessons))
        .route("/api/lessons/{id}", get(handlers::get_lesson))
        .route("/api/run", post(handlers::run_submission))
        .route("/api/metrics", post(handlers::report_metrics))
        .route("/healthz", get(handlers::healthz))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(security_headers))
                .layer(from_fn_with_state(state.clone(), rate_limit))
                .layer(from_fn_with_state(state.clone(), content_length_guard))
                .layer(DefaultBodyLimit::max(max_body_bytes))
                .layer(from_fn(access_log)),
        )
        .with_state(state)
}

/// Wires the default native deployment (subprocess sandbox) and serves it.
///
/// Failing to bind the listener is the one error allowed to halt the whole
/// service; everything after this point is isolated per request.
pub async fn run(config: CoreConfig, catalog: Catalog) -> Result<()> {
    let catalog = Arc::new(catalog);
    let backend = Arc::new(ProcessSandbox::new(config.sandbox.clone()));
    let trainer = Arc::new(Trainer::new(
        ImportGate::denylist(),
        backend,
        Arc::clone(&catalog),
    ));

    let limiter = Arc::new(FixedWindowLimiter::new(
        config.rate_limit.limit,
        config.rate_limit.window(),
    ));
    // Started once for the process lifetime; never restarted.
    let _sweeper = FixedWindowLimiter::spawn_sweeper(
        Arc::clone(&limiter),
        config.rate_limit.sweep_interval(),
    );

    let state = AppState {
        catalog,
        trainer,
        limiter,
        max_body_bytes: config.request_guard.max_body_bytes,
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!(addr = %config.server.bind, "codedrill listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server terminated unexpectedly")
}
