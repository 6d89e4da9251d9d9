//! HTTP trigger surface.
//!
//! Routes:
//! - `POST /restore-fragment`: queue a `restore-commit/project` event
//! - `POST /github-sync`: queue a `github-sync/project` event
//! - `GET /events/{id}`: poll an event's status and output
//! - `POST /fragments`: record a generated fragment
//! - `GET /projects/{id}/fragments`: list a project's fragments
//! - `GET /health`
//! - `GET /metrics`: Prometheus text format

pub mod handlers;

use crate::config::GatewayConfig;
use crate::observability::Metrics;
use crate::store::Store;
use crate::workflow::WorkflowEngine;
use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
    pub store: Store,
    pub metrics: Arc<Metrics>,
}

pub fn router(state: AppState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/restore-fragment", post(handlers::handle_restore_fragment))
        .route("/github-sync", post(handlers::handle_github_sync))
        .route("/events/{id}", get(handlers::handle_event_status))
        .route("/fragments", post(handlers::handle_create_fragment))
        .route("/projects/{id}/fragments", get(handlers::handle_list_fragments))
        .route("/health", get(handlers::handle_health))
        .route("/metrics", get(handlers::handle_metrics))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn run_gateway(state: AppState, config: &GatewayConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind gateway on {addr}"))?;
    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, router(state, config))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("Gateway server error")?;
    Ok(())
}
