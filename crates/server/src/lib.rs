//! HTTP adapter for the pool watch service.
//!
//! All logic lives in `poolwatch_core`. This crate binds routes to it, adds
//! request ids and a concurrency limit, and runs the process.

pub mod middleware;
pub mod router;

use axum::{
    routing::{get, post},
    Router,
};
use poolwatch_core::{
    anchor::AnchorResolver, config::AppConfig, metrics::MetricsCollector,
    retention::RetentionStore, win::WinIntake,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;

/// Handles shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<AnchorResolver>,
    pub intake: Arc<WinIntake>,
    pub store: Arc<RetentionStore>,
    /// `None` when metrics are disabled; `/metrics` then answers 404.
    pub metrics: Option<MetricsCollector>,
}

/// Builds the full router with request-id and concurrency layers.
pub fn create_app(state: AppState, config: &AppConfig) -> Router {
    let (set_request_id, propagate_request_id) = middleware::create_request_id_layers();

    Router::new()
        .route("/filecoin/head", get(router::handle_head))
        .route("/filecoin/win/report", post(router::handle_win_report))
        .route("/filecoin/win/status", get(router::handle_win_status))
        .route("/filecoin/win/clear", post(router::handle_win_clear))
        .route("/health", get(router::handle_health))
        .route("/metrics", get(router::handle_metrics))
        .with_state(state)
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        // Layers run bottom-up, so the id is set before it is propagated.
        .layer(propagate_request_id)
        .layer(set_request_id)
}
