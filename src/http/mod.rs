//! HTTP REST adapter
//!
//! Depends only on core/. Never imports from cli/.
//!
//! Provides HTTP endpoints for site discovery, job control, stats,
//! listing and search via Axum web framework.

pub mod error;
pub mod handlers;
pub mod middleware;

pub use handlers::*;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::core::services::Services;

/// Build the API router over shared services
pub fn router(services: Arc<Services>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_handler))
        // Discovery and job control
        .route("/api/sites/discover", get(discover_sites_handler))
        .route("/api/index/refresh", post(refresh_handler))
        .route("/api/index/status", get(status_handler))
        .route("/api/index/cancel", post(cancel_handler))
        .route("/api/index/clear-all", post(clear_all_handler))
        .route("/api/index/stats", get(stats_handler))
        // Index reads
        .route("/api/files", get(files_handler))
        .route("/api/search", get(search_handler))
        // Add middleware
        .layer(axum_middleware::from_fn(middleware::log_request))
        .layer(CorsLayer::permissive())
        // Add shared state
        .with_state(services)
}
