//! HTTP request handlers for the siteindex API
//!
//! Implements handlers for health, discovery, job control, stats,
//! file listing and search.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::core::error::SiteIndexError;
use crate::core::services::Services;
use crate::core::types::*;

/// Query string for the status endpoint
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub job_id: Option<String>,
}

/// Query string for the file listing endpoint
#[derive(Debug, Default, Deserialize)]
pub struct FilesQuery {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
    pub site_id: Option<String>,
}

/// Query string for the search endpoint
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Health check handler
///
/// Returns server status and version information.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Discover sites handler
///
/// Lists the tenant's sites, served from the discovery cache when fresh.
///
/// # Errors
///
/// - `DiscoveryFailed`: The provider could not list sites
pub async fn discover_sites_handler(
    State(services): State<Arc<Services>>,
) -> Result<Json<SitesResponse>, SiteIndexError> {
    let sites = services.jobs.discover_sites().await?;
    let total = sites.len();
    Ok(Json(SitesResponse { sites, total }))
}

/// Refresh handler
///
/// Starts an indexing job for the selected sites.
///
/// # Errors
///
/// - `InvalidSelection`: Selection is empty, duplicated, or selects nothing
/// - `AlreadyRunning`: Another job has not finished yet
pub async fn refresh_handler(
    State(services): State<Arc<Services>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, SiteIndexError> {
    let snapshot = services.jobs.start_job(req.sites)?;

    Ok(Json(RefreshResponse {
        job_id: snapshot.job_id,
        status: snapshot.status,
    }))
}

/// Job status handler
///
/// Returns the latest job snapshot, or the named job if `job_id` is given.
///
/// # Errors
///
/// - `JobNotFound`: No job has run, or `job_id` is not the latest job
pub async fn status_handler(
    State(services): State<Arc<Services>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<JobSnapshot>, SiteIndexError> {
    let snapshot = services.jobs.get_status(query.job_id.as_deref())?;
    Ok(Json(snapshot))
}

/// Cancel handler
///
/// Requests cooperative cancellation. Succeeds when nothing is running.
pub async fn cancel_handler(State(services): State<Arc<Services>>) -> Json<AckResponse> {
    let message = if services.jobs.cancel() {
        "Cancellation requested"
    } else {
        "No indexing job is running"
    };

    Json(AckResponse {
        status: "ok".to_string(),
        message: message.to_string(),
    })
}

/// Clear-all handler
///
/// Stops any running job and drops the job record, index and cache.
pub async fn clear_all_handler(State(services): State<Arc<Services>>) -> Json<AckResponse> {
    services.jobs.clear_all().await;

    Json(AckResponse {
        status: "ok".to_string(),
        message: "Index cleared".to_string(),
    })
}

/// Stats handler
pub async fn stats_handler(State(services): State<Arc<Services>>) -> Json<IndexStats> {
    Json(services.store.stats())
}

/// File listing handler
///
/// Pages through indexed records, optionally for one site.
pub async fn files_handler(
    State(services): State<Arc<Services>>,
    Query(query): Query<FilesQuery>,
) -> Json<RecordPage> {
    Json(
        services
            .search
            .list_files(query.offset, query.limit, query.site_id.as_deref()),
    )
}

/// Search handler
///
/// # Errors
///
/// - `InvalidQuery`: Query is empty or too long
pub async fn search_handler(
    State(services): State<Arc<Services>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<RecordPage>, SiteIndexError> {
    let page = services.search.search(&query.q, query.offset, query.limit)?;
    Ok(Json(page))
}
