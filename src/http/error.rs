//! HTTP mapping for domain errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::core::error::SiteIndexError;

impl SiteIndexError {
    /// Convert error to appropriate HTTP status code
    pub fn status_code(&self) -> StatusCode {
        if self.is_conflict() {
            StatusCode::CONFLICT
        } else if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else if self.is_bad_request() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Implement IntoResponse for automatic error conversion in Axum
impl IntoResponse for SiteIndexError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.message(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
