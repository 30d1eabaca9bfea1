//! Error rendering for the HTTP API

use axum::response::{IntoResponse, Response};
use axum::Json;
use openapi_server::models::ErrorResponse;
use tracing::error;

use crate::errors::SitecastError;

impl IntoResponse for SitecastError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            details: match &self {
                SitecastError::PublishError { platform, slug, .. }
                | SitecastError::RemoveError { platform, slug, .. } => Some(serde_json::json!({
                    "platform": platform.as_str(),
                    "slug": slug,
                })),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}
