//! Request-level failures and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::pipeline::AnalysisError;
use crate::types::CoordinateError;

/// Anything that stops a request from producing a report.
///
/// Every variant is rendered as HTTP 500 with body `{"error": "<message>"}`;
/// per-tile failures never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Body missing, not JSON, or not `{lat, lng}`
    #[error("{0}")]
    InvalidRequest(String),
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),
    #[error(transparent)]
    Coordinate(#[from] CoordinateError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        tracing::error!(error = %message, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": message })),
        )
            .into_response()
    }
}
