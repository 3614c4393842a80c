//! API request handlers

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::config::defaults::MAX_REQUEST_BODY_BYTES;
use crate::pipeline::RiskAnalyzer;
use crate::types::{AnalysisReport, Coordinate};

/// Shared state for all handlers
#[derive(Clone)]
pub struct ApiState {
    pub analyzer: RiskAnalyzer,
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(analyzer: RiskAnalyzer) -> Self {
        Self {
            analyzer,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

// ============================================================================
// Prediction
// ============================================================================

/// Body of `POST /predict`
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub lat: f64,
    pub lng: f64,
}

/// POST /predict
///
/// Runs the full 3x3 grid analysis around the posted center. Body rejections
/// are folded into [`ApiError`] so every request-level failure has the same
/// `{error}` shape.
pub async fn predict(
    State(state): State<ApiState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let Json(request) = payload.map_err(reject_body)?;
    let center = Coordinate::validated(request.lat, request.lng)?;
    let report = state.analyzer.analyze(center).await?;
    Ok(Json(report))
}

fn reject_body(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::BodyTooLarge(MAX_REQUEST_BODY_BYTES)
    } else {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub classifier: String,
    pub tile_source: String,
    pub timestamp: String,
}

/// GET /health
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_secs(),
        classifier: state.analyzer.classifier_name().to_string(),
        tile_source: state.analyzer.tile_source_name().to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
