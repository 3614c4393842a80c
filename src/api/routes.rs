//! API route definitions
//!
//! - POST /predict - 3x3 grid wildfire risk analysis
//! - GET  /health  - liveness and wiring summary

use axum::{routing::{get, post}, Router};

use super::handlers::{self, ApiState};

pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health))
        .with_state(state)
}
