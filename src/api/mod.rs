//! REST API module using Axum
//!
//! Exposes the grid analysis over HTTP:
//! - `POST /predict` with `{lat, lng}` returns the full analysis report
//! - `GET /health` returns liveness, version and the wired collaborators

mod error;
pub mod handlers;
mod routes;

pub use error::ApiError;
pub use handlers::{ApiState, PredictRequest};

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::defaults::MAX_REQUEST_BODY_BYTES;

/// Build the CORS layer.
///
/// Any origin may call the API unless `WILDFIRE_CORS_ORIGINS` lists the
/// allowed origins (comma-separated).
fn build_cors_layer() -> CorsLayer {
    match std::env::var("WILDFIRE_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
        }
        Err(_) => CorsLayer::permissive(),
    }
}

/// Create the application router with tracing, CORS and body limits applied.
///
/// The body limit is enforced by the JSON extractor, so oversized bodies get
/// the same 500 `{error}` response as any other rejected request.
pub fn create_app(state: ApiState) -> Router {
    let cors = build_cors_layer();

    routes::api_routes(state)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
