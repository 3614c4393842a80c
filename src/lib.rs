//! Wildfire Grid: neighbourhood wildfire risk from satellite imagery
//!
//! ## Architecture
//!
//! - **Acquisition**: fetches one satellite tile per grid cell from the tile provider
//! - **Inference**: preprocesses a tile and scores it with the risk classifier
//! - **Pipeline**: samples the 3x3 grid, fans the cells out, aggregates the weighted verdict
//! - **API**: `POST /predict` and `GET /health` over Axum

pub mod config;
pub mod types;
pub mod acquisition;
pub mod inference;
pub mod pipeline;
pub mod api;

// Re-export configuration
pub use config::RiskConfig;

// Re-export commonly used types
pub use types::{
    AnalysisReport, Coordinate, GridLabel, GridResult, GridTask, RiskClassification,
    TileFailure, TileOutcome,
};

pub use acquisition::{MapboxTileSource, TileSource};
pub use inference::{Classifier, LinearHead};
pub use pipeline::{AnalysisError, RiskAnalyzer};
