//! Shared data structures for the grid risk pipeline
//!
//! This module defines the values that flow between the pipeline stages:
//! - Sampling: Coordinate, GridLabel, GridTask
//! - Per-tile work: TileOutcome, TileFailure
//! - Reduction: GridResult, RiskClassification, AnalysisReport

mod grid;
mod tile;
mod report;
mod precision;

pub use grid::*;
pub use tile::*;
pub use report::*;
pub use precision::*;
