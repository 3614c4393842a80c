//! Tile source abstraction for satellite imagery.
//!
//! Lets the grid worker fetch tiles without knowing which provider serves
//! them, so tests can substitute canned images or injected failures.

use async_trait::async_trait;

use crate::types::{Coordinate, TileFailure};

/// Trait abstracting where tile images come from.
///
/// Implementations make a single attempt per call. Every network problem
/// (non-success status, timeout, transport error) is reported as a
/// [`TileFailure`] so one bad tile never aborts the grid.
#[async_trait]
pub trait TileSource: Send + Sync + 'static {
    /// Fetch the raw encoded image centered on `coordinate`.
    async fn fetch(&self, coordinate: Coordinate) -> Result<Vec<u8>, TileFailure>;

    /// Human-readable name for logging (e.g. "mapbox").
    fn source_name(&self) -> &str;
}
