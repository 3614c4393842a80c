//! Satellite tile acquisition module
//!
//! Handles image retrieval from the external tile provider.

pub mod tile_source;
pub mod mapbox;

pub use tile_source::TileSource;
pub use mapbox::MapboxTileSource;
