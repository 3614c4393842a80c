//! Mapbox Static Images client
//!
//! One GET per tile against
//! `{base}/styles/v1/{style}/static/{lng},{lat},{zoom},0/{w}x{h}`.

use async_trait::async_trait;
use tracing::debug;

use super::TileSource;
use crate::config::ProviderConfig;
use crate::types::{Coordinate, TileFailure};

/// HTTP client for the Mapbox static-image endpoint.
#[derive(Clone)]
pub struct MapboxTileSource {
    http: reqwest::Client,
    base_url: String,
    style: String,
    access_token: String,
    zoom: u8,
    tile_size_px: u32,
}

impl MapboxTileSource {
    /// Build a client whose every request carries the configured timeout.
    pub fn new(config: &ProviderConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            style: config.style.trim_matches('/').to_string(),
            access_token: config.access_token.clone(),
            zoom: config.zoom,
            tile_size_px: config.tile_size_px,
        })
    }

    /// Tile URL without the query string (the token is never part of it).
    pub fn tile_url(&self, coordinate: Coordinate) -> String {
        format!(
            "{}/styles/v1/{}/static/{},{},{},0/{}x{}",
            self.base_url,
            self.style,
            coordinate.longitude,
            coordinate.latitude,
            self.zoom,
            self.tile_size_px,
            self.tile_size_px
        )
    }
}

#[async_trait]
impl TileSource for MapboxTileSource {
    async fn fetch(&self, coordinate: Coordinate) -> Result<Vec<u8>, TileFailure> {
        let url = self.tile_url(coordinate);
        debug!(url = %url, "Requesting tile");

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("logo", "false"),
                ("attribution", "false"),
            ])
            .send()
            .await
            .map_err(transport_failure)?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(TileFailure::ProviderStatus(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(transport_failure)?;
        Ok(body.to_vec())
    }

    fn source_name(&self) -> &str {
        "mapbox"
    }
}

/// Strip the URL (and with it the access token) from reqwest's error text.
fn transport_failure(err: reqwest::Error) -> TileFailure {
    TileFailure::Transport(err.without_url().to_string())
}
