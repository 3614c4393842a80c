//! Per-tile outcome types

/// Why a single tile could not be scored.
///
/// The `Display` form is the reason string reported on the tile's grid entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TileFailure {
    /// Provider answered with a non-success status
    #[error("provider error (status {0})")]
    ProviderStatus(u16),
    /// Timeout, connection failure or body read failure
    #[error("{0}")]
    Transport(String),
    /// Bytes were not a decodable image
    #[error("image decode failed: {0}")]
    Decode(String),
    /// Inference raised an error or produced an unusable distribution
    #[error("classifier failed: {0}")]
    Classifier(String),
    /// Worker task panicked or was cancelled
    #[error("tile worker aborted: {0}")]
    Aborted(String),
}

/// Result of fetching and scoring one tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TileOutcome {
    /// High-risk probability in [0, 1], rounded to 4 decimals
    Scored { probability: f64 },
    Failed { reason: TileFailure },
}

impl From<Result<f64, TileFailure>> for TileOutcome {
    fn from(result: Result<f64, TileFailure>) -> Self {
        match result {
            Ok(probability) => TileOutcome::Scored { probability },
            Err(reason) => TileOutcome::Failed { reason },
        }
    }
}
