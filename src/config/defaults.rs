//! System-wide default constants.
//!
//! Centralises the fixed numbers of the grid analysis. Grouped by subsystem
//! for easy discovery.

// ============================================================================
// Grid Sampling
// ============================================================================

/// Offset between neighbouring grid points (degrees, applied to both axes).
pub const COORD_OFFSET_DEG: f64 = 0.0031;

/// Latitude multipliers per grid row, north to south.
pub const ROW_MULTIPLIERS: [f64; 3] = [1.0, 0.0, -1.0];

/// Longitude multipliers per grid column, west to east.
pub const COLUMN_MULTIPLIERS: [f64; 3] = [-1.0, 0.0, 1.0];

/// Positional weight of each grid cell, row-major. Sums to 1.0.
pub const WEIGHT_MATRIX: [[f64; 3]; 3] = [
    [0.05, 0.10, 0.05],
    [0.10, 0.40, 0.10],
    [0.05, 0.10, 0.05],
];

/// Number of tiles in one grid.
pub const GRID_SIZE: usize = 9;

// ============================================================================
// Tile Provider
// ============================================================================

/// Default Mapbox API origin.
pub const PROVIDER_BASE_URL: &str = "https://api.mapbox.com";

/// Default Mapbox style used for satellite tiles.
pub const PROVIDER_STYLE: &str = "mapbox/satellite-v9";

/// Zoom level of every fetched tile.
pub const TILE_ZOOM: u8 = 15;

/// Width and height of every fetched tile (pixels).
pub const TILE_SIZE_PX: u32 = 350;

/// Per-tile fetch timeout (seconds).
pub const TILE_FETCH_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Classifier Input
// ============================================================================

/// Square input resolution expected by the classifier (pixels).
pub const MODEL_INPUT_SIZE: u32 = 224;

/// Per-channel RGB mean used for input normalisation.
pub const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel RGB standard deviation used for input normalisation.
pub const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Index of the high-risk class in the classifier output.
pub const HIGH_RISK_CLASS: usize = 1;

/// Default path of the trained MobileNetV2 state dict (`.pth` or `.safetensors`).
pub const CLASSIFIER_MODEL_PATH: &str = "best_wildfire_model_MobileNetV2.pth";

/// Batch-norm epsilon of the MobileNetV2 backbone.
pub const BATCH_NORM_EPS: f64 = 1e-5;

// ============================================================================
// Aggregation
// ============================================================================

/// Totals strictly above this are `Critical Risk`.
pub const CRITICAL_RISK_THRESHOLD: f64 = 0.90;

/// Totals strictly above this (and not critical) are `High Risk`.
pub const HIGH_RISK_THRESHOLD: f64 = 0.50;

/// Decimal places kept at every rounding stage.
pub const ROUNDING_DECIMALS: usize = 4;

// ============================================================================
// Scheduling
// ============================================================================

/// In-flight tile bound for one grid. Equal to the grid size.
pub const GRID_CONCURRENCY: usize = GRID_SIZE;

/// Process-wide bound on in-flight tiles across all requests.
pub const MAX_IN_FLIGHT_TILES: usize = 64;

/// Deadline for one full grid analysis (seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// HTTP Server
// ============================================================================

/// Port used when neither `PORT` nor an explicit address is set.
pub const DEFAULT_PORT: u16 = 5001;

/// Maximum accepted request body (bytes).
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024;
