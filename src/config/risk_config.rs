//! Risk Service Configuration - provider, classifier and scheduling knobs as TOML values
//!
//! Each section implements `Default` with the values in [`super::defaults`],
//! so a deployment without a config file behaves exactly like the built-in
//! constants.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a risk service deployment.
///
/// Load with `RiskConfig::load()` which searches:
/// 1. `$WILDFIRE_CONFIG` env var
/// 2. `./wildfire.toml`
/// 3. Built-in defaults
///
/// and then applies environment overrides (`MAPBOX_TOKEN`, `PORT`,
/// `WILDFIRE_SERVER_ADDR`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Satellite tile provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Classification head
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Grid scheduling limits
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl RiskConfig {
    /// Load configuration using the standard search order, then apply
    /// environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_file_or_default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    fn load_file_or_default() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var("WILDFIRE_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from WILDFIRE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from WILDFIRE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "WILDFIRE_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./wildfire.toml
        let local = PathBuf::from("wildfire.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./wildfire.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./wildfire.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No wildfire.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// `WILDFIRE_SERVER_ADDR` wins over `PORT`; `MAPBOX_TOKEN` replaces the
    /// provider token only when non-empty.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("MAPBOX_TOKEN").filter(|t| !t.is_empty()) {
            self.provider.access_token = token;
        }

        if let Some(addr) = lookup("WILDFIRE_SERVER_ADDR").filter(|a| !a.is_empty()) {
            self.server.addr = addr;
        } else if let Some(port) = lookup("PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.server.addr = format!("0.0.0.0:{p}"),
                Err(_) => warn!(port = %port, "Ignoring unparseable PORT"),
            }
        }
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all settings for internal consistency.
    ///
    /// The provider token is not checked here: a missing token only makes
    /// every tile fail, which the pipeline already tolerates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }
        if self.provider.base_url.trim().is_empty() {
            errors.push("provider.base_url must not be empty".to_string());
        }
        if self.provider.style.trim().is_empty() {
            errors.push("provider.style must not be empty".to_string());
        }
        if self.provider.zoom == 0 || self.provider.zoom > 22 {
            errors.push(format!(
                "provider.zoom ({}) must be in 1..=22",
                self.provider.zoom
            ));
        }
        if self.provider.tile_size_px == 0 || self.provider.tile_size_px > 1280 {
            errors.push(format!(
                "provider.tile_size_px ({}) must be in 1..=1280",
                self.provider.tile_size_px
            ));
        }
        if self.provider.timeout_secs == 0 {
            errors.push("provider.timeout_secs must be > 0".to_string());
        }
        if self.classifier.model_path.as_os_str().is_empty() {
            errors.push("classifier.model_path must not be empty".to_string());
        }
        if self.analysis.max_in_flight_tiles == 0 {
            errors.push("analysis.max_in_flight_tiles must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `WILDFIRE_SERVER_ADDR`, `PORT` or the `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    format!("0.0.0.0:{}", defaults::DEFAULT_PORT)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Tile Provider
// ============================================================================

/// Mapbox static-image provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API origin, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Map style identifier (`owner/style`)
    #[serde(default = "default_style")]
    pub style: String,

    /// Access token; normally supplied through `MAPBOX_TOKEN`
    #[serde(default, skip_serializing)]
    pub access_token: String,

    #[serde(default = "default_zoom")]
    pub zoom: u8,

    /// Tile width and height in pixels
    #[serde(default = "default_tile_size")]
    pub tile_size_px: u32,

    /// Per-tile request timeout
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    defaults::PROVIDER_BASE_URL.to_string()
}
fn default_style() -> String {
    defaults::PROVIDER_STYLE.to_string()
}
fn default_zoom() -> u8 {
    defaults::TILE_ZOOM
}
fn default_tile_size() -> u32 {
    defaults::TILE_SIZE_PX
}
fn default_fetch_timeout() -> u64 {
    defaults::TILE_FETCH_TIMEOUT_SECS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            style: default_style(),
            access_token: String::new(),
            zoom: default_zoom(),
            tile_size_px: default_tile_size(),
            timeout_secs: default_fetch_timeout(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Which classifier implementation scores tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ClassifierBackend {
    /// Trained MobileNetV2 (`.pth` or `.safetensors` state dict)
    #[default]
    MobilenetV2,
    /// Linear demo head over mean channel values (JSON); not a trained model
    LinearHead,
}

impl std::fmt::Display for ClassifierBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MobilenetV2 => write!(f, "mobilenet_v2"),
            Self::LinearHead => write!(f, "linear_head"),
        }
    }
}

/// Where model inference runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// CUDA when compiled in and present, else CPU
    #[default]
    Auto,
    Cpu,
    Cuda,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub backend: ClassifierBackend,

    /// Model weights; a state dict for MobileNetV2, JSON for the demo head
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default)]
    pub device: DevicePreference,
}

fn default_model_path() -> PathBuf {
    PathBuf::from(defaults::CLASSIFIER_MODEL_PATH)
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::default(),
            model_path: default_model_path(),
            device: DevicePreference::default(),
        }
    }
}

// ============================================================================
// Analysis
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Process-wide cap on tiles being fetched or scored at once
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight_tiles: usize,

    /// Deadline for a whole grid; 0 disables it
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_max_in_flight() -> usize {
    defaults::MAX_IN_FLIGHT_TILES
}
fn default_request_timeout() -> u64 {
    defaults::REQUEST_TIMEOUT_SECS
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_in_flight_tiles: default_max_in_flight(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl AnalysisConfig {
    /// Request deadline, if one is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

// ============================================================================
// Tests
// ============================================================================
