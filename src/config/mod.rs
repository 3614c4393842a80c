//! Service Configuration Module
//!
//! Provides the risk service configuration loaded from TOML files, with the
//! tile provider credential and port taken from the environment.
//!
//! ## Loading Order
//!
//! 1. `WILDFIRE_CONFIG` environment variable (path to TOML file)
//! 2. `wildfire.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(RiskConfig::load());
//!
//! // Anywhere in the codebase:
//! let zoom = config::get().provider.zoom;
//! ```

mod risk_config;
pub mod defaults;

pub use risk_config::*;

use std::sync::OnceLock;

/// Global service configuration, initialized once at startup.
static RISK_CONFIG: OnceLock<RiskConfig> = OnceLock::new();

/// Initialize the global service configuration.
///
/// Only the first call takes effect; later calls are logged and ignored.
pub fn init(config: RiskConfig) {
    if RISK_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global service configuration.
///
/// Falls back to the built-in defaults when `init()` has not been called,
/// which keeps library consumers and tests usable without a startup phase.
pub fn get() -> &'static RiskConfig {
    RISK_CONFIG.get_or_init(RiskConfig::default)
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    RISK_CONFIG.get().is_some()
}
