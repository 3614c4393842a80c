//! wildfire-grid - neighbourhood wildfire risk service
//!
//! # Usage
//!
//! ```bash
//! MAPBOX_TOKEN=... cargo run --release
//!
//! # Trained MobileNetV2 weights on CPU, custom listen address
//! ./wildfire-grid --model models/best_wildfire_model_MobileNetV2.pth --device cpu --addr 127.0.0.1:8080
//!
//! # Demo head for wiring checks (verdicts are not model-backed)
//! ./wildfire-grid --backend linear_head --model demos/linear_head.json
//!
//! # Show the effective configuration and exit
//! ./wildfire-grid --print-config
//! ```
//!
//! # Environment Variables
//!
//! - `MAPBOX_TOKEN`: tile provider access token (a `.env` file is honoured)
//! - `PORT` / `WILDFIRE_SERVER_ADDR`: listen port or full address
//! - `WILDFIRE_CONFIG`: path to a TOML config file
//! - `WILDFIRE_MODEL`: classifier weights path
//! - `WILDFIRE_CORS_ORIGINS`: comma-separated allowed origins (default: any)
//! - `RUST_LOG`: logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use wildfire_grid::api::{create_app, ApiState};
use wildfire_grid::config::{self, ClassifierBackend, DevicePreference, RiskConfig};
use wildfire_grid::inference::load_classifier;
use wildfire_grid::{MapboxTileSource, RiskAnalyzer};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "wildfire-grid")]
#[command(about = "Wildfire risk analysis over a 3x3 satellite tile grid")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:5001")
    #[arg(short, long, value_name = "HOST:PORT")]
    addr: Option<String>,

    /// Load configuration from this TOML file instead of the search order
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Classifier weights (MobileNetV2 `.pth`/`.safetensors`, or demo head JSON)
    #[arg(short, long, env = "WILDFIRE_MODEL")]
    model: Option<PathBuf>,

    /// Classifier backend
    #[arg(long, value_enum)]
    backend: Option<ClassifierBackend>,

    /// Inference device
    #[arg(long, value_enum)]
    device: Option<DevicePreference>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn load_config(args: &CliArgs) -> Result<RiskConfig> {
    let mut risk_config = match &args.config {
        Some(path) => {
            let mut loaded = RiskConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            loaded.apply_env_overrides(|key| std::env::var(key).ok());
            loaded
        }
        None => RiskConfig::load(),
    };

    if let Some(addr) = &args.addr {
        risk_config.server.addr = addr.clone();
    }
    if let Some(model) = &args.model {
        risk_config.classifier.model_path = model.clone();
    }
    if let Some(backend) = args.backend {
        risk_config.classifier.backend = backend;
    }
    if let Some(device) = args.device {
        risk_config.classifier.device = device;
    }
    risk_config.validate()?;
    Ok(risk_config)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is the normal case in deployment
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment from .env");
    }

    let args = CliArgs::parse();
    let risk_config = load_config(&args)?;

    if args.print_config {
        println!("{}", risk_config.to_toml()?);
        return Ok(());
    }

    config::init(risk_config);
    let cfg = config::get();

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  wildfire-grid {}", env!("CARGO_PKG_VERSION"));
    info!("  3x3 satellite grid wildfire risk analysis");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let classifier = load_classifier(&cfg.classifier).with_context(|| {
        format!(
            "Failed to load {} classifier from {} (set --model or WILDFIRE_MODEL)",
            cfg.classifier.backend,
            cfg.classifier.model_path.display()
        )
    })?;

    if cfg.provider.access_token.is_empty() {
        warn!("MAPBOX_TOKEN is not set; every tile fetch will be rejected by the provider");
    }
    let source = MapboxTileSource::new(&cfg.provider).context("Failed to build tile provider client")?;
    info!(
        style = %cfg.provider.style,
        zoom = cfg.provider.zoom,
        tile_px = cfg.provider.tile_size_px,
        "Tile provider ready"
    );

    let analyzer = RiskAnalyzer::from_config(cfg, Arc::new(source), classifier);
    info!(
        max_in_flight_tiles = cfg.analysis.max_in_flight_tiles,
        request_timeout = ?analyzer.request_timeout(),
        "Analyzer ready"
    );

    let app = create_app(ApiState::new(analyzer));

    let listener = tokio::net::TcpListener::bind(&cfg.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", cfg.server.addr))?;
    info!("✓ HTTP server listening on {}", cfg.server.addr);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
        })
        .await;

    match result {
        Ok(()) => {
            info!("Graceful shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("HTTP server error: {}", e);
            Err(anyhow::anyhow!("HTTP server error: {}", e))
        }
    }
}
