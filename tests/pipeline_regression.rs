//! End-to-end grid analysis regression tests.
//!
//! Drives the full sample -> fan-out -> fetch -> score -> aggregate path with
//! scripted tile sources and classifiers; no network access.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};

use wildfire_grid::config::{self, RiskConfig};
use wildfire_grid::inference::{load_classifier, ClassifierError, ImageTensor, TileScorer};
use wildfire_grid::pipeline::{GridScheduler, GridWorker};
use wildfire_grid::{
    AnalysisError, Classifier, Coordinate, GridLabel, RiskAnalyzer,
    RiskClassification, TileFailure, TileSource,
};

const CENTER: Coordinate = Coordinate::new(34.05, -118.25);

// ============================================================================
// Fixtures
// ============================================================================

fn solid_png(rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(32, 32, Rgb(rgb));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

type FailRule = Box<dyn Fn(Coordinate) -> Option<TileFailure> + Send + Sync>;

/// Serves a solid PNG after `delay`, or the failure chosen by `fail`.
struct ScriptedSource {
    delay: Duration,
    fail: FailRule,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedSource {
    fn new(delay: Duration) -> Self {
        Self::failing(delay, |_| None)
    }

    fn failing<F>(delay: Duration, fail: F) -> Self
    where
        F: Fn(Coordinate) -> Option<TileFailure> + Send + Sync + 'static,
    {
        Self {
            delay,
            fail: Box::new(fail),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TileSource for ScriptedSource {
    async fn fetch(&self, coordinate: Coordinate) -> Result<Vec<u8>, TileFailure> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match (self.fail)(coordinate) {
            Some(failure) => Err(failure),
            None => Ok(solid_png([180, 90, 40])),
        }
    }

    fn source_name(&self) -> &str {
        "scripted"
    }
}

struct Constant(f32);

impl Classifier for Constant {
    fn name(&self) -> &str {
        "constant"
    }

    fn classify(&self, _input: &ImageTensor) -> Result<[f32; 2], ClassifierError> {
        Ok([1.0 - self.0, self.0])
    }
}

fn analyzer(source: Arc<ScriptedSource>, high_risk: f32) -> RiskAnalyzer {
    let worker = GridWorker::new(source, TileScorer::new(Arc::new(Constant(high_risk))));
    RiskAnalyzer::new(GridScheduler::new(worker))
}

fn is_center(c: Coordinate) -> bool {
    c == CENTER
}

// ============================================================================
// Aggregation properties
// ============================================================================

#[tokio::test]
async fn test_uniform_grid_is_high_risk() {
    let source = Arc::new(ScriptedSource::new(Duration::ZERO));
    let report = analyzer(source, 0.9).analyze(CENTER).await.unwrap();

    assert_eq!(report.total_probability, 0.9);
    assert_eq!(report.classification, RiskClassification::High);
    assert_eq!(report.center, CENTER);

    let labels: Vec<GridLabel> = report.grid_results.iter().map(|r| r.label).collect();
    assert_eq!(labels, GridLabel::ROW_MAJOR.to_vec());
    assert!(report.grid_results.iter().all(|r| r.individual_probability == 0.9));
    assert!(report.grid_results.iter().all(|r| r.error.is_none()));

    let wire = serde_json::to_value(&report).unwrap();
    assert_eq!(wire["result"], "High Risk");
    assert_eq!(wire["grid_data"][4]["label"], "CENTER");
    assert_eq!(wire["grid_data"][0]["lat"], 34.0531);
    assert_eq!(wire["grid_data"][0]["lng"], -118.2531);
}

#[tokio::test]
async fn test_failed_tile_contributes_zero() {
    let source = Arc::new(ScriptedSource::failing(Duration::ZERO, |c| {
        is_center(c).then(|| TileFailure::Transport("operation timed out".into()))
    }));
    let report = analyzer(source, 0.8).analyze(CENTER).await.unwrap();

    assert_eq!(report.grid_results.len(), 9);
    let center = &report.grid_results[4];
    assert_eq!(center.label, GridLabel::Center);
    assert_eq!(center.individual_probability, 0.0);
    assert_eq!(center.weighted_contribution, 0.0);
    assert_eq!(center.error.as_deref(), Some("operation timed out"));

    let others: f64 = report
        .grid_results
        .iter()
        .filter(|r| r.error.is_none())
        .map(|r| r.weighted_contribution)
        .sum();
    assert!((report.total_probability - others).abs() < 1e-9);
    assert_eq!(report.total_probability, 0.48);
    assert_eq!(report.classification, RiskClassification::Low);
}

#[tokio::test]
async fn test_all_tiles_failed_is_low_risk() {
    let source = Arc::new(ScriptedSource::failing(Duration::ZERO, |_| {
        Some(TileFailure::ProviderStatus(401))
    }));
    let report = analyzer(source, 0.99).analyze(CENTER).await.unwrap();

    assert_eq!(report.grid_results.len(), 9);
    assert_eq!(report.total_probability, 0.0);
    assert_eq!(report.classification, RiskClassification::Low);
    assert_eq!(report.failed_tiles(), 9);
    for result in &report.grid_results {
        assert_eq!(result.error.as_deref(), Some("provider error (status 401)"));
    }
}

#[tokio::test]
async fn test_undecodable_tile_is_reported() {
    struct Garbage;

    #[async_trait]
    impl TileSource for Garbage {
        async fn fetch(&self, _coordinate: Coordinate) -> Result<Vec<u8>, TileFailure> {
            Ok(b"<html>rate limited</html>".to_vec())
        }

        fn source_name(&self) -> &str {
            "garbage"
        }
    }

    let worker = GridWorker::new(Arc::new(Garbage), TileScorer::new(Arc::new(Constant(0.5))));
    let report = RiskAnalyzer::new(GridScheduler::new(worker))
        .analyze(CENTER)
        .await
        .unwrap();

    assert_eq!(report.failed_tiles(), 9);
    assert!(report.grid_results[0]
        .error
        .as_deref()
        .unwrap()
        .starts_with("image decode failed"));
}

// ============================================================================
// Scheduling
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tiles_run_concurrently() {
    let delay = Duration::from_millis(200);
    let source = Arc::new(ScriptedSource::new(delay));
    let analyzer = analyzer(Arc::clone(&source), 0.3);

    let started = Instant::now();
    let report = analyzer.analyze(CENTER).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.grid_results.len(), 9);
    assert!(
        elapsed < delay * 4,
        "grid took {elapsed:?}, expected close to a single tile delay"
    );
    assert_eq!(source.peak.load(Ordering::SeqCst), 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_tile_budget_serialises_fetches() {
    let mut risk_config = RiskConfig::default();
    risk_config.analysis.max_in_flight_tiles = 1;

    let source = Arc::new(ScriptedSource::new(Duration::from_millis(20)));
    let analyzer = RiskAnalyzer::from_config(
        &risk_config,
        Arc::clone(&source) as Arc<dyn TileSource>,
        Arc::new(Constant(0.6)),
    );

    let report = analyzer.analyze(CENTER).await.unwrap();
    assert_eq!(report.grid_results.len(), 9);
    assert_eq!(report.total_probability, 0.6);
    assert_eq!(source.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_request_deadline() {
    let source = Arc::new(ScriptedSource::new(Duration::from_millis(500)));
    let analyzer =
        analyzer(source, 0.5).with_request_timeout(Some(Duration::from_millis(50)));

    let err = analyzer.analyze(CENTER).await.unwrap_err();
    assert!(matches!(err, AnalysisError::DeadlineExceeded(d) if d == Duration::from_millis(50)));
}

// ============================================================================
// Configuration and classifier loading
// ============================================================================

#[tokio::test]
async fn test_configured_service_with_demo_head() {
    let dir = tempfile::tempdir().unwrap();

    // Zero weights: p(high) = softmax([0, ln 3])[1] = 0.75 for any tile
    let head_path = dir.path().join("head.json");
    std::fs::write(
        &head_path,
        r#"{ "weights": [[0, 0, 0], [0, 0, 0]], "bias": [0.0, 1.0986123] }"#,
    )
    .unwrap();

    let config_path = dir.path().join("wildfire.toml");
    std::fs::write(
        &config_path,
        format!(
            "[classifier]\nbackend = \"linear_head\"\nmodel_path = \"{}\"\ndevice = \"cpu\"\n\n[analysis]\nmax_in_flight_tiles = 4\nrequest_timeout_secs = 5\n",
            head_path.display()
        ),
    )
    .unwrap();

    let risk_config = RiskConfig::load_from_file(&config_path).unwrap();
    assert_eq!(risk_config.analysis.max_in_flight_tiles, 4);
    assert_eq!(risk_config.provider.zoom, 15);

    config::init(risk_config);
    assert!(config::is_initialized());
    let cfg = config::get();

    let classifier = load_classifier(&cfg.classifier).unwrap();
    let analyzer = RiskAnalyzer::from_config(
        cfg,
        Arc::new(ScriptedSource::new(Duration::ZERO)),
        classifier,
    );
    assert_eq!(analyzer.request_timeout(), Some(Duration::from_secs(5)));
    assert_eq!(analyzer.classifier_name(), "linear-head (demo)");

    let report = analyzer.analyze(CENTER).await.unwrap();
    assert_eq!(report.total_probability, 0.75);
    assert_eq!(report.classification, RiskClassification::High);
}

#[test]
fn test_default_classifier_needs_model_weights() {
    let mut risk_config = RiskConfig::default();
    risk_config.classifier.model_path = "/nonexistent/best_wildfire_model_MobileNetV2.pth".into();
    assert!(load_classifier(&risk_config.classifier).is_err());
}
