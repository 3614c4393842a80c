//! Request-level entry point: sample -> schedule -> aggregate

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{info, info_span, Instrument};

use super::aggregator::aggregate;
use super::sampler::GridSampler;
use super::scheduler::GridScheduler;
use super::worker::GridWorker;
use crate::acquisition::TileSource;
use crate::config::RiskConfig;
use crate::inference::{Classifier, TileScorer};
use crate::types::{millis, AnalysisReport, Coordinate};

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("grid analysis exceeded the {0:?} request deadline")]
    DeadlineExceeded(Duration),
}

/// Owns the shared collaborators and runs one full grid per call.
///
/// Cheap to clone; every clone shares the tile source, classifier and the
/// process-wide tile permit pool.
#[derive(Clone)]
pub struct RiskAnalyzer {
    sampler: GridSampler,
    scheduler: GridScheduler,
    request_timeout: Option<Duration>,
}

impl RiskAnalyzer {
    pub fn new(scheduler: GridScheduler) -> Self {
        Self {
            sampler: GridSampler::new(),
            scheduler,
            request_timeout: None,
        }
    }

    /// Wire the analyzer from configuration and loaded collaborators.
    pub fn from_config(
        config: &RiskConfig,
        source: Arc<dyn TileSource>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let worker = GridWorker::new(source, TileScorer::new(classifier));
        let permits = Arc::new(Semaphore::new(config.analysis.max_in_flight_tiles.max(1)));
        let scheduler = GridScheduler::new(worker).with_shared_permits(permits);
        Self::new(scheduler).with_request_timeout(config.analysis.request_timeout())
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn tile_source_name(&self) -> &str {
        self.scheduler.worker().source_name()
    }

    pub fn classifier_name(&self) -> &str {
        self.scheduler.worker().classifier_name()
    }

    /// Score the grid around `center`.
    ///
    /// Tile failures never fail the call; only the request deadline does.
    pub async fn analyze(&self, center: Coordinate) -> Result<AnalysisReport, AnalysisError> {
        let analysis_id = uuid::Uuid::new_v4();
        let span = info_span!("analysis", %analysis_id, lat = center.latitude, lng = center.longitude);

        async move {
            let started = Instant::now();
            let tasks = self.sampler.sample(center);

            let grid = self.scheduler.run_grid(&tasks);
            let results = match self.request_timeout {
                Some(limit) => tokio::time::timeout(limit, grid)
                    .await
                    .map_err(|_| AnalysisError::DeadlineExceeded(limit))?,
                None => grid.await,
            };

            let report = aggregate(center, results);
            info!(
                failed_tiles = report.failed_tiles(),
                elapsed_ms = millis(started.elapsed()),
                "Analysis complete: {} ({:.4})",
                report.classification,
                report.total_probability
            );
            Ok::<_, AnalysisError>(report)
        }
        .instrument(span)
        .await
    }
}
