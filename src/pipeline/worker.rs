//! Per-tile pipeline: fetch -> score -> annotate

use std::sync::Arc;
use tracing::{debug, warn};

use crate::acquisition::TileSource;
use crate::inference::TileScorer;
use crate::types::{GridResult, GridTask, TileOutcome};

/// Fetches and scores one grid cell, turning every failure into a
/// zero-contribution result instead of an error.
#[derive(Clone)]
pub struct GridWorker {
    source: Arc<dyn TileSource>,
    scorer: TileScorer,
}

impl GridWorker {
    pub fn new(source: Arc<dyn TileSource>, scorer: TileScorer) -> Self {
        Self { source, scorer }
    }

    pub fn source_name(&self) -> &str {
        self.source.source_name()
    }

    pub fn classifier_name(&self) -> &str {
        self.scorer.classifier_name()
    }

    pub async fn run(&self, task: GridTask) -> GridResult {
        debug!(
            label = %task.label,
            lat = task.coordinate.latitude,
            lng = task.coordinate.longitude,
            "Scanning tile"
        );

        let outcome: TileOutcome = match self.source.fetch(task.coordinate).await {
            Ok(bytes) => self.scorer.score(bytes).await.into(),
            Err(failure) => Err(failure).into(),
        };

        if let TileOutcome::Failed { reason } = &outcome {
            warn!(
                label = %task.label,
                source = self.source.source_name(),
                reason = %reason,
                "Tile failed, contributing zero risk"
            );
        }

        GridResult::from_outcome(&task, outcome)
    }
}
