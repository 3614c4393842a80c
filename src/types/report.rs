//! Per-tile results and the final analysis report
//!
//! Field names on the wire follow the dashboard contract:
//! `{result, total_probability, grid_data, center_coords}` with grid entries
//! `{label, lat, lng, individual_prob, weighted_contribution, weight_used, error?}`.

use serde::{Deserialize, Serialize};

use super::{round4, Coordinate, GridLabel, GridTask, TileOutcome};
use crate::config::defaults::{CRITICAL_RISK_THRESHOLD, HIGH_RISK_THRESHOLD};

/// Scored (or failed) grid cell.
///
/// When `error` is set both probability fields are zero; otherwise
/// `weighted_contribution == round4(individual_probability * weight_used)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridResult {
    pub label: GridLabel,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    #[serde(rename = "individual_prob")]
    pub individual_probability: f64,
    pub weighted_contribution: f64,
    pub weight_used: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GridResult {
    /// Annotate a tile outcome with its task's position and weight.
    pub fn from_outcome(task: &GridTask, outcome: TileOutcome) -> Self {
        let (individual_probability, weighted_contribution, error) = match outcome {
            TileOutcome::Scored { probability } => {
                let probability = round4(probability);
                (probability, round4(probability * task.weight), None)
            }
            TileOutcome::Failed { reason } => (0.0, 0.0, Some(reason.to_string())),
        };

        Self {
            label: task.label,
            latitude: task.coordinate.latitude,
            longitude: task.coordinate.longitude,
            individual_probability,
            weighted_contribution,
            weight_used: task.weight,
            error,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Overall wildfire risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskClassification {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Critical Risk")]
    Critical,
}

impl RiskClassification {
    /// Tier for a weighted total. Thresholds are exclusive: exactly 0.50 is
    /// Low and exactly 0.90 is High.
    pub fn from_total(total: f64) -> Self {
        if total > CRITICAL_RISK_THRESHOLD {
            RiskClassification::Critical
        } else if total > HIGH_RISK_THRESHOLD {
            RiskClassification::High
        } else {
            RiskClassification::Low
        }
    }
}

impl std::fmt::Display for RiskClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskClassification::Low => write!(f, "Low Risk"),
            RiskClassification::High => write!(f, "High Risk"),
            RiskClassification::Critical => write!(f, "Critical Risk"),
        }
    }
}

/// Verdict for one center coordinate. Built once by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(rename = "result")]
    pub classification: RiskClassification,
    pub total_probability: f64,
    /// Row-major, NW first
    #[serde(rename = "grid_data")]
    pub grid_results: Vec<GridResult>,
    #[serde(rename = "center_coords")]
    pub center: Coordinate,
}

impl AnalysisReport {
    pub fn failed_tiles(&self) -> usize {
        self.grid_results.iter().filter(|r| r.is_failed()).count()
    }
}
