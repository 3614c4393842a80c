//! Weighted reduction of grid results into the final verdict

use crate::types::{round4, AnalysisReport, Coordinate, GridResult, RiskClassification};

/// Combine per-tile results into one report.
///
/// The classification is decided on the raw sum of the (already rounded)
/// per-tile contributions; only the reported total is rounded again. Failed
/// tiles carry a zero contribution and so only lower the total.
pub fn aggregate(center: Coordinate, grid_results: Vec<GridResult>) -> AnalysisReport {
    let raw_total = grid_results
        .iter()
        .fold(0.0_f64, |acc, r| acc + r.weighted_contribution);

    AnalysisReport {
        classification: RiskClassification::from_total(raw_total),
        total_probability: round4(raw_total),
        grid_results,
        center,
    }
}
