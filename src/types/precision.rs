//! Decimal rounding shared by every aggregation stage

use std::time::Duration;

use crate::config::defaults::ROUNDING_DECIMALS;

/// Round to a fixed number of decimal places, correctly rounded on the exact
/// binary value with ties to even.
///
/// Goes through the fixed-precision formatter, which rounds the exact stored
/// value; `(x * 1e4).round()` rounds the already-rounded product instead.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

/// Round to the pipeline's reporting precision (4 decimal places).
pub fn round4(value: f64) -> f64 {
    round_to(value, ROUNDING_DECIMALS)
}

/// Whole milliseconds for log fields, saturating at `u64::MAX`.
pub fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
