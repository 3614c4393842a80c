//! Grid sampling: one center coordinate -> nine weighted tasks

use crate::config::defaults::{COLUMN_MULTIPLIERS, COORD_OFFSET_DEG, ROW_MULTIPLIERS, WEIGHT_MATRIX};
use crate::types::{Coordinate, GridLabel, GridTask};

/// Expands a center point into the fixed 3x3 sample grid.
///
/// Cells are emitted row-major (north row first, west column first), each
/// offset by a whole multiple of the grid spacing and carrying its weight
/// from [`WEIGHT_MATRIX`].
#[derive(Debug, Clone, Copy)]
pub struct GridSampler {
    offset_deg: f64,
}

impl Default for GridSampler {
    fn default() -> Self {
        Self {
            offset_deg: COORD_OFFSET_DEG,
        }
    }
}

impl GridSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&self, center: Coordinate) -> [GridTask; 9] {
        std::array::from_fn(|idx| {
            let (row, col) = (idx / 3, idx % 3);
            GridTask {
                coordinate: Coordinate::new(
                    center.latitude + ROW_MULTIPLIERS[row] * self.offset_deg,
                    center.longitude + COLUMN_MULTIPLIERS[col] * self.offset_deg,
                ),
                weight: WEIGHT_MATRIX[row][col],
                label: GridLabel::ROW_MAJOR[idx],
            }
        })
    }
}
