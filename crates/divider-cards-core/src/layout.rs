//! Grid geometry for a given number of divider cards.

use crate::config::GridConfig;

/// Physical grid geometry, recomputed for every export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub columns: usize,
    pub rows: usize,
    pub card_width_mm: f64,
    pub card_height_mm: f64,
    pub gap_mm: f64,
    pub target_width_mm: f64,
    pub target_height_mm: f64,
}

impl GridLayout {
    /// Lay out `card_count` cards, filling rows left to right.
    ///
    /// A count of zero yields a zero-column, zero-size layout; callers must
    /// not export it.
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(card_count: usize, grid: &GridConfig) -> Self {
        let max_columns = grid.max_columns.max(1);
        let columns = card_count.min(max_columns);
        let rows = card_count.div_ceil(max_columns);

        Self {
            columns,
            rows,
            card_width_mm: grid.card_width_mm,
            card_height_mm: grid.card_height_mm,
            gap_mm: grid.gap_mm,
            target_width_mm: span(columns, grid.card_width_mm, grid.gap_mm),
            target_height_mm: span(rows, grid.card_height_mm, grid.gap_mm),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.columns == 0
    }

    /// Top-left corner of the card at `index`, relative to the grid origin.
    #[allow(clippy::cast_precision_loss)]
    pub fn card_origin_mm(&self, index: usize) -> (f64, f64) {
        let columns = self.columns.max(1);
        let col = (index % columns) as f64;
        let row = (index / columns) as f64;
        (
            col * (self.card_width_mm + self.gap_mm),
            row * (self.card_height_mm + self.gap_mm),
        )
    }
}

/// `n` tracks of `size` separated by `n - 1` gaps.
#[allow(clippy::cast_precision_loss)]
fn span(n: usize, size: f64, gap: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    n as f64 * size + (n - 1) as f64 * gap
}
