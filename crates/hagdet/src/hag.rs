//! HAG raster construction (pass two).
//!
//! A second pass over the same point stream computes the per-cell top
//! statistic against the completed ground surface. The HAG value is
//! `top − ground`, floored at zero so that noise points below the estimated
//! ground do not produce negative heights.
//!
//! `max` mode is exact and order-independent; it is the documented
//! deterministic fallback. Percentile mode uses the same exact buffered
//! quantile as the ground pass, so its result is also independent of chunk
//! boundaries, at an O(points) memory cost.

use tracing::debug;

use crate::config::TopMethod;
use crate::grid::Grid;
use crate::points::Point;
use crate::raster::Raster;
use crate::stats::CellAggregate;

/// HAG raster plus per-cell point counts (QA only, never used for filtering).
#[derive(Debug, Clone)]
pub struct HagRaster {
    pub grid: Grid,
    /// `top − ground` per cell, floored at 0. Cells with no observed points
    /// read 0 with a zero count.
    pub hag: Raster,
    /// Observed point count per cell, row-major.
    pub counts: Vec<u32>,
}

impl HagRaster {
    pub fn count(&self, row: usize, col: usize) -> u32 {
        self.counts[row * self.grid.cols + col]
    }
}

/// Accumulates the per-cell top statistic over the second streaming pass.
pub struct HagBuilder {
    grid: Grid,
    agg: CellAggregate,
    counts: Vec<u32>,
}

impl HagBuilder {
    pub fn new(grid: Grid, method: TopMethod) -> Self {
        let agg = match method {
            TopMethod::Max => CellAggregate::running_max(grid.len()),
            TopMethod::Percentile(p) => CellAggregate::quantile(grid.len(), p),
        };
        Self {
            grid,
            agg,
            counts: vec![0; grid.len()],
        }
    }

    /// Fold one chunk into the running top statistic.
    pub fn accumulate(&mut self, chunk: &[Point]) {
        for p in chunk {
            if let Some((row, col)) = self.grid.bin(p[0], p[1]) {
                let cell = row * self.grid.cols + col;
                self.agg.push(cell, p[2]);
                self.counts[cell] += 1;
            }
        }
    }

    /// Resolve `top − ground` against the completed ground raster.
    ///
    /// Interpolated ground cells are indistinguishable from observed ones
    /// here; downstream stages make no distinction either.
    pub fn finalize(self, ground: &Raster) -> HagRaster {
        let grid = self.grid;
        assert_eq!(ground.rows, grid.rows);
        assert_eq!(ground.cols, grid.cols);

        let mut hag = Raster::filled(grid.rows, grid.cols, 0.0);
        let mut observed = 0usize;
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let cell = row * grid.cols + col;
                if let Some(top) = self.agg.value(cell) {
                    hag.data[cell] = (top - ground.data[cell]).max(0.0);
                    observed += 1;
                }
            }
        }
        debug!(observed, cells = grid.len(), "hag pass complete");
        HagRaster {
            grid,
            hag,
            counts: self.counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Bounds;

    fn grid_4x4() -> Grid {
        Grid::from_bounds(&Bounds::new(0.0, 0.0, 4.0, 4.0), 1.0)
    }

    #[test]
    fn hag_is_top_minus_ground() {
        let grid = grid_4x4();
        let ground = Raster::filled(4, 4, 10.0);
        let mut builder = HagBuilder::new(grid, TopMethod::Max);
        builder.accumulate(&[[1.5, 2.5, 10.4], [1.5, 2.5, 10.6], [1.5, 2.5, 10.2]]);
        let hag = builder.finalize(&ground);
        assert!((hag.hag.get(2, 1) - 0.6).abs() < 1e-12);
        assert_eq!(hag.count(2, 1), 3);
    }

    #[test]
    fn points_below_ground_floor_at_zero() {
        let grid = grid_4x4();
        let ground = Raster::filled(4, 4, 10.0);
        let mut builder = HagBuilder::new(grid, TopMethod::Max);
        builder.accumulate(&[[0.5, 0.5, 9.2]]);
        let hag = builder.finalize(&ground);
        assert_eq!(hag.hag.get(0, 0), 0.0);
        assert_eq!(hag.count(0, 0), 1);
    }

    #[test]
    fn unobserved_cells_read_zero_with_zero_count() {
        let grid = grid_4x4();
        let ground = Raster::filled(4, 4, 10.0);
        let builder = HagBuilder::new(grid, TopMethod::Max);
        let hag = builder.finalize(&ground);
        assert!(hag.hag.data.iter().all(|&v| v == 0.0));
        assert!(hag.counts.iter().all(|&c| c == 0));
    }

    #[test]
    fn max_mode_is_chunking_invariant() {
        let grid = grid_4x4();
        let ground = Raster::filled(4, 4, 0.0);
        let points: Vec<Point> = (0..64)
            .map(|i| [(i % 4) as f64 + 0.5, (i / 16) as f64 + 0.5, (i % 7) as f64])
            .collect();

        let mut one = HagBuilder::new(grid, TopMethod::Max);
        one.accumulate(&points);
        let mut many = HagBuilder::new(grid, TopMethod::Max);
        for chunk in points.chunks(5) {
            many.accumulate(chunk);
        }
        assert_eq!(one.finalize(&ground).hag, many.finalize(&ground).hag);
    }
}
