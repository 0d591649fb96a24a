//! Streaming ground-surface estimation (pass one).
//!
//! Points are binned into the tile grid and a per-cell ground statistic is
//! accumulated chunk by chunk. Finalisation fills every unobserved cell by
//! nearest-neighbour propagation so that no downstream stage ever reads an
//! unfilled cell.

use std::collections::VecDeque;
use std::path::Path;

use tracing::debug;

use crate::config::GroundMethod;
use crate::error::PipelineError;
use crate::grid::Grid;
use crate::points::Point;
use crate::raster::Raster;
use crate::stats::CellAggregate;

/// Accumulates the per-cell ground statistic over one pass of the point
/// stream, then produces a gap-free ground elevation raster.
pub struct GroundEstimator {
    grid: Grid,
    agg: CellAggregate,
    points_seen: u64,
    points_dropped: u64,
}

impl GroundEstimator {
    pub fn new(grid: Grid, method: GroundMethod) -> Self {
        let agg = match method {
            GroundMethod::Min => CellAggregate::running_min(grid.len()),
            GroundMethod::Percentile(p) => CellAggregate::quantile(grid.len(), p),
        };
        Self {
            grid,
            agg,
            points_seen: 0,
            points_dropped: 0,
        }
    }

    /// Fold one chunk into the running statistic. Points outside the grid
    /// are dropped, not an error.
    pub fn accumulate(&mut self, chunk: &[Point]) {
        for p in chunk {
            self.points_seen += 1;
            match self.grid.bin(p[0], p[1]) {
                Some((row, col)) => {
                    let cell = row * self.grid.cols + col;
                    self.agg.push(cell, p[2]);
                }
                None => self.points_dropped += 1,
            }
        }
    }

    pub fn points_seen(&self) -> u64 {
        self.points_seen
    }

    /// Resolve the ground raster and fill unobserved cells.
    ///
    /// Fails with [`PipelineError::InsufficientData`] when the tile has zero
    /// observed cells.
    pub fn finalize(self, tile_path: &Path) -> Result<Raster, PipelineError> {
        let grid = self.grid;
        let mut ground = Raster::filled(grid.rows, grid.cols, f64::NAN);
        let mut observed = 0usize;
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                if let Some(v) = self.agg.value(row * grid.cols + col) {
                    ground.set(row, col, v);
                    observed += 1;
                }
            }
        }

        if observed == 0 {
            return Err(PipelineError::InsufficientData {
                path: tile_path.to_path_buf(),
                message: format!(
                    "no ground observations ({} points seen, {} outside bounds)",
                    self.points_seen, self.points_dropped
                ),
            });
        }

        debug!(
            observed,
            cells = grid.len(),
            dropped = self.points_dropped,
            "ground pass complete"
        );
        fill_gaps(&mut ground);
        Ok(ground)
    }
}

/// Nearest-neighbour gap filling by multi-source BFS over the 4-neighbourhood.
///
/// The frontier is seeded with every observed cell in row-major order and
/// neighbours are expanded in a fixed N/S/W/E order, so equidistant sources
/// resolve by row-major scan order and the fill is deterministic.
fn fill_gaps(ground: &mut Raster) {
    let (rows, cols) = (ground.rows, ground.cols);
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    for row in 0..rows {
        for col in 0..cols {
            if !ground.get(row, col).is_nan() {
                queue.push_back((row, col));
            }
        }
    }

    const NSWE: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
    while let Some((row, col)) = queue.pop_front() {
        let value = ground.get(row, col);
        for (dr, dc) in NSWE {
            let (nr, nc) = (row as isize + dr, col as isize + dc);
            if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            if ground.get(nr, nc).is_nan() {
                ground.set(nr, nc, value);
                queue.push_back((nr, nc));
            }
        }
    }
}
