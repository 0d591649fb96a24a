//! Tile bounds and the XY raster grid shared by both streaming passes.

use serde::{Deserialize, Serialize};

/// World-XY extent of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Raster grid descriptor derived once from a tile's bounds and a fixed cell
/// resolution, then shared read-only by the ground and HAG passes.
///
/// Origin is the bounds min corner; cell `(0, 0)` covers
/// `[origin, origin + cell_size)` and the row index grows with +y. The
/// grid-to-world transform is linear:
/// `world = origin + (col, row) * cell_size`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Cell edge length in meters.
    pub cell_size: f64,
    /// World X of cell (0, 0).
    pub origin_x: f64,
    /// World Y of cell (0, 0).
    pub origin_y: f64,
    pub rows: usize,
    pub cols: usize,
}

impl Grid {
    /// Derive the grid covering `bounds` at `cell_size` resolution.
    ///
    /// Degenerate extents still produce at least one row and column so that
    /// single-point tiles bin somewhere.
    pub fn from_bounds(bounds: &Bounds, cell_size: f64) -> Self {
        let cols = ((bounds.width() / cell_size).ceil() as usize).max(1);
        let rows = ((bounds.height() / cell_size).ceil() as usize).max(1);
        Self {
            cell_size,
            origin_x: bounds.min_x,
            origin_y: bounds.min_y,
            rows,
            cols,
        }
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Bin a world point into a cell index, or `None` when it falls outside
    /// the grid. Out-of-bounds points are dropped by the callers, not an
    /// error.
    ///
    /// A point exactly on the grid's max edge belongs to the last row or
    /// column, matching [`Bounds::contains`]; tile bounds from file headers
    /// are attained by at least one real point.
    #[inline]
    pub fn bin(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let fx = (x - self.origin_x) / self.cell_size;
        let fy = (y - self.origin_y) / self.cell_size;
        if fx < 0.0 || fy < 0.0 {
            return None;
        }
        let col = if fx == self.cols as f64 {
            self.cols - 1
        } else {
            fx.floor() as usize
        };
        let row = if fy == self.rows as f64 {
            self.rows - 1
        } else {
            fy.floor() as usize
        };
        if row < self.rows && col < self.cols {
            Some((row, col))
        } else {
            None
        }
    }

    /// Map a fractional raster position to world coordinates.
    #[inline]
    pub fn rc_to_world(&self, row: f64, col: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.cell_size,
            self.origin_y + row * self.cell_size,
        )
    }

    /// Area of one cell in m².
    pub fn cell_area(&self) -> f64 {
        self.cell_size * self.cell_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_shape_covers_bounds() {
        let b = Bounds::new(10.0, 20.0, 15.0, 22.5);
        let g = Grid::from_bounds(&b, 0.5);
        assert_eq!(g.shape(), [5, 10]);
        assert_eq!(g.len(), 50);
    }

    #[test]
    fn binning_drops_points_outside_grid() {
        let g = Grid::from_bounds(&Bounds::new(0.0, 0.0, 10.0, 10.0), 1.0);
        assert_eq!(g.bin(0.0, 0.0), Some((0, 0)));
        assert_eq!(g.bin(9.9, 9.9), Some((9, 9)));
        assert_eq!(g.bin(-0.1, 5.0), None);
        assert_eq!(g.bin(5.0, 10.1), None);
    }

    #[test]
    fn max_edge_points_bin_into_the_last_cell() {
        let b = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let g = Grid::from_bounds(&b, 1.0);
        assert!(b.contains(10.0, 10.0));
        assert_eq!(g.bin(10.0, 10.0), Some((9, 9)));
        assert_eq!(g.bin(10.0, 0.0), Some((0, 9)));
        assert_eq!(g.bin(0.0, 10.0), Some((9, 0)));
    }

    #[test]
    fn rc_to_world_is_linear_from_origin() {
        let g = Grid::from_bounds(&Bounds::new(100.0, 200.0, 110.0, 210.0), 0.5);
        let (x, y) = g.rc_to_world(4.0, 6.0);
        assert!((x - 103.0).abs() < 1e-12);
        assert!((y - 202.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_bounds_still_have_one_cell() {
        let g = Grid::from_bounds(&Bounds::new(5.0, 5.0, 5.0, 5.0), 0.25);
        assert_eq!(g.shape(), [1, 1]);
        assert_eq!(g.bin(5.0, 5.0), Some((0, 0)));
    }
}
