//! Row-major f64 raster and a boolean cell mask.
//!
//! These are plain owned buffers indexed by `(row, col)`; each tile's
//! processing task owns its rasters exclusively, so tiles can run in
//! parallel without locks.

use std::ops::{Index, IndexMut};

/// A 2D raster of f64 values, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Raster {
    /// Create a raster filled with a constant value.
    pub fn filled(rows: usize, cols: usize, fill: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![fill; rows * cols],
        }
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
    }

    #[inline]
    pub fn idx(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Signed-index accessor returning `None` outside the raster.
    #[inline]
    pub fn get_signed(&self, row: isize, col: isize) -> Option<f64> {
        if row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols {
            Some(self.data[row as usize * self.cols + col as usize])
        } else {
            None
        }
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let i = self.idx(row, col);
        self.data[i] = value;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Index<(usize, usize)> for Raster {
    type Output = f64;
    fn index(&self, (r, c): (usize, usize)) -> &f64 {
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for Raster {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut f64 {
        &mut self.data[r * self.cols + c]
    }
}

/// A boolean raster mask, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<bool>,
}

impl Mask {
    pub fn filled(rows: usize, cols: usize, fill: bool) -> Self {
        Self {
            rows,
            cols,
            data: vec![fill; rows * cols],
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[row * self.cols + col]
    }

    /// Signed-index accessor; cells outside the mask read as `false`.
    #[inline]
    pub fn get_signed(&self, row: isize, col: isize) -> bool {
        row >= 0
            && col >= 0
            && (row as usize) < self.rows
            && (col as usize) < self.cols
            && self.data[row as usize * self.cols + col as usize]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        let i = row * self.cols + col;
        self.data[i] = value;
    }

    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    /// Keep only cells set in both masks. Panics on shape mismatch.
    pub fn intersect(&mut self, other: &Mask) {
        assert_eq!(self.rows, other.rows);
        assert_eq!(self.cols, other.cols);
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a = *a && *b;
        }
    }
}
