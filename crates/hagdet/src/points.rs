//! Point-stream seam between the pipeline and tile decoding.
//!
//! The pipeline never touches file formats. It consumes a [`TileSource`]
//! that can be opened into a [`PointStream`] yielding bounded-size chunks of
//! `(x, y, z)` points. Both streaming passes (ground estimation, HAG
//! building) open a fresh stream, so a source must support being opened
//! twice per tile; dropping the stream closes it.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::grid::Bounds;

/// One point as world `[x, y, z]`.
pub type Point = [f64; 3];

/// A finite sequence of point chunks from one tile.
pub trait PointStream {
    /// Next chunk of points, or `None` at end of stream. Chunk sizes are
    /// implementation-defined but bounded; callers must not assume any
    /// particular chunking.
    fn next_chunk(&mut self) -> Result<Option<Vec<Point>>, PipelineError>;
}

/// One source point-cloud tile.
pub trait TileSource: Sync {
    /// Path identifying the tile in reports and dedupe keys.
    fn path(&self) -> &Path;

    /// Declared spatial bounds; points outside are dropped during binning.
    fn bounds(&self) -> Bounds;

    /// Opaque coordinate-reference identifier, passed through to reports and
    /// never interpreted by the pipeline.
    fn crs(&self) -> Option<&str> {
        None
    }

    /// Open a fresh stream over the tile's points.
    fn open(&self) -> Result<Box<dyn PointStream + '_>, PipelineError>;
}

/// In-memory tile backed by a point slice, chunked on read.
///
/// Used by tests and by callers that already hold decoded points. Re-opening
/// is free, which makes the two-pass design cheap here.
#[derive(Debug, Clone)]
pub struct MemoryTile {
    path: PathBuf,
    bounds: Bounds,
    crs: Option<String>,
    points: Vec<Point>,
    chunk_size: usize,
}

impl MemoryTile {
    pub fn new(path: impl Into<PathBuf>, bounds: Bounds, points: Vec<Point>) -> Self {
        Self {
            path: path.into(),
            bounds,
            crs: None,
            points,
            chunk_size: 4096,
        }
    }

    /// Derive bounds from the point set itself (empty tiles get zero bounds).
    pub fn with_computed_bounds(path: impl Into<PathBuf>, points: Vec<Point>) -> Self {
        let mut bounds = Bounds::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for p in &points {
            bounds.min_x = bounds.min_x.min(p[0]);
            bounds.min_y = bounds.min_y.min(p[1]);
            bounds.max_x = bounds.max_x.max(p[0]);
            bounds.max_y = bounds.max_y.max(p[1]);
        }
        if points.is_empty() {
            bounds = Bounds::new(0.0, 0.0, 0.0, 0.0);
        }
        Self::new(path, bounds, points)
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

impl TileSource for MemoryTile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    fn open(&self) -> Result<Box<dyn PointStream + '_>, PipelineError> {
        Ok(Box::new(MemoryStream {
            points: &self.points,
            cursor: 0,
            chunk_size: self.chunk_size,
        }))
    }
}

struct MemoryStream<'a> {
    points: &'a [Point],
    cursor: usize,
    chunk_size: usize,
}

impl PointStream for MemoryStream<'_> {
    fn next_chunk(&mut self) -> Result<Option<Vec<Point>>, PipelineError> {
        if self.cursor >= self.points.len() {
            return Ok(None);
        }
        let end = (self.cursor + self.chunk_size).min(self.points.len());
        let chunk = self.points[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(Some(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_stream_chunks_all_points() {
        let pts: Vec<Point> = (0..10).map(|i| [i as f64, 0.0, 1.0]).collect();
        let tile = MemoryTile::with_computed_bounds("mem://t0", pts).with_chunk_size(3);
        let mut stream = tile.open().unwrap();
        let mut total = 0usize;
        let mut chunks = 0usize;
        while let Some(chunk) = stream.next_chunk().unwrap() {
            assert!(chunk.len() <= 3);
            total += chunk.len();
            chunks += 1;
        }
        assert_eq!(total, 10);
        assert_eq!(chunks, 4);
    }

    #[test]
    fn computed_bounds_cover_points() {
        let tile = MemoryTile::with_computed_bounds(
            "mem://t1",
            vec![[1.0, 2.0, 0.0], [4.0, -1.0, 0.0]],
        );
        let b = tile.bounds();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (1.0, -1.0, 4.0, 2.0));
    }

    #[test]
    fn reopening_restarts_the_stream() {
        let tile =
            MemoryTile::with_computed_bounds("mem://t2", vec![[0.0, 0.0, 1.0]; 5]).with_chunk_size(2);
        for _ in 0..2 {
            let mut stream = tile.open().unwrap();
            let mut total = 0;
            while let Some(chunk) = stream.next_chunk().unwrap() {
                total += chunk.len();
            }
            assert_eq!(total, 5);
        }
    }
}
