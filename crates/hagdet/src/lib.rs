//! hagdet — height-above-ground object detection over LiDAR point tiles.
//!
//! The pipeline stages are:
//!
//! 1. **Ground** – streaming per-cell ground statistic (pass one) plus
//!    nearest-neighbour gap filling.
//! 2. **HAG** – streaming per-cell top statistic (pass two), clamped to a
//!    non-negative height-above-ground raster.
//! 3. **Blobs** – HAG band threshold, disk morphology, connected-component
//!    labeling, optional seeded watershed splitting of merged blobs.
//! 4. **Shape** – area, circularity, solidity, border-trim and slope gates
//!    turning regions into detections.
//! 5. **Dedupe** – cross-tile union-find merge of detections with nearby
//!    world centroids, one representative per cluster.
//!
//! # Public API
//! - [`run`] and [`process_tile`] as primary entry points
//! - [`TileSource`] / [`PointStream`] as the input seam ([`MemoryTile`] for
//!   in-memory point sets)
//! - [`DetectConfig`] for tuning, [`RunSummary`] / [`TileReport`] /
//!   [`Detection`] as result structures
//!
//! Every stage is deterministic for a fixed input set: results do not
//! depend on chunk sizes, tile order or thread scheduling.

pub mod config;
pub mod detector;
mod error;
pub mod grid;
mod ground;
mod hag;
mod pipeline;
mod points;
mod raster;
mod stats;
#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{
    BlobParams, Connectivity, DedupeParams, DetectConfig, GroundMethod, ShapeParams, TopMethod,
    WatershedParams,
};
pub use error::PipelineError;
pub use grid::{Bounds, Grid};
pub use ground::GroundEstimator;
pub use hag::{HagBuilder, HagRaster};
pub use pipeline::{
    build_rasters, process_tile, run, ClusterRecord, Detection, Representative, RunSummary,
    TileError, TileRasters, TileReport,
};
pub use points::{MemoryTile, Point, PointStream, TileSource};
pub use raster::{Mask, Raster};
