use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One detected object within a single tile.
///
/// `row`/`col` are fractional grid coordinates of the blob centroid; `x`/`y`
/// are the same centroid in world coordinates. Ids restart at 1 per tile, so
/// `(file, id)` is the globally unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Source tile path.
    pub file: String,
    /// 1-based id, sequential within the tile.
    pub id: u32,
    /// Centroid row in grid cells.
    pub row: f64,
    /// Centroid column in grid cells.
    pub col: f64,
    /// Centroid easting in world units.
    pub x: f64,
    /// Centroid northing in world units.
    pub y: f64,
    /// Footprint size in grid cells.
    pub area_cells: usize,
    /// Footprint size in square meters.
    pub area_m2: f64,
    /// `4·π·area / perimeter²` with perimeter counted in boundary cells.
    pub circularity: f64,
    /// Footprint area over convex hull area, clamped to 1.
    pub solidity: f64,
    /// Mean height above ground over the footprint, meters.
    pub hag_mean: f64,
    /// Peak height above ground over the footprint, meters.
    pub hag_max: f64,
}

/// Why a tile produced no detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileError {
    /// Stable machine-readable category (`input_format`, `insufficient_data`,
    /// `configuration`).
    pub kind: String,
    pub message: String,
}

impl TileError {
    pub fn from_pipeline_error(err: &PipelineError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Per-tile processing report. A failed tile still produces a report, with
/// `error` set and `detections` empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileReport {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    /// Points read during the ground pass (including out-of-bounds drops).
    pub point_count: u64,
    /// Raster shape as `[rows, cols]`, absent when the tile failed before
    /// gridding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_shape: Option<[usize; 2]>,
    pub processing_ms: u64,
    pub detections: Vec<Detection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TileError>,
}

/// A deduplicated detection chosen to stand for its cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representative {
    #[serde(flatten)]
    pub detection: Detection,
    /// 1-based cluster id within the run.
    pub dedupe_index: u32,
    /// Number of raw detections merged into this cluster.
    pub cluster_size: usize,
}

/// One dedupe cluster recorded by member keys, for audit of which raw
/// detections were merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// 1-based cluster id; matches the representative's `dedupe_index`.
    pub id: u32,
    /// Member detections as `(file, id)` keys.
    pub members: Vec<(String, u32)>,
}

/// Result of a whole detection run over a set of tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// The exact configuration the run used, after validation.
    pub params: crate::config::DetectConfig,
    /// Per-tile reports, sorted by path.
    pub files: Vec<TileReport>,
    /// Raw detections across all tiles, before deduplication.
    pub total_count: usize,
    /// Detections remaining after cross-tile deduplication.
    pub total_count_deduped: usize,
    /// One representative per dedupe cluster, in cluster id order.
    pub representatives: Vec<Representative>,
    /// The full cluster partition; every raw detection appears in exactly
    /// one cluster.
    pub clusters: Vec<ClusterRecord>,
}
