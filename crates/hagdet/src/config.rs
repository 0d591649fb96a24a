//! Parameter families for the detection pipeline.
//!
//! Defaults target compact ground-level objects in the 0.4–0.7 m height
//! band at 0.25 m raster resolution. All structs are plain data with serde
//! derive so the run summary can record the exact parameters used.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Per-cell ground statistic accumulated during the first streaming pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method", content = "p")]
pub enum GroundMethod {
    /// True minimum. Exact, streaming, independent of chunk boundaries and
    /// point order. The deterministic default.
    Min,
    /// Exact low quantile (e.g. 0.05) of the per-cell elevation samples.
    ///
    /// Computed by buffering per-cell values and sorting at finalisation, so
    /// the result is order-independent, at the cost of O(points) memory in
    /// the worst case.
    Percentile(f64),
}

/// Per-cell top statistic accumulated during the second streaming pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method", content = "p")]
pub enum TopMethod {
    /// True maximum. Exact and order-independent; the deterministic default.
    Max,
    /// Exact high quantile (e.g. 0.95) of the per-cell elevation samples.
    /// Same estimator and memory trade-off as [`GroundMethod::Percentile`].
    Percentile(f64),
}

/// Cell connectivity for component labeling and watershed growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// 4-neighbourhood (edge-adjacent cells).
    Four,
    /// 8-neighbourhood (edge- and corner-adjacent cells).
    #[default]
    Eight,
}

impl Connectivity {
    /// Neighbour offsets in a fixed scan order (N, S, W, E, then diagonals).
    pub fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Self::Four => &[(-1, 0), (1, 0), (0, -1), (0, 1)],
            Self::Eight => &[
                (-1, 0),
                (1, 0),
                (0, -1),
                (0, 1),
                (-1, -1),
                (-1, 1),
                (1, -1),
                (1, 1),
            ],
        }
    }
}

/// Seeded watershed splitting of merged blobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatershedParams {
    /// Enable splitting. Regions with fewer than `min_split_area_cells`
    /// cells or fewer than two seeds are left unsplit.
    pub enable: bool,
    /// Minimum HAG margin (m) by which a seed must exceed every neighbour
    /// inside its window.
    pub h_maxima_m: f64,
    /// Minimum region area (cells) before a split is attempted.
    pub min_split_area_cells: usize,
    /// Chebyshev radius (cells) of the seed-extraction window.
    pub seed_window_cells: usize,
}

impl Default for WatershedParams {
    fn default() -> Self {
        Self {
            enable: true,
            h_maxima_m: 0.08,
            min_split_area_cells: 24,
            seed_window_cells: 1,
        }
    }
}

/// HAG thresholding and blob extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlobParams {
    /// Lower edge of the HAG band (m).
    pub hag_min_m: f64,
    /// Upper edge of the HAG band (m).
    pub hag_max_m: f64,
    /// Radius (cells) of the disk structuring element used for the
    /// opening/closing cleanup. Zero disables morphology.
    pub morph_radius_cells: usize,
    /// Connectivity for component labeling and watershed growth.
    pub connectivity: Connectivity,
    /// Watershed split controls.
    pub watershed: WatershedParams,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            hag_min_m: 0.3,
            hag_max_m: 0.8,
            morph_radius_cells: 1,
            connectivity: Connectivity::Eight,
            watershed: WatershedParams::default(),
        }
    }
}

/// Geometric gates applied to labeled regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeParams {
    /// Minimum region area (cells).
    pub min_area_cells: usize,
    /// Maximum region area (cells).
    pub max_area_cells: usize,
    /// Minimum circularity `4π·area / perimeter²`, with perimeter measured
    /// as the boundary-cell count. Discretisation keeps round blobs below
    /// 1.0 at realistic sizes, but very small blobs can exceed it.
    pub circularity_min: f64,
    /// Minimum solidity `area / convex_hull_area` (hull over pixel corners).
    pub solidity_min: f64,
    /// Reject regions whose bounding box comes within this many cells of
    /// the raster edge. Cross-tile completion is the deduplicator's job.
    pub border_trim_cells: usize,
    /// Optional maximum ground slope (degrees) under the region footprint.
    /// `None` disables the gate.
    pub slope_max_deg: Option<f64>,
}

impl Default for ShapeParams {
    fn default() -> Self {
        Self {
            min_area_cells: 3,
            max_area_cells: 60,
            circularity_min: 0.45,
            solidity_min: 0.80,
            border_trim_cells: 2,
            slope_max_deg: None,
        }
    }
}

/// Cross-tile deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DedupeParams {
    /// Clustering radius (m) over detection world centroids. Intentionally
    /// plain: detections within the radius merge transitively, nothing more.
    pub radius_m: f64,
}

impl Default for DedupeParams {
    fn default() -> Self {
        Self { radius_m: 1.0 }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectConfig {
    /// Raster cell size (m) shared by the ground and HAG grids.
    pub cell_size_m: f64,
    /// Ground statistic for pass one.
    pub ground_method: GroundMethod,
    /// Top statistic for pass two.
    pub top_method: TopMethod,
    /// Blob extraction controls.
    pub blob: BlobParams,
    /// Shape-filter gates.
    pub shape: ShapeParams,
    /// Cross-tile dedupe controls.
    pub dedupe: DedupeParams,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            cell_size_m: 0.25,
            ground_method: GroundMethod::Min,
            top_method: TopMethod::Max,
            blob: BlobParams::default(),
            shape: ShapeParams::default(),
            dedupe: DedupeParams::default(),
        }
    }
}

impl DetectConfig {
    /// Check parameter consistency. Called once per run before any tile is
    /// processed; failures are run-fatal.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let fail = |msg: String| Err(PipelineError::Configuration(msg));

        if !(self.cell_size_m > 0.0) {
            return fail(format!("cell_size_m must be positive, got {}", self.cell_size_m));
        }
        if self.blob.hag_min_m > self.blob.hag_max_m {
            return fail(format!(
                "hag_min_m ({}) must not exceed hag_max_m ({})",
                self.blob.hag_min_m, self.blob.hag_max_m
            ));
        }
        if let GroundMethod::Percentile(p) = self.ground_method {
            if !(0.0..=1.0).contains(&p) {
                return fail(format!("ground percentile must be in [0, 1], got {}", p));
            }
        }
        if let TopMethod::Percentile(p) = self.top_method {
            if !(0.0..=1.0).contains(&p) {
                return fail(format!("top percentile must be in [0, 1], got {}", p));
            }
        }
        if self.shape.min_area_cells > self.shape.max_area_cells {
            return fail(format!(
                "min_area_cells ({}) must not exceed max_area_cells ({})",
                self.shape.min_area_cells, self.shape.max_area_cells
            ));
        }
        if !(self.shape.circularity_min >= 0.0) || !(self.shape.solidity_min >= 0.0) {
            return fail("circularity_min and solidity_min must be non-negative".into());
        }
        if let Some(slope) = self.shape.slope_max_deg {
            if !(0.0..=90.0).contains(&slope) {
                return fail(format!("slope_max_deg must be in [0, 90], got {}", slope));
            }
        }
        if self.blob.watershed.enable && !(self.blob.watershed.h_maxima_m > 0.0) {
            return fail(format!(
                "h_maxima_m must be positive when watershed is enabled, got {}",
                self.blob.watershed.h_maxima_m
            ));
        }
        if !(self.dedupe.radius_m >= 0.0) {
            return fail(format!("dedupe radius_m must be non-negative, got {}", self.dedupe.radius_m));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(DetectConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_band_is_rejected() {
        let mut cfg = DetectConfig::default();
        cfg.blob.hag_min_m = 0.9;
        cfg.blob.hag_max_m = 0.4;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn non_positive_cell_size_is_rejected() {
        let cfg = DetectConfig {
            cell_size_m: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn percentile_out_of_range_is_rejected() {
        let cfg = DetectConfig {
            ground_method: GroundMethod::Percentile(1.5),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn connectivity_offsets_have_expected_arity() {
        assert_eq!(Connectivity::Four.offsets().len(), 4);
        assert_eq!(Connectivity::Eight.offsets().len(), 8);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = DetectConfig {
            ground_method: GroundMethod::Percentile(0.05),
            top_method: TopMethod::Percentile(0.95),
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: DetectConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
