//! Shape gates turning labeled regions into detections.
//!
//! Gates run in a fixed order (area, circularity, solidity, border trim,
//! slope); a region must pass all of them. Survivors receive sequential
//! per-tile ids in label order, which is row-major and therefore stable
//! across runs and chunk sizes.

use nalgebra::{Matrix3, Vector3};
use tracing::debug;

use crate::config::ShapeParams;
use crate::grid::Grid;
use crate::raster::Raster;
use crate::Detection;

use super::label::Region;

/// Apply the shape gates and convert survivors to [`Detection`]s.
///
/// `ground` is the completed ground raster, used only by the optional slope
/// gate. `file` is the tile identifier carried into every detection.
pub fn filter_regions(
    regions: &[Region],
    grid: &Grid,
    ground: &Raster,
    file: &str,
    params: &ShapeParams,
) -> Vec<Detection> {
    let mut rejected = [0usize; 5];
    let mut detections = Vec::new();

    for region in regions {
        if region.area_cells < params.min_area_cells || region.area_cells > params.max_area_cells {
            rejected[0] += 1;
            continue;
        }
        if region.circularity() < params.circularity_min {
            rejected[1] += 1;
            continue;
        }
        if region.solidity() < params.solidity_min {
            rejected[2] += 1;
            continue;
        }
        if touches_border(region, grid, params.border_trim_cells) {
            rejected[3] += 1;
            continue;
        }
        if let Some(max_deg) = params.slope_max_deg {
            if footprint_slope_deg(region, grid, ground) > max_deg {
                rejected[4] += 1;
                continue;
            }
        }

        let (row, col) = region.centroid_rc;
        let (x, y) = grid.rc_to_world(row, col);
        detections.push(Detection {
            file: file.to_string(),
            id: detections.len() as u32 + 1,
            row,
            col,
            x,
            y,
            area_cells: region.area_cells,
            area_m2: region.area_cells as f64 * grid.cell_area(),
            circularity: region.circularity(),
            solidity: region.solidity(),
            hag_mean: region.hag_mean,
            hag_max: region.hag_max,
        });
    }

    debug!(
        kept = detections.len(),
        rejected_area = rejected[0],
        rejected_circularity = rejected[1],
        rejected_solidity = rejected[2],
        rejected_border = rejected[3],
        rejected_slope = rejected[4],
        "shape filter complete"
    );
    detections
}

/// True when the region's bounding box comes within `trim` cells of the
/// raster edge. Partial blobs at tile seams are the deduplicator's problem,
/// not this filter's.
fn touches_border(region: &Region, grid: &Grid, trim: usize) -> bool {
    let (min_row, min_col, max_row, max_col) = region.bbox;
    min_row < trim
        || min_col < trim
        || max_row + trim >= grid.rows
        || max_col + trim >= grid.cols
}

/// Ground slope (degrees) under the region footprint, from a least-squares
/// plane fit `z = a·col + b·row + c` over the member cells. Degenerate
/// footprints (under three cells, or a singular normal system) report zero
/// slope and pass the gate.
fn footprint_slope_deg(region: &Region, grid: &Grid, ground: &Raster) -> f64 {
    if region.pixels.len() < 3 {
        return 0.0;
    }
    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();
    for &(row, col) in &region.pixels {
        let v = Vector3::new(col as f64, row as f64, 1.0);
        ata += v * v.transpose();
        atb += v * ground.get(row, col);
    }
    match ata.try_inverse() {
        Some(inv) => {
            let coeffs = inv * atb;
            let gradient = (coeffs.x * coeffs.x + coeffs.y * coeffs.y).sqrt() / grid.cell_size;
            gradient.atan().to_degrees()
        }
        None => 0.0,
    }
}
