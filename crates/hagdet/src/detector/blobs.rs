//! Blob extraction: band threshold, morphological cleanup, labeling and
//! optional watershed splitting.

use tracing::debug;

use crate::config::BlobParams;
use crate::hag::HagRaster;
use crate::raster::Mask;

use super::label::{label_components, Region};
use super::morphology::{close, disk_offsets, open};
use super::watershed;

/// Binary mask of cells inside the configured HAG band.
fn band_mask(hag: &HagRaster, hag_min: f64, hag_max: f64) -> Mask {
    let mut mask = Mask::filled(hag.grid.rows, hag.grid.cols, false);
    for (i, &v) in hag.hag.data.iter().enumerate() {
        if v >= hag_min && v <= hag_max {
            mask.data[i] = true;
        }
    }
    mask
}

/// Extract candidate regions from the HAG raster.
///
/// The cleaned mask is re-intersected with the raw band mask, so morphology
/// can only remove or re-connect cells that were inside the band; it never
/// grows a blob onto cells whose HAG lies outside `[hag_min, hag_max]`.
pub fn detect_blobs(hag: &HagRaster, params: &BlobParams) -> Vec<Region> {
    let band = band_mask(hag, params.hag_min_m, params.hag_max_m);

    let cleaned = if params.morph_radius_cells > 0 {
        let se = disk_offsets(params.morph_radius_cells);
        let mut cleaned = close(&open(&band, &se), &se);
        cleaned.intersect(&band);
        cleaned
    } else {
        band
    };

    let offsets = params.connectivity.offsets();
    let components = label_components(&cleaned, offsets);
    debug!(
        components = components.len(),
        masked = cleaned.count_set(),
        "labeling complete"
    );

    let ws = &params.watershed;
    let mut regions: Vec<Region> = Vec::new();
    for pixels in components {
        let split = ws.enable && pixels.len() >= ws.min_split_area_cells;
        if !split {
            regions.push(Region::build(regions.len() as u32 + 1, pixels, &hag.hag));
            continue;
        }

        let mut membership = vec![false; hag.grid.len()];
        for &(row, col) in &pixels {
            membership[row * hag.grid.cols + col] = true;
        }
        let seeds = watershed::find_seeds(
            &hag.hag,
            &pixels,
            &membership,
            ws.h_maxima_m,
            ws.seed_window_cells,
        );
        if seeds.len() < 2 {
            regions.push(Region::build(regions.len() as u32 + 1, pixels, &hag.hag));
            continue;
        }

        debug!(seeds = seeds.len(), area = pixels.len(), "splitting region");
        for part in watershed::split_region(&hag.hag, &pixels, &membership, &seeds, offsets) {
            regions.push(Region::build(regions.len() as u32 + 1, part, &hag.hag));
        }
    }
    regions
}
