//! Run orchestration: two streaming passes per tile, blob detection and
//! shape gating, then the cross-tile dedupe barrier.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::DetectConfig;
use crate::detector::{dedupe, detect_blobs, filter_regions};
use crate::error::PipelineError;
use crate::grid::Grid;
use crate::ground::GroundEstimator;
use crate::hag::{HagBuilder, HagRaster};
use crate::points::TileSource;
use crate::raster::Raster;

use super::result::{ClusterRecord, Detection, Representative, RunSummary, TileError, TileReport};

/// Rasters built from one tile's two streaming passes.
pub struct TileRasters {
    pub ground: Raster,
    pub hag: HagRaster,
    /// Points read during the ground pass.
    pub point_count: u64,
}

/// Run both streaming passes over a tile and build its rasters.
///
/// Pass one accumulates the ground statistic, pass two the top statistic;
/// the source is opened once per pass. Also the entry point for callers
/// that want the HAG raster itself rather than detections.
pub fn build_rasters(
    source: &dyn TileSource,
    config: &DetectConfig,
) -> Result<TileRasters, PipelineError> {
    let grid = Grid::from_bounds(&source.bounds(), config.cell_size_m);
    debug!(path = %source.path().display(), rows = grid.rows, cols = grid.cols, "gridded tile");

    let mut ground_est = GroundEstimator::new(grid, config.ground_method);
    let mut stream = source.open()?;
    while let Some(chunk) = stream.next_chunk()? {
        ground_est.accumulate(&chunk);
    }
    drop(stream);
    let point_count = ground_est.points_seen();
    let ground = ground_est.finalize(source.path())?;

    let mut builder = HagBuilder::new(grid, config.top_method);
    let mut stream = source.open()?;
    while let Some(chunk) = stream.next_chunk()? {
        builder.accumulate(&chunk);
    }
    let hag = builder.finalize(&ground);

    Ok(TileRasters {
        ground,
        hag,
        point_count,
    })
}

fn detect_tile(
    source: &dyn TileSource,
    config: &DetectConfig,
) -> Result<(Vec<Detection>, u64, [usize; 2]), PipelineError> {
    let rasters = build_rasters(source, config)?;
    let regions = detect_blobs(&rasters.hag, &config.blob);
    let file = source.path().to_string_lossy();
    let detections = filter_regions(
        &regions,
        &rasters.hag.grid,
        &rasters.ground,
        &file,
        &config.shape,
    );
    Ok((detections, rasters.point_count, rasters.hag.grid.shape()))
}

/// Process one tile end to end. Never fails: tile-local errors are folded
/// into the report so one bad tile cannot abort the run.
pub fn process_tile(source: &dyn TileSource, config: &DetectConfig) -> TileReport {
    let start = Instant::now();
    let path = source.path().to_string_lossy().into_owned();
    let crs = source.crs().map(str::to_string);

    match detect_tile(source, config) {
        Ok((detections, point_count, shape)) => {
            info!(path = %path, points = point_count, detections = detections.len(), "tile done");
            TileReport {
                path,
                crs,
                point_count,
                grid_shape: Some(shape),
                processing_ms: start.elapsed().as_millis() as u64,
                detections,
                error: None,
            }
        }
        Err(err) => {
            warn!(path = %path, error = %err, "tile failed");
            TileReport {
                path,
                crs,
                point_count: 0,
                grid_shape: None,
                processing_ms: start.elapsed().as_millis() as u64,
                detections: Vec::new(),
                error: Some(TileError::from_pipeline_error(&err)),
            }
        }
    }
}

/// Detect across a set of tiles and deduplicate the combined result.
///
/// Tiles are processed in parallel; reports are then sorted by path so the
/// summary does not depend on scheduling. Fails only on an invalid
/// configuration, never on tile content.
pub fn run<S: TileSource>(sources: &[S], config: &DetectConfig) -> Result<RunSummary, PipelineError> {
    config.validate()?;
    info!(tiles = sources.len(), cell_size_m = config.cell_size_m, "starting run");

    let mut files: Vec<TileReport> = sources
        .par_iter()
        .map(|s| process_tile(s, config))
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let all: Vec<Detection> = files
        .iter()
        .flat_map(|f| f.detections.iter().cloned())
        .collect();
    let clusters = dedupe(&all, config.dedupe.radius_m);
    let representatives: Vec<Representative> = clusters
        .iter()
        .map(|c| Representative {
            detection: all[c.representative].clone(),
            dedupe_index: c.id,
            cluster_size: c.members.len(),
        })
        .collect();
    let cluster_records: Vec<ClusterRecord> = clusters
        .iter()
        .map(|c| ClusterRecord {
            id: c.id,
            members: c
                .members
                .iter()
                .map(|&i| (all[i].file.clone(), all[i].id))
                .collect(),
        })
        .collect();

    info!(
        raw = all.len(),
        deduped = representatives.len(),
        "run complete"
    );
    Ok(RunSummary {
        params: config.clone(),
        files,
        total_count: all.len(),
        total_count_deduped: representatives.len(),
        representatives,
        clusters: cluster_records,
    })
}
