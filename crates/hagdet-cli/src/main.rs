//! hagdet CLI — command-line interface for height-above-ground detection.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use hagdet::{
    Bounds, DetectConfig, PipelineError, PointStream, TileError, TileReport, TileSource,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "hagdet")]
#[command(about = "Detect small raised objects in LiDAR tiles via height-above-ground rasters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run detection over one or more LAS/LAZ tiles.
    Detect(CliDetectArgs),

    /// Render the height-above-ground raster of a single tile to a PNG.
    HagPreview(CliPreviewArgs),

    /// Print the default detection configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct CliDetectArgs {
    /// Input LAS/LAZ tile paths.
    #[arg(required = true)]
    tiles: Vec<PathBuf>,

    /// Path to write the run summary (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Path to a JSON configuration file used as the base instead of the
    /// built-in defaults. Command-line flags still override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: CliConfigOverrides,
}

#[derive(Debug, Clone, Args)]
struct CliPreviewArgs {
    /// Input LAS/LAZ tile path.
    tile: PathBuf,

    /// Path to write the grayscale PNG.
    #[arg(long)]
    out: PathBuf,

    /// Path to a JSON configuration file used as the base instead of the
    /// built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: CliConfigOverrides,
}

#[derive(Debug, Clone, Args)]
struct CliConfigOverrides {
    /// Raster cell size in meters.
    #[arg(long)]
    cell_size: Option<f64>,

    /// Ground statistic percentile in [0, 1]; omit to use the per-cell minimum.
    #[arg(long)]
    ground_percentile: Option<f64>,

    /// Top statistic percentile in [0, 1]; omit to use the per-cell maximum.
    #[arg(long)]
    top_percentile: Option<f64>,

    /// Lower edge of the height-above-ground band, meters.
    #[arg(long)]
    hag_min: Option<f64>,

    /// Upper edge of the height-above-ground band, meters.
    #[arg(long)]
    hag_max: Option<f64>,

    /// Disk radius for morphological open/close, in cells (0 disables).
    #[arg(long)]
    morph_radius: Option<usize>,

    /// Pixel connectivity for blob labeling.
    #[arg(long, value_enum)]
    connectivity: Option<ConnectivityArg>,

    /// Disable watershed splitting of merged blobs.
    #[arg(long)]
    no_watershed: bool,

    /// Minimum prominence of a watershed seed, meters.
    #[arg(long)]
    h_maxima: Option<f64>,

    /// Minimum blob area (cells) before a watershed split is attempted.
    #[arg(long)]
    min_split_area: Option<usize>,

    /// Minimum blob area in cells.
    #[arg(long)]
    min_area: Option<usize>,

    /// Maximum blob area in cells.
    #[arg(long)]
    max_area: Option<usize>,

    /// Minimum circularity of a blob footprint.
    #[arg(long)]
    circularity_min: Option<f64>,

    /// Minimum solidity (area over convex hull area) of a blob footprint.
    #[arg(long)]
    solidity_min: Option<f64>,

    /// Reject blobs whose bounding box comes within this many cells of the
    /// raster edge.
    #[arg(long)]
    border_trim: Option<usize>,

    /// Reject blobs on ground steeper than this slope, degrees.
    #[arg(long)]
    slope_max_deg: Option<f64>,

    /// Cross-tile dedupe radius in meters.
    #[arg(long)]
    dedupe_radius: Option<f64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConnectivityArg {
    Four,
    Eight,
}

impl ConnectivityArg {
    fn to_core(self) -> hagdet::Connectivity {
        match self {
            Self::Four => hagdet::Connectivity::Four,
            Self::Eight => hagdet::Connectivity::Eight,
        }
    }
}

impl CliConfigOverrides {
    fn apply(&self, config: &mut DetectConfig) {
        if let Some(v) = self.cell_size {
            config.cell_size_m = v;
        }
        if let Some(p) = self.ground_percentile {
            config.ground_method = hagdet::GroundMethod::Percentile(p);
        }
        if let Some(p) = self.top_percentile {
            config.top_method = hagdet::TopMethod::Percentile(p);
        }
        if let Some(v) = self.hag_min {
            config.blob.hag_min_m = v;
        }
        if let Some(v) = self.hag_max {
            config.blob.hag_max_m = v;
        }
        if let Some(v) = self.morph_radius {
            config.blob.morph_radius_cells = v;
        }
        if let Some(c) = self.connectivity {
            config.blob.connectivity = c.to_core();
        }
        if self.no_watershed {
            config.blob.watershed.enable = false;
        }
        if let Some(v) = self.h_maxima {
            config.blob.watershed.h_maxima_m = v;
        }
        if let Some(v) = self.min_split_area {
            config.blob.watershed.min_split_area_cells = v;
        }
        if let Some(v) = self.min_area {
            config.shape.min_area_cells = v;
        }
        if let Some(v) = self.max_area {
            config.shape.max_area_cells = v;
        }
        if let Some(v) = self.circularity_min {
            config.shape.circularity_min = v;
        }
        if let Some(v) = self.solidity_min {
            config.shape.solidity_min = v;
        }
        if let Some(v) = self.border_trim {
            config.shape.border_trim_cells = v;
        }
        if let Some(v) = self.slope_max_deg {
            config.shape.slope_max_deg = Some(v);
        }
        if let Some(v) = self.dedupe_radius {
            config.dedupe.radius_m = v;
        }
    }
}

fn load_config(path: Option<&Path>, overrides: &CliConfigOverrides) -> CliResult<DetectConfig> {
    let mut config = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|e| -> CliError { format!("failed to read {}: {}", p.display(), e).into() })?;
            serde_json::from_str(&text)
                .map_err(|e| -> CliError { format!("invalid config {}: {}", p.display(), e).into() })?
        }
        None => DetectConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

// ── LAS/LAZ tile source ────────────────────────────────────────────────

/// A LAS or LAZ file on disk. The header is read once up front for bounds;
/// each pipeline pass opens a fresh reader.
struct LasTile {
    path: PathBuf,
    bounds: Bounds,
}

impl LasTile {
    fn from_path(path: PathBuf) -> Result<Self, PipelineError> {
        let reader = las::Reader::from_path(&path).map_err(|e| PipelineError::InputFormat {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let b = reader.header().bounds();
        Ok(Self {
            path,
            bounds: Bounds::new(b.min.x, b.min.y, b.max.x, b.max.y),
        })
    }
}

/// Partition tile paths into readable sources and per-file failure reports.
/// An unreadable header is fatal for that tile only; the run continues with
/// the remaining tiles and the failure is recorded in its report.
fn collect_tiles(paths: &[PathBuf]) -> (Vec<LasTile>, Vec<TileReport>) {
    let mut tiles = Vec::new();
    let mut failed = Vec::new();
    for path in paths {
        match LasTile::from_path(path.clone()) {
            Ok(tile) => tiles.push(tile),
            Err(err) => {
                tracing::warn!("Skipping {}: {}", path.display(), err);
                failed.push(TileReport {
                    path: path.to_string_lossy().into_owned(),
                    crs: None,
                    point_count: 0,
                    grid_shape: None,
                    processing_ms: 0,
                    detections: Vec::new(),
                    error: Some(TileError::from_pipeline_error(&err)),
                });
            }
        }
    }
    (tiles, failed)
}

impl TileSource for LasTile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn open(&self) -> Result<Box<dyn PointStream + '_>, PipelineError> {
        let reader = las::Reader::from_path(&self.path).map_err(|e| PipelineError::InputFormat {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        Ok(Box::new(LasStream {
            path: &self.path,
            reader,
            buf: Vec::new(),
        }))
    }
}

const LAS_CHUNK_POINTS: u64 = 65_536;

struct LasStream<'a> {
    path: &'a Path,
    reader: las::Reader,
    buf: Vec<las::Point>,
}

impl PointStream for LasStream<'_> {
    fn next_chunk(&mut self) -> Result<Option<Vec<hagdet::Point>>, PipelineError> {
        self.buf = self
            .reader
            .read_points(LAS_CHUNK_POINTS)
            .map_err(|e| PipelineError::InputFormat {
                path: self.path.to_path_buf(),
                message: e.to_string(),
            })?;
        if self.buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.buf.iter().map(|p| [p.x, p.y, p.z]).collect()))
    }
}

// ── entry point ────────────────────────────────────────────────────────

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect(args) => run_detect(&args),
        Commands::HagPreview(args) => run_hag_preview(&args),
        Commands::DefaultConfig => run_default_config(),
    }
}

// ── default-config ─────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&DetectConfig::default())?);
    Ok(())
}

// ── detect ─────────────────────────────────────────────────────────────

fn run_detect(args: &CliDetectArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref(), &args.overrides)?;

    let (tiles, unreadable) = collect_tiles(&args.tiles);
    tracing::info!("Processing {} of {} tile(s)", tiles.len(), args.tiles.len());

    let mut summary = hagdet::run(&tiles, &config)?;
    summary.files.extend(unreadable);
    summary.files.sort_by(|a, b| a.path.cmp(&b.path));

    let failed = summary.files.iter().filter(|f| f.error.is_some()).count();
    tracing::info!(
        "Detected {} object(s) ({} after dedupe, {} tile(s) failed)",
        summary.total_count,
        summary.total_count_deduped,
        failed,
    );

    let json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Results written to {}", args.out.display());

    Ok(())
}

// ── hag-preview ────────────────────────────────────────────────────────

fn run_hag_preview(args: &CliPreviewArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref(), &args.overrides)?;
    let tile = LasTile::from_path(args.tile.clone())?;

    let rasters = hagdet::build_rasters(&tile, &config)?;
    let [rows, cols] = rasters.hag.grid.shape();
    tracing::info!("HAG raster: {} rows x {} cols", rows, cols);

    let peak = rasters
        .hag
        .hag
        .data
        .iter()
        .fold(0.0f64, |acc, &v| acc.max(v));
    let scale = if peak > 0.0 { 255.0 / peak } else { 0.0 };
    let pixels: Vec<u8> = rasters
        .hag
        .hag
        .data
        .iter()
        .map(|&v| (v * scale).round().clamp(0.0, 255.0) as u8)
        .collect();

    let img = image::GrayImage::from_raw(cols as u32, rows as u32, pixels)
        .ok_or_else(|| -> CliError { "raster does not fit an image buffer".into() })?;
    img.save(&args.out)?;
    tracing::info!("Preview written to {}", args.out.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_tile_becomes_a_failed_report() {
        let path = std::env::temp_dir().join("hagdet_not_a_las_file.las");
        std::fs::write(&path, b"definitely not a LAS header").unwrap();

        let (tiles, failed) = collect_tiles(&[path.clone()]);
        assert!(tiles.is_empty());
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].path, path.to_string_lossy());
        assert_eq!(failed[0].error.as_ref().unwrap().kind, "input_format");
        assert!(failed[0].detections.is_empty());

        std::fs::remove_file(&path).ok();
    }
}
