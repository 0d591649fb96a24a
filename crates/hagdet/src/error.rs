//! Pipeline error taxonomy.
//!
//! Per-tile failures (`InputFormat`, `InsufficientData`) are isolated: the
//! run continues with the remaining tiles and the failure is recorded in the
//! tile report. `Configuration` failures are raised before any tile is
//! touched.

use std::path::PathBuf;

/// Errors produced by the detection pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The tile file could not be opened or decoded. Fatal for the tile only.
    InputFormat { path: PathBuf, message: String },
    /// The tile yielded zero usable points or zero observed ground cells.
    /// The tile is skipped with zero detections; not a run-level failure.
    InsufficientData { path: PathBuf, message: String },
    /// Invalid parameter combination. Fatal at startup, before any tile.
    Configuration(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InputFormat { path, message } => {
                write!(f, "input format error in {}: {}", path.display(), message)
            }
            Self::InsufficientData { path, message } => {
                write!(f, "insufficient data in {}: {}", path.display(), message)
            }
            Self::Configuration(message) => write!(f, "configuration error: {}", message),
        }
    }
}

impl std::error::Error for PipelineError {}

impl PipelineError {
    /// Short stage-independent class name, used in tile reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputFormat { .. } => "input_format",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::Configuration(_) => "configuration",
        }
    }

    /// True when the run may continue with the remaining tiles.
    pub fn is_tile_local(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }
}
