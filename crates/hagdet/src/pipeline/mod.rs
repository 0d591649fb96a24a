//! High-level detection pipeline.
//!
//! This module is the glue layer that wires together the per-tile stages:
//! ground pass -> HAG pass -> blob extraction -> shape gates, followed by
//! the run-level dedupe barrier once every tile has reported.
//!
//! Algorithmic primitives live in `crate::ground`, `crate::hag` and
//! `crate::detector`. The pipeline layer owns stage order, per-tile error
//! isolation and the shape of the emitted reports.

mod result;
mod run;

pub use result::{ClusterRecord, Detection, Representative, RunSummary, TileError, TileReport};
pub use run::{build_rasters, process_tile, run, TileRasters};
