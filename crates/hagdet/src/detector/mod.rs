//! Detection building blocks: morphology, labeling, watershed splitting,
//! shape gating and cross-tile deduplication.
//!
//! Everything here is deterministic for a fixed raster: neighbor orders,
//! label compaction and heap tie-breaks are all pinned to row-major cell
//! order, so the same inputs always yield the same regions and ids.

pub mod blobs;
pub mod dedup;
pub mod label;
pub mod morphology;
pub mod shape_filter;
pub mod watershed;

pub use blobs::detect_blobs;
pub use dedup::{dedupe, DedupeCluster};
pub use label::Region;
pub use shape_filter::filter_regions;
