//! Synthetic point clouds for tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::points::Point;

/// Flat ground samples on a regular grid covering `[0, extent) x [0, extent)`.
pub fn ground_points(extent: f64, spacing: f64, z: f64) -> Vec<Point> {
    let n = (extent / spacing).round() as usize;
    let mut pts = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            pts.push([i as f64 * spacing, j as f64 * spacing, z]);
        }
    }
    pts
}

/// Add top-surface samples of a square block with its min corner at
/// `(x0, y0)`, edge length `side` (inclusive of both edges) and top at
/// absolute elevation `top_z`.
pub fn raised_block(pts: &mut Vec<Point>, x0: f64, y0: f64, side: f64, spacing: f64, top_z: f64) {
    let n = (side / spacing).round() as usize;
    for i in 0..=n {
        for j in 0..=n {
            pts.push([x0 + i as f64 * spacing, y0 + j as f64 * spacing, top_z]);
        }
    }
}

/// Perturb every elevation by a seeded uniform offset in `[-amplitude, amplitude]`.
pub fn jitter_z(pts: &mut [Point], seed: u64, amplitude: f64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for p in pts.iter_mut() {
        p[2] += rng.gen_range(-amplitude..=amplitude);
    }
}
