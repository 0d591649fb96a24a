//! Seeded watershed splitting of merged blobs.
//!
//! Large regions that swallowed several nearby objects are split by
//! extracting prominent local maxima of the HAG surface as markers, then
//! growing each marker downhill inside the region mask. Growth order is a
//! max-heap keyed by `(height, reverse linear index)`, so equal heights
//! resolve in row-major order and the split is deterministic.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::raster::Raster;

/// Seed cells: HAG local maxima that exceed every other cell of the region
/// within a Chebyshev window of `window` cells by at least `h_maxima`.
pub fn find_seeds(
    hag: &Raster,
    pixels: &[(usize, usize)],
    membership: &[bool],
    h_maxima: f64,
    window: usize,
) -> Vec<(usize, usize)> {
    let cols = hag.cols;
    let w = window as isize;
    let mut seeds = Vec::new();
    'cells: for &(row, col) in pixels {
        let center = hag.get(row, col);
        for dr in -w..=w {
            for dc in -w..=w {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let (nr, nc) = (row as isize + dr, col as isize + dc);
                if nr < 0 || nc < 0 || nr as usize >= hag.rows || nc as usize >= hag.cols {
                    continue;
                }
                let (nr, nc) = (nr as usize, nc as usize);
                if !membership[nr * cols + nc] {
                    continue;
                }
                if center < hag.get(nr, nc) + h_maxima {
                    continue 'cells;
                }
            }
        }
        seeds.push((row, col));
    }
    seeds
}

#[derive(Debug)]
struct GrowthFront {
    height: f64,
    index: usize,
    seed: u32,
}

impl PartialEq for GrowthFront {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for GrowthFront {}

impl PartialOrd for GrowthFront {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GrowthFront {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher cells first; ties break toward the lower linear index.
        self.height
            .partial_cmp(&other.height)
            .unwrap_or(Ordering::Equal)
            .then_with(|| Reverse(self.index).cmp(&Reverse(other.index)))
    }
}

/// Marker-based watershed confined to one region's mask.
///
/// Every seed claims its own sub-region; remaining cells attach to the
/// front that reaches them first in decreasing-HAG order. Returns one pixel
/// set per seed, each in row-major order. Callers skip the split when fewer
/// than two seeds exist.
pub fn split_region(
    hag: &Raster,
    pixels: &[(usize, usize)],
    membership: &[bool],
    seeds: &[(usize, usize)],
    neighbor_offsets: &[(isize, isize)],
) -> Vec<Vec<(usize, usize)>> {
    let cols = hag.cols;
    let mut assignment: Vec<u32> = vec![0; hag.rows * cols];
    let mut heap = BinaryHeap::new();

    for (i, &(row, col)) in seeds.iter().enumerate() {
        let index = row * cols + col;
        assignment[index] = (i + 1) as u32;
        heap.push(GrowthFront {
            height: hag.get(row, col),
            index,
            seed: (i + 1) as u32,
        });
    }

    while let Some(front) = heap.pop() {
        let (row, col) = (front.index / cols, front.index % cols);
        for &(dr, dc) in neighbor_offsets {
            let (nr, nc) = (row as isize + dr, col as isize + dc);
            if nr < 0 || nc < 0 || nr as usize >= hag.rows || nc as usize >= hag.cols {
                continue;
            }
            let nidx = nr as usize * cols + nc as usize;
            if !membership[nidx] || assignment[nidx] != 0 {
                continue;
            }
            assignment[nidx] = front.seed;
            heap.push(GrowthFront {
                height: hag.get(nr as usize, nc as usize),
                index: nidx,
                seed: front.seed,
            });
        }
    }

    let mut parts: Vec<Vec<(usize, usize)>> = vec![Vec::new(); seeds.len()];
    for &(row, col) in pixels {
        let seed = assignment[row * cols + col];
        if seed > 0 {
            parts[(seed - 1) as usize].push((row, col));
        }
    }
    parts.retain(|p| !p.is_empty());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Connectivity;

    /// One 8x8 region with two HAG peaks joined by a low saddle.
    fn two_peak_scene() -> (Raster, Vec<(usize, usize)>, Vec<bool>) {
        let mut hag = Raster::filled(8, 8, 0.0);
        let mut pixels = Vec::new();
        let mut membership = vec![false; 64];
        for row in 2..5 {
            for col in 1..7 {
                let d_left = (row as f64 - 3.0).abs() + (col as f64 - 2.0).abs();
                let d_right = (row as f64 - 3.0).abs() + (col as f64 - 5.0).abs();
                let v = (0.6 - 0.12 * d_left.min(d_right)).max(0.2);
                hag.set(row, col, v);
                pixels.push((row, col));
                membership[row * 8 + col] = true;
            }
        }
        (hag, pixels, membership)
    }

    #[test]
    fn two_peaks_give_two_seeds() {
        let (hag, pixels, membership) = two_peak_scene();
        let seeds = find_seeds(&hag, &pixels, &membership, 0.1, 1);
        assert_eq!(seeds, vec![(3, 2), (3, 5)]);
    }

    #[test]
    fn watershed_splits_between_the_peaks() {
        let (hag, pixels, membership) = two_peak_scene();
        let seeds = find_seeds(&hag, &pixels, &membership, 0.1, 1);
        let parts = split_region(
            &hag,
            &pixels,
            &membership,
            &seeds,
            Connectivity::Eight.offsets(),
        );
        assert_eq!(parts.len(), 2);
        let total: usize = parts.iter().map(|p| p.len()).sum();
        assert_eq!(total, pixels.len(), "split must cover the whole region");
        assert!(parts[0].contains(&(3, 2)));
        assert!(parts[1].contains(&(3, 5)));
        // Left peak keeps the left flank, right peak the right flank.
        assert!(parts[0].iter().all(|&(_, c)| c <= 3));
        assert!(parts[1].iter().all(|&(_, c)| c >= 3));
    }

    #[test]
    fn flat_region_yields_no_seeds() {
        let hag = Raster::filled(4, 4, 0.5);
        let pixels: Vec<_> = (0..4).flat_map(|r| (0..4).map(move |c| (r, c))).collect();
        let membership = vec![true; 16];
        let seeds = find_seeds(&hag, &pixels, &membership, 0.05, 1);
        assert!(seeds.is_empty());
    }

    #[test]
    fn single_seed_claims_everything() {
        let mut hag = Raster::filled(3, 3, 0.3);
        hag.set(1, 1, 0.7);
        let pixels: Vec<_> = (0..3).flat_map(|r| (0..3).map(move |c| (r, c))).collect();
        let membership = vec![true; 9];
        let seeds = find_seeds(&hag, &pixels, &membership, 0.2, 1);
        assert_eq!(seeds, vec![(1, 1)]);
        let parts = split_region(
            &hag,
            &pixels,
            &membership,
            &seeds,
            Connectivity::Four.offsets(),
        );
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].len(), 9);
    }
}
