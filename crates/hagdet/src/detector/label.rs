//! Connected-component labeling and per-region geometry.
//!
//! Labeling is the classic two-pass scheme with union-find equivalence
//! resolution (no recursive flood fill, so stack usage stays bounded on
//! large blobs). Regions come out in row-major first-occurrence order,
//! which downstream stages rely on for reproducible detection ids.

use crate::raster::{Mask, Raster};

/// Array-backed disjoint-set over dense indices.
///
/// Union always keeps the smaller root as representative, so resolved roots
/// are deterministic regardless of union order.
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    pub fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[hi] = lo;
    }
}

/// Label connected components of `mask` and return their pixel sets in
/// row-major first-occurrence order.
///
/// `neighbor_offsets` selects the connectivity (4- or 8-neighbourhood);
/// only the already-scanned half of the neighbourhood participates in the
/// first pass.
pub fn label_components(
    mask: &Mask,
    neighbor_offsets: &[(isize, isize)],
) -> Vec<Vec<(usize, usize)>> {
    let (rows, cols) = (mask.rows, mask.cols);
    let mut labels = vec![0usize; rows * cols];
    let mut dsu = DisjointSet::new(rows * cols / 2 + 2);
    let mut next = 1usize;

    // Predecessor offsets: strictly above, or same row to the left.
    let prior: Vec<(isize, isize)> = neighbor_offsets
        .iter()
        .copied()
        .filter(|&(dr, dc)| dr < 0 || (dr == 0 && dc < 0))
        .collect();

    for row in 0..rows {
        for col in 0..cols {
            if !mask.get(row, col) {
                continue;
            }
            let mut assigned = 0usize;
            for &(dr, dc) in &prior {
                let (nr, nc) = (row as isize + dr, col as isize + dc);
                if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                    continue;
                }
                let neighbor = labels[nr as usize * cols + nc as usize];
                if neighbor == 0 {
                    continue;
                }
                if assigned == 0 {
                    assigned = neighbor;
                } else if neighbor != assigned {
                    dsu.union(assigned, neighbor);
                }
            }
            if assigned == 0 {
                assigned = next;
                next += 1;
                if assigned >= dsu.parent.len() {
                    dsu.parent.push(assigned);
                }
            }
            labels[row * cols + col] = assigned;
        }
    }

    // Second pass: resolve equivalences, compact to first-occurrence order.
    let mut compact = vec![0usize; next];
    let mut regions: Vec<Vec<(usize, usize)>> = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let raw = labels[row * cols + col];
            if raw == 0 {
                continue;
            }
            let root = dsu.find(raw);
            let id = if compact[root] == 0 {
                regions.push(Vec::new());
                compact[root] = regions.len();
                regions.len()
            } else {
                compact[root]
            };
            regions[id - 1].push((row, col));
        }
    }
    regions
}

/// A labeled blob with its raw geometric statistics.
#[derive(Debug, Clone)]
pub struct Region {
    /// 1-based label in row-major first-occurrence order.
    pub label: u32,
    /// Member cells as `(row, col)`, row-major.
    pub pixels: Vec<(usize, usize)>,
    /// Bounding box `(min_row, min_col, max_row, max_col)`, inclusive.
    pub bbox: (usize, usize, usize, usize),
    /// Mean cell position `(row, col)`.
    pub centroid_rc: (f64, f64),
    /// Cell count.
    pub area_cells: usize,
    /// Boundary-cell count: member cells with at least one 4-neighbour
    /// outside the region.
    pub perimeter_cells: usize,
    /// Convex-hull area over the pixel corner points (cell units).
    pub hull_area: f64,
    /// Mean HAG over member cells.
    pub hag_mean: f64,
    /// Maximum HAG over member cells.
    pub hag_max: f64,
}

impl Region {
    /// Compute region statistics from a pixel set and the HAG raster.
    pub fn build(label: u32, pixels: Vec<(usize, usize)>, hag: &Raster) -> Self {
        assert!(!pixels.is_empty());
        let mut min_row = usize::MAX;
        let mut min_col = usize::MAX;
        let mut max_row = 0usize;
        let mut max_col = 0usize;
        let mut sum_row = 0.0;
        let mut sum_col = 0.0;
        let mut hag_sum = 0.0;
        let mut hag_max = f64::NEG_INFINITY;
        for &(row, col) in &pixels {
            min_row = min_row.min(row);
            min_col = min_col.min(col);
            max_row = max_row.max(row);
            max_col = max_col.max(col);
            sum_row += row as f64;
            sum_col += col as f64;
            let v = hag.get(row, col);
            hag_sum += v;
            hag_max = hag_max.max(v);
        }
        let area = pixels.len();

        // Local membership mask over the bounding box for the boundary scan.
        let (h, w) = (max_row - min_row + 1, max_col - min_col + 1);
        let mut local = Mask::filled(h, w, false);
        for &(row, col) in &pixels {
            local.set(row - min_row, col - min_col, true);
        }
        let mut perimeter = 0usize;
        for &(row, col) in &pixels {
            let (lr, lc) = ((row - min_row) as isize, (col - min_col) as isize);
            let exposed = [(-1, 0), (1, 0), (0, -1), (0, 1)]
                .iter()
                .any(|&(dr, dc)| !local.get_signed(lr + dr, lc + dc));
            if exposed {
                perimeter += 1;
            }
        }

        let hull_area = hull_area_from_pixels(&pixels);

        Self {
            label,
            bbox: (min_row, min_col, max_row, max_col),
            centroid_rc: (sum_row / area as f64, sum_col / area as f64),
            area_cells: area,
            perimeter_cells: perimeter,
            hull_area,
            hag_mean: hag_sum / area as f64,
            hag_max,
            pixels,
        }
    }

    /// Circularity `4π·area / perimeter²`. Can exceed 1.0 for very small
    /// blobs because the perimeter is a boundary-cell count.
    pub fn circularity(&self) -> f64 {
        let p = self.perimeter_cells as f64;
        if p <= 0.0 {
            return 0.0;
        }
        4.0 * std::f64::consts::PI * self.area_cells as f64 / (p * p)
    }

    /// Solidity `area / hull_area` in [0, 1] up to discretisation.
    pub fn solidity(&self) -> f64 {
        if self.hull_area <= 0.0 {
            return 0.0;
        }
        (self.area_cells as f64 / self.hull_area).min(1.0)
    }
}

/// Convex-hull area of a pixel set, taken over the four corner points of
/// every cell so that single-row and single-cell regions still enclose
/// their full area.
fn hull_area_from_pixels(pixels: &[(usize, usize)]) -> f64 {
    let mut corners: Vec<(f64, f64)> = Vec::with_capacity(pixels.len() * 4);
    for &(row, col) in pixels {
        let (r, c) = (row as f64, col as f64);
        corners.push((c, r));
        corners.push((c + 1.0, r));
        corners.push((c, r + 1.0));
        corners.push((c + 1.0, r + 1.0));
    }
    let hull = convex_hull(&corners);
    polygon_area(&hull)
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Gift-wrapping convex hull (counter-clockwise).
fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut start = 0;
    for (i, p) in points.iter().enumerate() {
        if p.0 < points[start].0 || (p.0 == points[start].0 && p.1 < points[start].1) {
            start = i;
        }
    }
    let mut hull = Vec::new();
    let mut current = start;
    loop {
        hull.push(points[current]);
        let mut next = 0;
        for i in 0..points.len() {
            if i == current {
                continue;
            }
            if next == current || cross(points[current], points[next], points[i]) < 0.0 {
                next = i;
            }
        }
        current = next;
        if current == start || hull.len() > points.len() {
            break;
        }
    }
    hull
}

/// Shoelace area of a simple polygon.
fn polygon_area(polygon: &[(f64, f64)]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..polygon.len() {
        let (x0, y0) = polygon[i];
        let (x1, y1) = polygon[(i + 1) % polygon.len()];
        twice += x0 * y1 - x1 * y0;
    }
    twice.abs() / 2.0
}
