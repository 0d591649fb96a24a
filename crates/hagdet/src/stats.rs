//! Per-cell streaming aggregates shared by the ground and HAG passes.

use tracing::warn;

/// Nearest-rank quantile of a sorted, non-empty slice.
#[inline]
pub(crate) fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Sample buffer above which a memory-pressure warning is emitted once.
const BUFFER_WARN_SAMPLES: usize = 20_000_000;

/// Per-cell elevation aggregate: either a running extreme (exact, O(cells)
/// memory) or buffered samples for an exact quantile (O(points) memory).
///
/// Both forms are mergeable across chunks and independent of chunk
/// boundaries and point arrival order, which is what makes max/min mode
/// byte-reproducible and keeps quantile mode order-free.
pub(crate) enum CellAggregate {
    /// Running minimum per cell; unobserved cells hold `+inf`.
    Min(Vec<f64>),
    /// Running maximum per cell; unobserved cells hold `-inf`.
    Max(Vec<f64>),
    /// Buffered samples per cell for an exact quantile.
    Quantile {
        p: f64,
        bins: Vec<Vec<f64>>,
        total: usize,
        warned: bool,
    },
}

impl CellAggregate {
    pub fn running_min(cells: usize) -> Self {
        Self::Min(vec![f64::INFINITY; cells])
    }

    pub fn running_max(cells: usize) -> Self {
        Self::Max(vec![f64::NEG_INFINITY; cells])
    }

    pub fn quantile(cells: usize, p: f64) -> Self {
        Self::Quantile {
            p,
            bins: vec![Vec::new(); cells],
            total: 0,
            warned: false,
        }
    }

    #[inline]
    pub fn push(&mut self, cell: usize, value: f64) {
        match self {
            Self::Min(v) => {
                if value < v[cell] {
                    v[cell] = value;
                }
            }
            Self::Max(v) => {
                if value > v[cell] {
                    v[cell] = value;
                }
            }
            Self::Quantile {
                bins,
                total,
                warned,
                ..
            } => {
                bins[cell].push(value);
                *total += 1;
                if *total == BUFFER_WARN_SAMPLES && !*warned {
                    *warned = true;
                    warn!(
                        samples = *total,
                        "quantile aggregation is buffering a large sample set; \
                         consider min/max mode for bounded memory"
                    );
                }
            }
        }
    }

    /// Resolved per-cell value, or `None` for cells with no observations.
    pub fn value(&self, cell: usize) -> Option<f64> {
        match self {
            Self::Min(v) => {
                let x = v[cell];
                (x != f64::INFINITY).then_some(x)
            }
            Self::Max(v) => {
                let x = v[cell];
                (x != f64::NEG_INFINITY).then_some(x)
            }
            Self::Quantile { p, bins, .. } => {
                let bin = &bins[cell];
                if bin.is_empty() {
                    return None;
                }
                let mut sorted = bin.clone();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                Some(quantile_sorted(&sorted, *p))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_min_tracks_minimum() {
        let mut agg = CellAggregate::running_min(2);
        agg.push(0, 3.0);
        agg.push(0, 1.0);
        agg.push(0, 2.0);
        assert_eq!(agg.value(0), Some(1.0));
        assert_eq!(agg.value(1), None);
    }

    #[test]
    fn quantile_is_order_independent() {
        let samples = [5.0, 1.0, 3.0, 2.0, 4.0];
        let mut fwd = CellAggregate::quantile(1, 0.5);
        let mut rev = CellAggregate::quantile(1, 0.5);
        for &s in &samples {
            fwd.push(0, s);
        }
        for &s in samples.iter().rev() {
            rev.push(0, s);
        }
        assert_eq!(fwd.value(0), rev.value(0));
        assert_eq!(fwd.value(0), Some(3.0));
    }

    #[test]
    fn quantile_edges_hit_extremes() {
        let mut agg = CellAggregate::quantile(1, 0.0);
        for s in [2.0, 9.0, 4.0] {
            agg.push(0, s);
        }
        assert_eq!(agg.value(0), Some(2.0));
        let mut agg = CellAggregate::quantile(1, 1.0);
        for s in [2.0, 9.0, 4.0] {
            agg.push(0, s);
        }
        assert_eq!(agg.value(0), Some(9.0));
    }
}
