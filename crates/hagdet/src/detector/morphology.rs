//! Binary raster morphology with a disk structuring element.

use crate::raster::Mask;

/// Offsets of a disk structuring element of the given radius (cells).
/// Radius 0 degenerates to the identity element.
pub fn disk_offsets(radius: usize) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let r2 = r * r;
    let mut offsets = Vec::new();
    for dr in -r..=r {
        for dc in -r..=r {
            if dr * dr + dc * dc <= r2 {
                offsets.push((dr, dc));
            }
        }
    }
    offsets
}

/// Erosion: a cell stays set only when the whole element fits inside the
/// mask. Cells beyond the raster edge count as unset, so blobs shrink at
/// the border.
pub fn erode(mask: &Mask, offsets: &[(isize, isize)]) -> Mask {
    let mut out = Mask::filled(mask.rows, mask.cols, false);
    for row in 0..mask.rows {
        for col in 0..mask.cols {
            if !mask.get(row, col) {
                continue;
            }
            let all = offsets
                .iter()
                .all(|&(dr, dc)| mask.get_signed(row as isize + dr, col as isize + dc));
            if all {
                out.set(row, col, true);
            }
        }
    }
    out
}

/// Dilation: a cell becomes set when any element offset reaches a set cell.
pub fn dilate(mask: &Mask, offsets: &[(isize, isize)]) -> Mask {
    let mut out = Mask::filled(mask.rows, mask.cols, false);
    for row in 0..mask.rows {
        for col in 0..mask.cols {
            let any = offsets
                .iter()
                .any(|&(dr, dc)| mask.get_signed(row as isize + dr, col as isize + dc));
            if any {
                out.set(row, col, true);
            }
        }
    }
    out
}

/// Opening (erode, then dilate): removes specks smaller than the element.
pub fn open(mask: &Mask, offsets: &[(isize, isize)]) -> Mask {
    dilate(&erode(mask, offsets), offsets)
}

/// Closing (dilate, then erode): bridges narrow gaps within one blob.
pub fn close(mask: &Mask, offsets: &[(isize, isize)]) -> Mask {
    erode(&dilate(mask, offsets), offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> Mask {
        let mut mask = Mask::filled(rows.len(), rows[0].len(), false);
        for (r, line) in rows.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                if ch == '#' {
                    mask.set(r, c, true);
                }
            }
        }
        mask
    }

    #[test]
    fn disk_radius_one_is_a_plus_shape() {
        let mut offsets = disk_offsets(1);
        offsets.sort();
        assert_eq!(offsets, vec![(-1, 0), (0, -1), (0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn opening_removes_isolated_specks() {
        let mask = mask_from_rows(&[
            "........",
            ".#......",
            "....###.",
            "....###.",
            "....###.",
            "........",
        ]);
        let opened = open(&mask, &disk_offsets(1));
        assert!(!opened.get(1, 1), "speck must be removed");
        assert!(opened.get(3, 5), "block core must survive");
    }

    #[test]
    fn closing_bridges_a_one_cell_gap() {
        let mask = mask_from_rows(&["###.###"]);
        let closed = close(&mask, &disk_offsets(1));
        assert!(closed.get(0, 3), "gap must be bridged");
    }

    #[test]
    fn radius_zero_is_identity() {
        let mask = mask_from_rows(&[".#.", "#.#", ".#."]);
        let offsets = disk_offsets(0);
        assert_eq!(open(&mask, &offsets), mask);
        assert_eq!(close(&mask, &offsets), mask);
    }
}
