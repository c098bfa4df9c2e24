//! Connected-component labeling
//!
//! Labels are assigned in row-major scan order starting at 1; 0 marks
//! unlabeled cells. Flood fill uses an explicit stack.

use scarmap_core::raster::{Raster, RasterElement};
use serde::{Deserialize, Serialize};

/// Pixel connectivity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Edge neighbours only
    #[default]
    Four,
    /// Edge and corner neighbours
    Eight,
}

const FOUR: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
const EIGHT: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

impl Connectivity {
    /// Neighbour offsets (dr, dc)
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &FOUR,
            Connectivity::Eight => &EIGHT,
        }
    }
}

/// Result of connected-component labeling
#[derive(Debug, Clone)]
pub struct Labels {
    rows: usize,
    cols: usize,
    /// Row-major label per cell, 0 = unlabeled
    labels: Vec<u32>,
    /// Pixel count per label (index = label - 1)
    sizes: Vec<usize>,
}

impl Labels {
    /// Number of regions
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Label at (row, col), `None` when unlabeled or out of bounds
    pub fn label_at(&self, row: usize, col: usize) -> Option<u32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        match self.labels[row * self.cols + col] {
            0 => None,
            l => Some(l),
        }
    }

    /// Pixel count of a region
    pub fn size(&self, label: u32) -> usize {
        label
            .checked_sub(1)
            .and_then(|i| self.sizes.get(i as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Row-major labels
    pub fn as_slice(&self) -> &[u32] {
        &self.labels
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
}

/// Label connected regions of pixels accepted by `predicate`.
///
/// Nodata pixels are never accepted. Any two adjacent accepted pixels
/// belong to the same region regardless of their values.
pub fn label_regions<T, P>(raster: &Raster<T>, connectivity: Connectivity, predicate: P) -> Labels
where
    T: RasterElement,
    P: Fn(T) -> bool,
{
    let accepted: Vec<bool> = raster
        .data()
        .iter()
        .map(|&v| !raster.is_nodata(v) && predicate(v))
        .collect();

    flood_label(raster.shape(), connectivity, |i| accepted[i], |_, _| true)
}

/// Label maximal regions of equal value, excluding nodata.
pub fn label_value_regions<T>(raster: &Raster<T>, connectivity: Connectivity) -> Labels
where
    T: RasterElement,
{
    let values: Vec<T> = raster.data().iter().copied().collect();
    flood_label(
        raster.shape(),
        connectivity,
        |i| !raster.is_nodata(values[i]),
        |a, b| values[a] == values[b],
    )
}

fn flood_label<A, S>((rows, cols): (usize, usize), connectivity: Connectivity, accept: A, same: S) -> Labels
where
    A: Fn(usize) -> bool,
    S: Fn(usize, usize) -> bool,
{
    let mut labels = vec![0u32; rows * cols];
    let mut sizes = Vec::new();
    let offsets = connectivity.offsets();
    let mut stack = Vec::new();

    for start in 0..rows * cols {
        if labels[start] != 0 || !accept(start) {
            continue;
        }

        let label = sizes.len() as u32 + 1;
        let mut size = 0usize;
        labels[start] = label;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            size += 1;
            let (r, c) = ((idx / cols) as isize, (idx % cols) as isize);

            for &(dr, dc) in offsets {
                let nr = r + dr;
                let nc = c + dc;
                if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                    continue;
                }
                let n = nr as usize * cols + nc as usize;
                if labels[n] == 0 && accept(n) && same(start, n) {
                    labels[n] = label;
                    stack.push(n);
                }
            }
        }

        sizes.push(size);
    }

    Labels {
        rows,
        cols,
        labels,
        sizes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(data: Vec<u8>, rows: usize, cols: usize) -> Raster<u8> {
        let mut r = Raster::from_vec(data, rows, cols).unwrap();
        r.set_nodata(Some(255));
        r
    }

    #[test]
    fn test_four_vs_eight_connectivity() {
        // Two diagonal pixels
        let r = raster(vec![1, 0, 0, 1], 2, 2);
        let four = label_regions(&r, Connectivity::Four, |v| v == 1);
        assert_eq!(four.count(), 2);
        let eight = label_regions(&r, Connectivity::Eight, |v| v == 1);
        assert_eq!(eight.count(), 1);
        assert_eq!(eight.size(1), 2);
    }

    #[test]
    fn test_labels_in_scan_order() {
        #[rustfmt::skip]
        let r = raster(vec![
            0, 1, 0, 1,
            0, 1, 0, 1,
            1, 0, 0, 0,
        ], 3, 4);
        let labels = label_regions(&r, Connectivity::Four, |v| v == 1);
        assert_eq!(labels.count(), 3);
        assert_eq!(labels.label_at(0, 1), Some(1));
        assert_eq!(labels.label_at(0, 3), Some(2));
        assert_eq!(labels.label_at(2, 0), Some(3));
        assert_eq!(labels.label_at(0, 0), None);
        assert_eq!(labels.size(2), 2);
        assert_eq!(labels.size(0), 0);
        assert_eq!(labels.size(9), 0);
    }

    #[test]
    fn test_value_regions_skip_nodata() {
        #[rustfmt::skip]
        let r = raster(vec![
            1, 1, 0,
            255, 0, 0,
            1, 1, 255,
        ], 3, 3);
        let labels = label_value_regions(&r, Connectivity::Four);
        // {1,1} top, {0,0,0}, {1,1} bottom
        assert_eq!(labels.count(), 3);
        assert_eq!(labels.label_at(1, 0), None);
        assert_eq!(labels.size(labels.label_at(1, 1).unwrap()), 3);
    }
}
