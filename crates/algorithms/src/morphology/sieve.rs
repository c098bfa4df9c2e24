//! Sieve filter
//!
//! Every maximal region of equal value smaller than the threshold is
//! merged into its largest adjacent region. Regions are processed from
//! the smallest up (ties by label) and a region that has grown past the
//! threshold through earlier merges is left alone. Ties between equally
//! large neighbours go to the lowest label. A small region without any
//! neighbour stays as it is. Nodata pixels are neither merged nor used as
//! neighbours.

use std::collections::BTreeSet;

use scarmap_core::raster::Mask;
use scarmap_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::label::{label_value_regions, Connectivity};
use crate::masking::is_set_unchecked;

/// Parameters for the sieve filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SieveParams {
    /// Regions with fewer pixels than this are merged away
    pub threshold: usize,
    /// Connectivity used for both regions and adjacency
    pub connectivity: Connectivity,
}

impl Default for SieveParams {
    fn default() -> Self {
        Self {
            threshold: 5,
            connectivity: Connectivity::Four,
        }
    }
}

/// Sieve algorithm
#[derive(Debug, Clone, Default)]
pub struct Sieve;

impl Algorithm for Sieve {
    type Input = Mask;
    type Output = Mask;
    type Params = SieveParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Sieve"
    }

    fn description(&self) -> &'static str {
        "Merge regions smaller than a pixel threshold into their largest neighbour"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        sieve(&input, params, None)
    }
}

/// Union-find over region indices with merged sizes and adjacency
struct Regions {
    parent: Vec<usize>,
    size: Vec<usize>,
    value: Vec<u8>,
    neighbours: Vec<BTreeSet<usize>>,
}

impl Regions {
    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Merge root `from` into root `into`
    fn absorb(&mut self, from: usize, into: usize) {
        self.parent[from] = into;
        self.size[into] += self.size[from];
        let moved = std::mem::take(&mut self.neighbours[from]);
        self.neighbours[into].extend(moved);
    }

    /// Largest neighbouring root of root `i`, lowest index on ties
    fn largest_neighbour(&mut self, i: usize) -> Option<usize> {
        let candidates: Vec<usize> = self.neighbours[i].iter().copied().collect();
        let mut best: Option<usize> = None;
        for n in candidates {
            let root = self.find(n);
            if root == i {
                continue;
            }
            best = match best {
                Some(b) if self.size[b] > self.size[root] => Some(b),
                Some(b) if self.size[b] == self.size[root] && b < root => Some(b),
                _ => Some(root),
            };
        }
        best
    }
}

/// Sieve a mask.
///
/// Region sizes and adjacency are measured over the whole mask. When
/// `protect` is given, only pixels set in it take the sieved value; all
/// other pixels keep their input value.
///
/// # Arguments
/// * `mask` - Input mask; any u8 values are treated as classes
/// * `params` - Threshold and connectivity
/// * `protect` - Optional mask restricting which pixels may change
pub fn sieve(mask: &Mask, params: SieveParams, protect: Option<&Mask>) -> Result<Mask> {
    if params.threshold == 0 {
        return Err(Error::InvalidParameter {
            name: "threshold",
            value: "0".to_string(),
            reason: "sieve threshold must be at least 1 pixel".to_string(),
        });
    }
    if let Some(p) = protect {
        mask.ensure_same_grid(p, "protect")?;
    }

    let (rows, cols) = mask.shape();
    let labels = label_value_regions(mask, params.connectivity);
    let count = labels.count();
    let label_of = labels.as_slice();

    let mut regions = Regions {
        parent: (0..count).collect(),
        size: (1..=count as u32).map(|l| labels.size(l)).collect(),
        value: vec![0; count],
        neighbours: vec![BTreeSet::new(); count],
    };

    for row in 0..rows {
        for col in 0..cols {
            let l = label_of[row * cols + col];
            if l == 0 {
                continue;
            }
            let i = l as usize - 1;
            regions.value[i] = unsafe { mask.get_unchecked(row, col) };

            for &(dr, dc) in params.connectivity.offsets() {
                let nr = row as isize + dr;
                let nc = col as isize + dc;
                if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                    continue;
                }
                let n = label_of[nr as usize * cols + nc as usize];
                if n != 0 && n != l {
                    regions.neighbours[i].insert(n as usize - 1);
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..count)
        .filter(|&i| regions.size[i] < params.threshold)
        .collect();
    order.sort_by_key(|&i| (regions.size[i], i));

    let mut merged = 0usize;
    for i in order {
        let root = regions.find(i);
        if regions.size[root] >= params.threshold {
            continue;
        }
        if let Some(target) = regions.largest_neighbour(root) {
            regions.absorb(root, target);
            merged += 1;
        }
    }
    debug!(regions = count, merged, threshold = params.threshold, "sieve");

    let final_value: Vec<u8> = (0..count)
        .map(|i| {
            let root = regions.find(i);
            regions.value[root]
        })
        .collect();

    let mut output = mask.clone();
    for row in 0..rows {
        for col in 0..cols {
            let l = label_of[row * cols + col];
            if l == 0 {
                continue;
            }
            if protect.is_none_or(|p| is_set_unchecked(p, row, col)) {
                output.data_mut()[(row, col)] = final_value[l as usize - 1];
            }
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scarmap_core::Raster;

    fn mask(data: Vec<u8>, rows: usize, cols: usize) -> Mask {
        let mut m = Raster::from_vec(data, rows, cols).unwrap();
        m.set_nodata(Some(255));
        m
    }

    fn params(threshold: usize) -> SieveParams {
        SieveParams {
            threshold,
            connectivity: Connectivity::Four,
        }
    }

    #[test]
    fn test_small_island_removed_large_kept() {
        #[rustfmt::skip]
        let m = mask(vec![
            1, 0, 0, 0, 0,
            0, 0, 0, 1, 1,
            0, 0, 0, 1, 1,
            0, 0, 0, 1, 1,
        ], 4, 5);
        let out = sieve(&m, params(3), None).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 0);
        assert_eq!(out.count_set(), 6);
    }

    #[test]
    fn test_small_hole_filled() {
        #[rustfmt::skip]
        let m = mask(vec![
            1, 1, 1,
            1, 0, 1,
            1, 1, 1,
        ], 3, 3);
        let out = sieve(&m, params(2), None).unwrap();
        assert_eq!(out.count_set(), 9);
    }

    #[test]
    fn test_diagonal_pixels_are_separate_regions_under_four_connectivity() {
        #[rustfmt::skip]
        let m = mask(vec![
            1, 0, 0,
            0, 1, 0,
            0, 0, 0,
        ], 3, 3);
        let out = sieve(&m, params(2), None).unwrap();
        assert_eq!(out.count_set(), 0);

        let eight = SieveParams {
            threshold: 2,
            connectivity: Connectivity::Eight,
        };
        let kept = sieve(&m, eight, None).unwrap();
        assert_eq!(kept.count_set(), 2);
    }

    #[test]
    fn test_isolated_region_without_neighbour_kept() {
        let m = mask(vec![1, 255, 255, 255], 2, 2);
        let out = sieve(&m, params(5), None).unwrap();
        assert_eq!(out.data(), m.data());
    }

    #[test]
    fn test_nodata_untouched() {
        let m = mask(vec![1, 255, 0, 0, 0, 0], 2, 3);
        let out = sieve(&m, params(2), None).unwrap();
        assert_eq!(out.get(0, 1).unwrap(), 255);
        assert_eq!(out.get(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_merge_into_largest_neighbour() {
        // Single 2 between a region of 1s (size 3) and 0s (size 5)
        #[rustfmt::skip]
        let m = mask(vec![
            1, 1, 1,
            0, 2, 0,
            0, 0, 0,
        ], 3, 3);
        let out = sieve(&m, params(2), None).unwrap();
        assert_eq!(out.get(1, 1).unwrap(), 0);
    }

    #[test]
    fn test_protect_restricts_changes() {
        #[rustfmt::skip]
        let m = mask(vec![
            1, 0, 0,
            0, 0, 0,
            0, 0, 1,
        ], 3, 3);
        // Only (2, 2) may change
        #[rustfmt::skip]
        let protect = mask(vec![
            0, 0, 0,
            0, 0, 0,
            0, 0, 1,
        ], 3, 3);
        let out = sieve(&m, params(2), Some(&protect)).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 1);
        assert_eq!(out.get(2, 2).unwrap(), 0);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let m = mask(vec![1, 0], 1, 2);
        assert!(sieve(&m, params(0), None).is_err());
    }

    #[test]
    fn test_algorithm_trait() {
        let m = mask(vec![1, 0, 0, 0, 0, 0], 2, 3);
        let out = Sieve.execute_default(m).unwrap();
        assert_eq!(out.count_set(), 0);
    }
}
