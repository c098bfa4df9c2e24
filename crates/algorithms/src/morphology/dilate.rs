//! Binary dilation of a mask
//!
//! A pixel is set in the output when any pixel under the structuring
//! element, centred on it, is set in the input. Off-raster cells and nodata
//! never count as set.

use crate::masking::{build_mask, is_set_unchecked};
use scarmap_core::raster::{Mask, MASK_FALSE, MASK_TRUE};
use scarmap_core::{Algorithm, Error, Result};

use super::element::StructuringElement;

/// Parameters for binary dilation
#[derive(Debug, Clone, Default)]
pub struct DilateParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Dilation algorithm
#[derive(Debug, Clone, Default)]
pub struct Dilate;

impl Algorithm for Dilate {
    type Input = Mask;
    type Output = Mask;
    type Params = DilateParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Dilate"
    }

    fn description(&self) -> &'static str {
        "Binary dilation of a mask with a structuring element"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        dilate(&input, &params.element)
    }
}

/// Dilate the set pixels of a binary mask.
///
/// Output holds only 0 and 1.
pub fn dilate(mask: &Mask, element: &StructuringElement) -> Result<Mask> {
    element.validate()?;

    let (rows, cols) = mask.shape();
    let offsets = element.offsets();

    build_mask(mask, |row, col| {
        let hit = offsets.iter().any(|&(dr, dc)| {
            let nr = row as isize + dr;
            let nc = col as isize + dc;
            nr >= 0
                && nc >= 0
                && (nr as usize) < rows
                && (nc as usize) < cols
                && is_set_unchecked(mask, nr as usize, nc as usize)
        });
        if hit { MASK_TRUE } else { MASK_FALSE }
    })
}
