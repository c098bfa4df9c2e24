//! Binary mask algebra
//!
//! Every mask follows the {0, 1, 255} convention of [`scarmap_core::Mask`].
//! Combinators read a pixel as "set" only when it equals 1 and is not the
//! mask's declared nodata; they always produce fresh masks on the grid of
//! their first input.

mod combine;
mod layers;

pub use combine::{and_combine, apply_extent, rescue_combine, validity_mask};
pub use layers::{artificial_surface_mask, change_threshold_mask, slope_mask, water_mask};

use crate::maybe_rayon::*;
use scarmap_core::raster::{Mask, MASK_NODATA};
use scarmap_core::{Raster, RasterElement, Result};

/// Build a mask on `template`'s grid from a per-pixel rule
pub(crate) fn build_mask<T, F>(template: &Raster<T>, rule: F) -> Result<Mask>
where
    T: RasterElement,
    F: Fn(usize, usize) -> u8 + Sync + Send,
{
    let (rows, cols) = template.shape();

    let output_data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                row_data.push(rule(row, col));
            }
            row_data
        })
        .collect();

    template.derive(output_data, Some(MASK_NODATA))
}

/// Whether the pixel at (row, col) is set; the caller guarantees bounds
#[inline]
pub(crate) fn is_set_unchecked(mask: &Mask, row: usize, col: usize) -> bool {
    let v = unsafe { mask.get_unchecked(row, col) };
    v == scarmap_core::raster::MASK_TRUE && !mask.is_nodata(v)
}
