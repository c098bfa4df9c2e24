//! Mask combinators: AND, boolean rescue, validity extent

use super::{build_mask, is_set_unchecked};
use scarmap_core::raster::{Mask, MASK_FALSE, MASK_NODATA, MASK_TRUE};
use scarmap_core::{Error, Raster, Result};

/// AND-combine masks.
///
/// Output is 1 only where every input is 1 and none is nodata; else 0.
/// Combining a mask with itself is idempotent on its 0/1 pixels.
pub fn and_combine(masks: &[&Mask]) -> Result<Mask> {
    let Some((first, rest)) = masks.split_first() else {
        return Err(Error::InvalidParameter {
            name: "masks",
            value: "[]".to_string(),
            reason: "AND-combine needs at least one mask".to_string(),
        });
    };
    for (i, mask) in rest.iter().enumerate() {
        first.ensure_same_grid(mask, &format!("mask[{}]", i + 1))?;
    }

    build_mask(first, |row, col| {
        if masks.iter().all(|m| is_set_unchecked(m, row, col)) {
            MASK_TRUE
        } else {
            MASK_FALSE
        }
    })
}

/// Boolean-rescue combine.
///
/// `(A == 1 && B == 1) || (A == 1 && C == 1)`; without `rescue` this reduces
/// to `A == 1 && B == 1`.
///
/// # Arguments
/// * `primary` - A, the detection every output pixel must come from
/// * `secondary` - B, usually a sieved version of A
/// * `rescue` - C, pixels allowed back in regardless of B
pub fn rescue_combine(primary: &Mask, secondary: &Mask, rescue: Option<&Mask>) -> Result<Mask> {
    primary.ensure_same_grid(secondary, "secondary")?;
    if let Some(c) = rescue {
        primary.ensure_same_grid(c, "rescue")?;
    }

    build_mask(primary, |row, col| {
        let a = is_set_unchecked(primary, row, col);
        let b = is_set_unchecked(secondary, row, col);
        let c = rescue.is_some_and(|m| is_set_unchecked(m, row, col));
        if a && (b || c) { MASK_TRUE } else { MASK_FALSE }
    })
}

/// Validity mask: 1 where every input holds data, 255 elsewhere
pub fn validity_mask(inputs: &[&Raster<f64>]) -> Result<Mask> {
    let Some((first, rest)) = inputs.split_first() else {
        return Err(Error::InvalidParameter {
            name: "inputs",
            value: "[]".to_string(),
            reason: "validity mask needs at least one raster".to_string(),
        });
    };
    for (i, raster) in rest.iter().enumerate() {
        first.ensure_same_grid(raster, &format!("input[{}]", i + 1))?;
    }

    build_mask(first, |row, col| {
        let valid = inputs.iter().all(|r| {
            let v = unsafe { r.get_unchecked(row, col) };
            !r.is_nodata(v)
        });
        if valid { MASK_TRUE } else { MASK_NODATA }
    })
}

/// Write nodata into `mask` wherever `validity` is not 1
pub fn apply_extent(mask: &Mask, validity: &Mask) -> Result<Mask> {
    mask.ensure_same_grid(validity, "validity")?;

    build_mask(mask, |row, col| {
        if is_set_unchecked(validity, row, col) {
            unsafe { mask.get_unchecked(row, col) }
        } else {
            MASK_NODATA
        }
    })
}
