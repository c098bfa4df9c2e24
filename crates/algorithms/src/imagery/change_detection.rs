//! Relative difference vegetation change index (RdNDVI)
//!
//! With `a = pre * pre_scale` and `b = post * post_scale`:
//!
//! - `a == 0`: `index = (a - b) / 0.0001`
//! - otherwise: `index = (a - b) / sqrt(|a|)`
//!
//! The `a == 0` branch keeps the sign of the difference and produces a jump
//! at zero; it is intentional and must not be smoothed. Values are stored
//! as `i32` fixed point with an output scale of 0.0001, so the stored value
//! is `round(index / 0.0001)` and decoding gives the index back to four
//! decimals.

use crate::maybe_rayon::*;
use scarmap_core::raster::Raster;
use scarmap_core::{Algorithm, Error, Result};

/// Nodata sentinel of the stored change index
pub const CHANGE_INDEX_NODATA: i32 = -32768;

/// Physical value = stored value * CHANGE_INDEX_SCALE
pub const CHANGE_INDEX_SCALE: f64 = 0.0001;

/// Denominator used when the pre-event value is exactly zero
const ZERO_DENOMINATOR: f64 = 0.0001;

/// Parameters for the change index
#[derive(Debug, Clone, Copy)]
pub struct ChangeIndexParams {
    /// Factor applied to pre-event pixels before the formula
    pub pre_scale: f64,
    /// Factor applied to post-event pixels before the formula
    pub post_scale: f64,
}

impl Default for ChangeIndexParams {
    fn default() -> Self {
        Self {
            pre_scale: 1.0,
            post_scale: 1.0,
        }
    }
}

impl ChangeIndexParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("pre_scale", self.pre_scale), ("post_scale", self.post_scale)] {
            if !value.is_finite() || value == 0.0 {
                return Err(Error::InvalidParameter {
                    name,
                    value: value.to_string(),
                    reason: "scale factor must be finite and non-zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Change index algorithm
#[derive(Debug, Clone, Default)]
pub struct ChangeIndex;

impl Algorithm for ChangeIndex {
    type Input = (Raster<f64>, Raster<f64>);
    type Output = Raster<i32>;
    type Params = ChangeIndexParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ChangeIndex"
    }

    fn description(&self) -> &'static str {
        "Relative NDVI difference between pre- and post-event rasters"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (pre, post) = input;
        change_index(&pre, &post, params)
    }
}

/// Per-pixel change index value before rounding
///
/// `a` and `b` are already scaled. The result is in physical units.
#[inline]
pub fn change_index_value(a: f64, b: f64) -> f64 {
    if a == 0.0 {
        (a - b) / ZERO_DENOMINATOR
    } else {
        (a - b) / a.abs().sqrt()
    }
}

/// Encode a physical index value into its stored form.
#[inline]
fn encode(value: f64) -> i32 {
    to_fixed(value / CHANGE_INDEX_SCALE)
}

/// Rounds half away from zero and saturates at the `i32` range. A valid
/// value that lands on the nodata sentinel is moved one step towards zero.
#[inline]
fn to_fixed(units: f64) -> i32 {
    let stored = units.round() as i32;
    if stored == CHANGE_INDEX_NODATA {
        CHANGE_INDEX_NODATA + 1
    } else {
        stored
    }
}

/// Compute the change index between two aligned rasters.
///
/// Any pixel that is nodata (declared sentinel or NaN) in either input, or
/// whose scaled value is not finite, yields [`CHANGE_INDEX_NODATA`].
///
/// # Arguments
/// * `pre` - Vegetation index before the event
/// * `post` - Vegetation index after the event
/// * `params` - Per-raster scale factors
pub fn change_index(
    pre: &Raster<f64>,
    post: &Raster<f64>,
    params: ChangeIndexParams,
) -> Result<Raster<i32>> {
    params.validate()?;
    pre.ensure_same_grid(post, "post")?;

    let (rows, cols) = pre.shape();

    let output_data: Vec<i32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                let p = unsafe { pre.get_unchecked(row, col) };
                let q = unsafe { post.get_unchecked(row, col) };

                if pre.is_nodata(p) || post.is_nodata(q) {
                    row_data.push(CHANGE_INDEX_NODATA);
                    continue;
                }

                let a = p * params.pre_scale;
                let b = q * params.post_scale;
                let value = change_index_value(a, b);

                row_data.push(if value.is_finite() {
                    encode(value)
                } else {
                    CHANGE_INDEX_NODATA
                });
            }
            row_data
        })
        .collect();

    pre.derive(output_data, Some(CHANGE_INDEX_NODATA))
}

/// Decode a stored change index into physical units.
///
/// Nodata becomes NaN.
pub fn decode_change_index(index: &Raster<i32>) -> Result<Raster<f64>> {
    let (rows, cols) = index.shape();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                let v = unsafe { index.get_unchecked(row, col) };
                row_data.push(if is_index_nodata(index, v) {
                    f64::NAN
                } else {
                    v as f64 * CHANGE_INDEX_SCALE
                });
            }
            row_data
        })
        .collect();

    index.derive(output_data, Some(f64::NAN))
}

/// Whether a stored index value is nodata, honouring both the raster's
/// declared sentinel and the fixed one
#[inline]
pub(crate) fn is_index_nodata(index: &Raster<i32>, value: i32) -> bool {
    value == CHANGE_INDEX_NODATA || index.is_nodata(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use scarmap_core::GeoTransform;

    fn single(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(1, 1, value);
        r.set_transform(GeoTransform::new(0.0, 10.0, 10.0, -10.0));
        r
    }

    #[test]
    fn test_zero_pre_uses_small_denominator() {
        // (0 - 0.0005) / 0.0001 = -5
        let index = change_index(&single(0.0), &single(0.0005), ChangeIndexParams::default()).unwrap();
        assert_eq!(index.get(0, 0).unwrap(), -50_000);

        let loss = change_index(&single(0.0), &single(-0.0005), ChangeIndexParams::default()).unwrap();
        assert_eq!(loss.get(0, 0).unwrap(), 50_000);
    }

    #[test]
    fn test_regular_pixel() {
        // (5000 - 3000) / sqrt(5000) = 28.2843
        let index = change_index(&single(5000.0), &single(3000.0), ChangeIndexParams::default()).unwrap();
        assert_eq!(index.get(0, 0).unwrap(), 282_843);
        assert_eq!(index.nodata(), Some(CHANGE_INDEX_NODATA));

        let decoded = decode_change_index(&index).unwrap();
        assert_relative_eq!(decoded.get(0, 0).unwrap(), 28.2843, epsilon = 1e-9);
    }

    #[test]
    fn test_ndvi_range_keeps_precision() {
        // (0.8 - 0.1) / sqrt(0.8) = 0.78262
        let index = change_index(&single(0.8), &single(0.1), ChangeIndexParams::default()).unwrap();
        assert_eq!(index.get(0, 0).unwrap(), 7826);
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        assert_eq!(to_fixed(2.5), 3);
        assert_eq!(to_fixed(-2.5), -3);
        assert_eq!(to_fixed(2.4), 2);
    }

    #[test]
    fn test_scale_factors_applied_before_formula() {
        let params = ChangeIndexParams {
            pre_scale: 0.0001,
            post_scale: 0.0001,
        };
        // a = 0.8, b = 0.1
        let index = change_index(&single(8000.0), &single(1000.0), params).unwrap();
        assert_eq!(index.get(0, 0).unwrap(), 7826);
    }

    #[test]
    fn test_nodata_propagates() {
        let mut pre = Raster::from_vec(vec![0.5, -9999.0, 0.4, f64::NAN], 2, 2).unwrap();
        pre.set_nodata(Some(-9999.0));
        let mut post = Raster::from_vec(vec![0.2, 0.1, 0.0, 0.1], 2, 2).unwrap();
        post.set_nodata(Some(0.0));

        let index = change_index(&pre, &post, ChangeIndexParams::default()).unwrap();
        assert_ne!(index.get(0, 0).unwrap(), CHANGE_INDEX_NODATA);
        assert_eq!(index.get(0, 1).unwrap(), CHANGE_INDEX_NODATA);
        assert_eq!(index.get(1, 0).unwrap(), CHANGE_INDEX_NODATA);
        assert_eq!(index.get(1, 1).unwrap(), CHANGE_INDEX_NODATA);
    }

    #[test]
    fn test_saturates_and_avoids_sentinel() {
        let huge = change_index(&single(0.0), &single(-1e12), ChangeIndexParams::default()).unwrap();
        assert_eq!(huge.get(0, 0).unwrap(), i32::MAX);

        // pre = 0, post = 5000: -5e7, beyond the stored range
        let low = change_index(&single(0.0), &single(5000.0), ChangeIndexParams::default()).unwrap();
        assert_eq!(low.get(0, 0).unwrap(), i32::MIN);

        assert_eq!(to_fixed(-32768.0), CHANGE_INDEX_NODATA + 1);
    }

    #[test]
    fn test_misaligned_inputs_rejected() {
        let pre: Raster<f64> = Raster::new(3, 3);
        let post: Raster<f64> = Raster::new(3, 4);
        assert!(matches!(
            change_index(&pre, &post, ChangeIndexParams::default()),
            Err(Error::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let params = ChangeIndexParams {
            pre_scale: 0.0,
            post_scale: 1.0,
        };
        assert!(matches!(
            change_index(&single(1.0), &single(1.0), params),
            Err(Error::InvalidParameter { name: "pre_scale", .. })
        ));
    }

    #[test]
    fn test_decode() {
        let index = Raster::from_vec(vec![7826, CHANGE_INDEX_NODATA, -50_000_000, 0], 2, 2).unwrap();
        let decoded = decode_change_index(&index).unwrap();
        assert_relative_eq!(decoded.get(0, 0).unwrap(), 0.7826, epsilon = 1e-12);
        assert!(decoded.get(0, 1).unwrap().is_nan());
        assert_relative_eq!(decoded.get(1, 0).unwrap(), -5000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_algorithm_trait() {
        let algo = ChangeIndex;
        assert_eq!(algo.name(), "ChangeIndex");
        let out = algo.execute_default((single(5000.0), single(3000.0))).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 282_843);
    }
}
