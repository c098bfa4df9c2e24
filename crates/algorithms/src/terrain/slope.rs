//! Slope from a DEM
//!
//! Horn (1981) 3x3 finite differences, in degrees. Used when no slope
//! raster is supplied to the detector.

use crate::maybe_rayon::*;
use scarmap_core::raster::Raster;
use scarmap_core::{Algorithm, Error, Result};

/// Parameters for slope calculation
#[derive(Debug, Clone, Copy)]
pub struct SlopeParams {
    /// Multiplier converting horizontal units to elevation units
    /// (about 111320 for lat/lon DEMs in metres)
    pub z_factor: f64,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self { z_factor: 1.0 }
    }
}

/// Slope algorithm
#[derive(Debug, Clone, Default)]
pub struct Slope;

impl Algorithm for Slope {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = SlopeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Slope"
    }

    fn description(&self) -> &'static str {
        "Slope in degrees from a DEM using Horn's method"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        slope_with_params(&input, params)
    }
}

/// Slope in degrees with a unit z-factor
pub fn slope(dem: &Raster<f64>) -> Result<Raster<f64>> {
    slope_with_params(dem, SlopeParams::default())
}

/// Slope in degrees
///
/// ```text
/// a b c
/// d e f
/// g h i
/// ```
///
/// dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 * dx)
/// dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 * dy)
///
/// `dx` and `dy` are the pixel width and height, so non-square pixels are
/// handled. Border cells and cells with a nodata neighbour are NaN.
pub fn slope_with_params(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    if !params.z_factor.is_finite() || params.z_factor <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "z_factor",
            value: params.z_factor.to_string(),
            reason: "z-factor must be positive".to_string(),
        });
    }

    let (rows, cols) = dem.shape();
    let transform = dem.transform();
    let eight_dx = 8.0 * transform.pixel_width.abs() * params.z_factor;
    let eight_dy = 8.0 * transform.pixel_height.abs() * params.z_factor;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            if row == 0 || row + 1 >= rows {
                return row_data;
            }

            for (col, out) in row_data.iter_mut().enumerate().take(cols.saturating_sub(1)).skip(1) {
                let mut w = [0.0f64; 9];
                let mut valid = true;
                for (k, v) in w.iter_mut().enumerate() {
                    let value = unsafe { dem.get_unchecked(row + k / 3 - 1, col + k % 3 - 1) };
                    if dem.is_nodata(value) {
                        valid = false;
                        break;
                    }
                    *v = value;
                }
                if !valid {
                    continue;
                }

                let [a, b, c, d, _, f, g, h, i] = w;
                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_dx;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_dy;

                *out = dz_dx.hypot(dz_dy).atan().to_degrees();
            }

            row_data
        })
        .collect();

    dem.derive(output_data, Some(f64::NAN))
}
