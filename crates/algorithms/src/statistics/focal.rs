//! Focal (moving window) coverage of low-vegetation pixels
//!
//! Flags pixels surrounded by chronically low vegetation. The result is
//! the rescue layer of the sieve cleanup: small detections lying inside
//! such context are kept even when the sieve would drop them.

use crate::maybe_rayon::*;
use scarmap_core::raster::{Mask, MASK_FALSE, MASK_NODATA, MASK_TRUE};
use scarmap_core::{Algorithm, Error, Raster, Result};
use serde::{Deserialize, Serialize};

/// Parameters for the focal coverage filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocalCoverageParams {
    /// Window side in pixels (odd, >= 1)
    pub kernel_size: usize,
    /// A pixel is low-vegetation when `0 < value < ndvi_threshold`
    pub ndvi_threshold: f64,
    /// Minimum fraction of low-vegetation pixels in the window, in (0, 1]
    pub coverage_threshold: f64,
    /// Factor applied to input pixels before the threshold test
    pub scale: f64,
}

impl Default for FocalCoverageParams {
    fn default() -> Self {
        Self {
            kernel_size: 3,
            ndvi_threshold: 0.3,
            coverage_threshold: 0.3,
            scale: 1.0,
        }
    }
}

impl FocalCoverageParams {
    pub fn validate(&self) -> Result<()> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(Error::InvalidParameter {
                name: "kernel_size",
                value: self.kernel_size.to_string(),
                reason: "kernel size must be an odd number of pixels".to_string(),
            });
        }
        if !self.ndvi_threshold.is_finite() {
            return Err(Error::InvalidParameter {
                name: "ndvi_threshold",
                value: self.ndvi_threshold.to_string(),
                reason: "threshold must be finite".to_string(),
            });
        }
        if !(self.coverage_threshold > 0.0 && self.coverage_threshold <= 1.0) {
            return Err(Error::InvalidParameter {
                name: "coverage_threshold",
                value: self.coverage_threshold.to_string(),
                reason: "coverage fraction must lie in (0, 1]".to_string(),
            });
        }
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(Error::InvalidParameter {
                name: "scale",
                value: self.scale.to_string(),
                reason: "scale factor must be finite and non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Focal coverage algorithm
#[derive(Debug, Clone, Default)]
pub struct FocalCoverage;

impl Algorithm for FocalCoverage {
    type Input = Raster<f64>;
    type Output = Mask;
    type Params = FocalCoverageParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "FocalCoverage"
    }

    fn description(&self) -> &'static str {
        "Windowed fraction of low-vegetation pixels, thresholded into a mask"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        focal_coverage(&input, params)
    }
}

/// Compute the focal coverage mask.
///
/// 1. `m1 = 1` where `0 < value * scale < ndvi_threshold`, else 0 (nodata
///    counts as 0)
/// 2. mean of `m1` over a `k x k` window; off-raster cells contribute 0 and
///    the divisor is always `k * k`
/// 3. 1 where the mean is >= `coverage_threshold`, else 0
///
/// Pixels whose own input is nodata are 255 in the output.
pub fn focal_coverage(index: &Raster<f64>, params: FocalCoverageParams) -> Result<Mask> {
    params.validate()?;

    let (rows, cols) = index.shape();
    let nt = params.ndvi_threshold;
    let scale = params.scale;

    let low: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                let v = unsafe { index.get_unchecked(row, col) };
                let is_low = !index.is_nodata(v) && v * scale > 0.0 && v * scale < nt;
                row_data.push(is_low as u8);
            }
            row_data
        })
        .collect();

    let radius = (params.kernel_size / 2) as isize;
    let window = (params.kernel_size * params.kernel_size) as f64;
    let low = &low;

    let output_data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                let v = unsafe { index.get_unchecked(row, col) };
                if index.is_nodata(v) {
                    row_data.push(MASK_NODATA);
                    continue;
                }

                let mut count = 0usize;
                for dr in -radius..=radius {
                    let nr = row as isize + dr;
                    if nr < 0 || nr as usize >= rows {
                        continue;
                    }
                    for dc in -radius..=radius {
                        let nc = col as isize + dc;
                        if nc >= 0 && (nc as usize) < cols {
                            count += low[nr as usize * cols + nc as usize] as usize;
                        }
                    }
                }

                let mean = count as f64 / window;
                row_data.push(if mean >= params.coverage_threshold {
                    MASK_TRUE
                } else {
                    MASK_FALSE
                });
            }
            row_data
        })
        .collect();

    index.derive(output_data, Some(MASK_NODATA))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_kernel_rejected() {
        let raster: Raster<f64> = Raster::new(5, 5);
        let params = FocalCoverageParams {
            kernel_size: 4,
            ..Default::default()
        };
        assert!(matches!(
            focal_coverage(&raster, params),
            Err(Error::InvalidParameter { name: "kernel_size", .. })
        ));
    }

    #[test]
    fn test_invalid_coverage_rejected() {
        let raster: Raster<f64> = Raster::new(5, 5);
        for kp in [0.0, -0.1, 1.5, f64::NAN] {
            let params = FocalCoverageParams {
                coverage_threshold: kp,
                ..Default::default()
            };
            assert!(focal_coverage(&raster, params).is_err());
        }
    }

    #[test]
    fn test_all_zero_input_gives_all_zero_mask() {
        let raster: Raster<f64> = Raster::new(6, 7);
        for (nt, kp) in [(0.3, 0.3), (1.0, 0.01), (-1.0, 1.0)] {
            let params = FocalCoverageParams {
                kernel_size: 3,
                ndvi_threshold: nt,
                coverage_threshold: kp,
                ..Default::default()
            };
            let out = focal_coverage(&raster, params).unwrap();
            assert_eq!(out.count_value(0), 42);
        }
    }

    #[test]
    fn test_coverage_fraction() {
        // Centre 3x3 block of low vegetation in a 5x5 field of 0.8
        let mut raster: Raster<f64> = Raster::filled(5, 5, 0.8);
        for r in 1..4 {
            for c in 1..4 {
                raster.set(r, c, 0.1).unwrap();
            }
        }

        let out = focal_coverage(&raster, FocalCoverageParams::default()).unwrap();
        // corner (0,0) sees 1/9 < 0.3, edge (0,2) sees 3/9 >= 0.3
        assert_eq!(out.get(0, 0).unwrap(), 0);
        assert_eq!(out.get(0, 2).unwrap(), 1);
        assert_eq!(out.get(2, 2).unwrap(), 1);
        assert_eq!(out.get(0, 1).unwrap(), 0);
    }

    #[test]
    fn test_off_raster_cells_count_as_zero() {
        // Every pixel is low; a corner window only holds 4 of 9
        let raster: Raster<f64> = Raster::filled(3, 3, 0.1);
        let params = FocalCoverageParams {
            coverage_threshold: 0.5,
            ..Default::default()
        };
        let out = focal_coverage(&raster, params).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 0);
        assert_eq!(out.get(0, 1).unwrap(), 1);
        assert_eq!(out.get(1, 1).unwrap(), 1);
    }

    #[test]
    fn test_scaled_integer_input() {
        // 1000 * 0.0001 = 0.1, low; 8000 * 0.0001 = 0.8, not low
        let mut raster: Raster<f64> = Raster::filled(3, 3, 8000.0);
        raster.set(0, 0, 1000.0).unwrap();
        raster.set(0, 1, 1000.0).unwrap();
        raster.set(0, 2, 1000.0).unwrap();

        let unscaled = focal_coverage(&raster, FocalCoverageParams::default()).unwrap();
        assert_eq!(unscaled.count_set(), 0);

        let params = FocalCoverageParams {
            scale: 0.0001,
            ..Default::default()
        };
        let scaled = focal_coverage(&raster, params).unwrap();
        // only the middle column sees 3 of 9 low cells, and only in the top two rows
        assert_eq!(scaled.count_set(), 2);
        assert_eq!(scaled.get(1, 1).unwrap(), 1);
        assert_eq!(scaled.get(1, 0).unwrap(), 0);
        assert_eq!(scaled.get(2, 1).unwrap(), 0);

        let zero = FocalCoverageParams {
            scale: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            focal_coverage(&raster, zero),
            Err(Error::InvalidParameter { name: "scale", .. })
        ));
    }

    #[test]
    fn test_nodata_pixel_is_nodata() {
        let mut raster: Raster<f64> = Raster::filled(3, 3, 0.1);
        raster.set(1, 1, f64::NAN).unwrap();
        let out = FocalCoverage.execute_default(raster).unwrap();
        assert_eq!(out.get(1, 1).unwrap(), MASK_NODATA);
        assert_eq!(out.get(0, 1).unwrap(), 1);
    }
}
