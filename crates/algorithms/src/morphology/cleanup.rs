//! Two-pass sieve cleanup with focal rescue
//!
//! - Pass A sieves the detection with a fixed 5 pixel threshold.
//! - Rescue keeps a detected pixel when pass A kept it or when it lies in
//!   low-vegetation context (the focal coverage mask).
//! - Pass B sieves the rescued mask with the minimum-area threshold, but
//!   may only change pixels that pass A kept. Small detections brought
//!   back by the rescue therefore survive pass B.

use scarmap_core::raster::Mask;
use scarmap_core::{Error, Result};
use tracing::debug;

use super::label::Connectivity;
use super::sieve::{sieve, SieveParams};
use crate::config::RESCUE_SIEVE_PIXELS;
use crate::masking::rescue_combine;

/// How the raw detection mask is cleaned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// The detection mask is final
    None,
    /// Two-pass sieve with focal rescue
    SieveWithRescue { min_pixels: usize },
}

/// Intermediate and final masks of a cleanup run
#[derive(Debug, Clone)]
pub struct CleanupOutput {
    /// Pass A result
    pub sieved: Option<Mask>,
    /// Rescue combination
    pub rescued: Option<Mask>,
    /// Final landslide mask
    pub final_mask: Mask,
}

impl CleanupPolicy {
    /// Choose the policy for a minimum area in ground units.
    ///
    /// `min_area == 0` disables cleanup; otherwise the pixel threshold is
    /// `max(1, ceil(min_area / pixel_area))`.
    pub fn from_min_area(min_area: f64, pixel_area: f64) -> Result<Self> {
        if !min_area.is_finite() || min_area < 0.0 {
            return Err(Error::InvalidParameter {
                name: "min_area",
                value: min_area.to_string(),
                reason: "minimum area must be finite and non-negative".to_string(),
            });
        }
        if min_area == 0.0 {
            return Ok(CleanupPolicy::None);
        }
        if !pixel_area.is_finite() || pixel_area <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "pixel_area",
                value: pixel_area.to_string(),
                reason: "pixel area must be positive".to_string(),
            });
        }

        let min_pixels = ((min_area / pixel_area).ceil() as usize).max(1);
        Ok(CleanupPolicy::SieveWithRescue { min_pixels })
    }

    /// Apply the policy to a detection mask with its focal rescue mask
    pub fn apply(&self, detection: &Mask, focal: &Mask) -> Result<CleanupOutput> {
        match *self {
            CleanupPolicy::None => Ok(CleanupOutput {
                sieved: None,
                rescued: None,
                final_mask: detection.clone(),
            }),
            CleanupPolicy::SieveWithRescue { min_pixels } => {
                let pass_a = SieveParams {
                    threshold: RESCUE_SIEVE_PIXELS,
                    connectivity: Connectivity::Four,
                };
                let sieved = sieve(detection, pass_a, None)?;
                let rescued = rescue_combine(detection, &sieved, Some(focal))?;

                let pass_b = SieveParams {
                    threshold: min_pixels,
                    connectivity: Connectivity::Four,
                };
                let final_mask = sieve(&rescued, pass_b, Some(&sieved))?;

                debug!(
                    detected = detection.count_set(),
                    sieved = sieved.count_set(),
                    rescued = rescued.count_set(),
                    kept = final_mask.count_set(),
                    min_pixels,
                    "cleanup"
                );

                Ok(CleanupOutput {
                    sieved: Some(sieved),
                    rescued: Some(rescued),
                    final_mask,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scarmap_core::Raster;

    fn mask(rows: usize, cols: usize, set: &[(usize, usize)]) -> Mask {
        let mut m: Mask = Raster::new(rows, cols);
        m.set_nodata(Some(255));
        for &(r, c) in set {
            m.set(r, c, 1).unwrap();
        }
        m
    }

    #[test]
    fn test_policy_from_min_area() {
        assert_eq!(CleanupPolicy::from_min_area(0.0, 100.0).unwrap(), CleanupPolicy::None);
        assert_eq!(
            CleanupPolicy::from_min_area(250.0, 100.0).unwrap(),
            CleanupPolicy::SieveWithRescue { min_pixels: 3 }
        );
        assert_eq!(
            CleanupPolicy::from_min_area(1.0, 100.0).unwrap(),
            CleanupPolicy::SieveWithRescue { min_pixels: 1 }
        );
        assert!(CleanupPolicy::from_min_area(-1.0, 100.0).is_err());
        assert!(CleanupPolicy::from_min_area(10.0, 0.0).is_err());
    }

    #[test]
    fn test_none_policy_passes_detection_through() {
        let det = mask(5, 5, &[(2, 2)]);
        let focal = mask(5, 5, &[]);
        let out = CleanupPolicy::None.apply(&det, &focal).unwrap();
        assert_eq!(out.final_mask.data(), det.data());
        assert!(out.sieved.is_none());
    }

    #[test]
    fn test_isolated_pixel_rescued_by_focal_context() {
        let det = mask(7, 7, &[(3, 3)]);
        let focal = mask(7, 7, &[(2, 2), (2, 3), (3, 2), (3, 3)]);
        let policy = CleanupPolicy::SieveWithRescue { min_pixels: 4 };

        let out = policy.apply(&det, &focal).unwrap();
        assert_eq!(out.sieved.as_ref().unwrap().get(3, 3).unwrap(), 0);
        assert_eq!(out.rescued.as_ref().unwrap().get(3, 3).unwrap(), 1);
        assert_eq!(out.final_mask.get(3, 3).unwrap(), 1);
    }

    #[test]
    fn test_isolated_pixel_without_context_removed() {
        let det = mask(7, 7, &[(3, 3)]);
        let focal = mask(7, 7, &[(0, 0)]);
        let policy = CleanupPolicy::SieveWithRescue { min_pixels: 4 };

        let out = policy.apply(&det, &focal).unwrap();
        assert_eq!(out.final_mask.count_set(), 0);
    }

    #[test]
    fn test_pass_b_removes_regions_below_min_area() {
        // 6 pixel block survives pass A (>= 5) but not min_pixels = 8
        let block: Vec<(usize, usize)> = (1..3).flat_map(|r| (1..4).map(move |c| (r, c))).collect();
        let mut set = block.clone();
        // 9 pixel block survives both
        set.extend((5..8).flat_map(|r| (5..8).map(move |c| (r, c))));

        let det = mask(10, 10, &set);
        let focal = mask(10, 10, &[]);
        let policy = CleanupPolicy::SieveWithRescue { min_pixels: 8 };

        let out = policy.apply(&det, &focal).unwrap();
        assert_eq!(out.final_mask.count_set(), 9);
        assert_eq!(out.final_mask.get(1, 1).unwrap(), 0);
        assert_eq!(out.final_mask.get(6, 6).unwrap(), 1);
    }
}
