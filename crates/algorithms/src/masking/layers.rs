//! Thematic masks: water, artificial surfaces, change and slope thresholds

use super::{build_mask, is_set_unchecked};
use crate::config::{BUFFER_MULTIPLIER, SLOPE_THRESHOLD, WATER_THRESHOLD};
use crate::imagery::{is_index_nodata, CHANGE_INDEX_SCALE};
use crate::morphology::{dilate, StructuringElement};
use scarmap_core::raster::{Mask, MASK_FALSE, MASK_NODATA, MASK_TRUE};
use scarmap_core::{Error, Raster, Result};
use tracing::{debug, warn};

/// Water mask from a post-event water index.
///
/// 0 where NDWI > 0.1, 1 elsewhere, 255 where the input is nodata.
pub fn water_mask(ndwi: &Raster<f64>) -> Result<Mask> {
    build_mask(ndwi, |row, col| {
        let v = unsafe { ndwi.get_unchecked(row, col) };
        if ndwi.is_nodata(v) {
            MASK_NODATA
        } else if v > WATER_THRESHOLD {
            MASK_FALSE
        } else {
            MASK_TRUE
        }
    })
}

/// Exclusion mask around artificial surfaces.
///
/// Pixels valued 1 in `surface`, and every pixel whose centre lies within
/// 1.5 pixel resolutions of one (ground distance, so anisotropic pixels
/// get an elliptical buffer), become 0; everything else is 1. Nodata in
/// `surface` counts as non-artificial.
///
/// Returns `Ok(None)` with a warning when `surface` holds no pixel valued
/// 1; callers then proceed without this layer.
pub fn artificial_surface_mask(surface: &Mask) -> Result<Option<Mask>> {
    let sources = surface.count_set();
    if sources == 0 {
        warn!("artificial surface mask has no pixel valued 1, skipping the layer");
        return Ok(None);
    }

    let transform = surface.transform();
    let distance = BUFFER_MULTIPLIER * surface.cell_size();
    let element = StructuringElement::Ground {
        distance,
        pixel_width: transform.pixel_width,
        pixel_height: transform.pixel_height,
    };
    debug!(sources, distance, "buffering artificial surfaces");

    let buffered = dilate(surface, &element)?;
    let mask = build_mask(&buffered, |row, col| {
        if is_set_unchecked(&buffered, row, col) {
            MASK_FALSE
        } else {
            MASK_TRUE
        }
    })?;
    Ok(Some(mask))
}

/// Pixels whose change index exceeds `threshold` inside the event mask.
///
/// `threshold` is in physical units: the stored index is multiplied by
/// the output scale (0.0001) before comparison. Nodata yields 0.
pub fn change_threshold_mask(index: &Raster<i32>, threshold: f64, event: &Mask) -> Result<Mask> {
    if !threshold.is_finite() {
        return Err(Error::InvalidParameter {
            name: "rdndvi_threshold",
            value: threshold.to_string(),
            reason: "threshold must be finite".to_string(),
        });
    }
    index.ensure_same_grid(event, "event mask")?;

    build_mask(index, |row, col| {
        let v = unsafe { index.get_unchecked(row, col) };
        let exceeds = !is_index_nodata(index, v) && v as f64 * CHANGE_INDEX_SCALE > threshold;
        if exceeds && is_set_unchecked(event, row, col) {
            MASK_TRUE
        } else {
            MASK_FALSE
        }
    })
}

/// Pixels steeper than 3 degrees that are also set in `change_mask`.
pub fn slope_mask(slope: &Raster<f64>, change_mask: &Mask) -> Result<Mask> {
    slope.ensure_same_grid(change_mask, "change mask")?;

    build_mask(slope, |row, col| {
        let s = unsafe { slope.get_unchecked(row, col) };
        if !slope.is_nodata(s) && s > SLOPE_THRESHOLD && is_set_unchecked(change_mask, row, col) {
            MASK_TRUE
        } else {
            MASK_FALSE
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagery::{change_index, ChangeIndexParams};
    use scarmap_core::GeoTransform;

    fn on_grid<T: scarmap_core::RasterElement>(data: Vec<T>, rows: usize, cols: usize) -> Raster<T> {
        let mut r = Raster::from_vec(data, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, 100.0, 10.0, -10.0));
        r
    }

    #[test]
    fn test_water_mask() {
        let mut ndwi = on_grid(vec![0.05, 0.1, 0.11, -9999.0], 2, 2);
        ndwi.set_nodata(Some(-9999.0));
        let m = water_mask(&ndwi).unwrap();
        assert_eq!(m.data().iter().copied().collect::<Vec<_>>(), vec![1, 1, 0, 255]);
    }

    #[test]
    fn test_artificial_buffer_covers_neighbours() {
        let mut surface: Mask = on_grid(vec![0u8; 25], 5, 5);
        surface.set(2, 2, 1).unwrap();

        let m = artificial_surface_mask(&surface).unwrap().unwrap();
        // 3x3 block excluded, the rest kept
        assert_eq!(m.count_value(0), 9);
        assert_eq!(m.count_value(1), 16);
        assert_eq!(m.get(2, 0).unwrap(), 1);
        assert_eq!(m.get(1, 1).unwrap(), 0);
    }

    #[test]
    fn test_artificial_without_sources_is_skipped() {
        let mut surface: Mask = on_grid(vec![0u8, 0, 255, 0], 2, 2);
        surface.set_nodata(Some(255));
        assert!(artificial_surface_mask(&surface).unwrap().is_none());
    }

    #[test]
    fn test_change_threshold_uses_physical_units() {
        // 0.25, 0.1999, 0.3 outside event, nodata
        let index = on_grid(vec![2500, 1999, 3000, -32768], 2, 2);
        let event: Mask = on_grid(vec![1u8, 1, 0, 1], 2, 2);
        let m = change_threshold_mask(&index, 0.2, &event).unwrap();
        assert_eq!(m.data().iter().copied().collect::<Vec<_>>(), vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_threshold_on_computed_index() {
        // indices 0.7826, 0.1118, 0.4243, 0
        let pre = on_grid(vec![0.8, 0.8, 0.5, 0.3], 2, 2);
        let post = on_grid(vec![0.1, 0.7, 0.2, 0.3], 2, 2);
        let event: Mask = on_grid(vec![1u8; 4], 2, 2);

        let index = change_index(&pre, &post, ChangeIndexParams::default()).unwrap();
        let m = change_threshold_mask(&index, 0.2, &event).unwrap();
        assert_eq!(m.data().iter().copied().collect::<Vec<_>>(), vec![1, 0, 1, 0]);
    }

    #[test]
    fn test_threshold_on_scaled_integer_ndvi() {
        let pre = on_grid(vec![8000.0, 8000.0, 5000.0, 3000.0], 2, 2);
        let post = on_grid(vec![1000.0, 7000.0, 2000.0, 3000.0], 2, 2);
        let event: Mask = on_grid(vec![1u8, 1, 1, 0], 2, 2);
        let params = ChangeIndexParams {
            pre_scale: 0.0001,
            post_scale: 0.0001,
        };

        let index = change_index(&pre, &post, params).unwrap();
        let m = change_threshold_mask(&index, 0.2, &event).unwrap();
        assert_eq!(m.data().iter().copied().collect::<Vec<_>>(), vec![1, 0, 1, 0]);
    }

    #[test]
    fn test_slope_mask() {
        let slope = on_grid(vec![2.0, 3.0, 3.5, f64::NAN, 10.0, 45.0], 2, 3);
        let change: Mask = on_grid(vec![1u8, 1, 1, 1, 0, 1], 2, 3);
        let m = slope_mask(&slope, &change).unwrap();
        assert_eq!(m.data().iter().copied().collect::<Vec<_>>(), vec![0, 0, 1, 0, 0, 1]);
    }
}
