//! Polygon-to-mask burning
//!
//! A pixel is burned when its centre lies inside any feature geometry.

use scarmap_core::raster::{Mask, MASK_FALSE, MASK_NODATA, MASK_TRUE};
use scarmap_core::vector::FeatureCollection;
use scarmap_core::{Error, Raster, RasterElement, Result};
use tracing::debug;

use crate::statistics::zone_cells;

/// Burn `features` onto `template`'s grid: 1 inside, 0 outside.
///
/// Fails when the collection and the template both declare a CRS and the
/// two differ; features are never reprojected.
pub fn rasterize_mask<T: RasterElement>(features: &FeatureCollection, template: &Raster<T>) -> Result<Mask> {
    if let (Some(a), Some(b)) = (template.crs(), features.crs.as_ref())
        && !a.is_equivalent(b)
    {
        return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
    }

    let (rows, cols) = template.shape();
    let mut data = vec![MASK_FALSE; rows * cols];

    for geometry in features.iter().filter_map(|f| f.geometry.as_ref()) {
        for (row, col) in zone_cells(template, geometry) {
            data[row * cols + col] = MASK_TRUE;
        }
    }

    let mask = template.derive(data, Some(MASK_NODATA))?;
    debug!(features = features.len(), burned = mask.count_set(), "rasterized features");
    Ok(mask)
}
