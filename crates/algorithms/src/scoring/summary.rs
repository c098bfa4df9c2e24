//! Phase 1: per-polygon zonal summaries

use geo_types::Geometry;
use scarmap_core::raster::Raster;
use scarmap_core::vector::FeatureCollection;
use scarmap_core::{Error, Result, CRS};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::maybe_rayon::*;
use crate::statistics::{zone_cells, zone_values, ZoneStats};
use crate::vector::area;

/// Rasters sampled under each polygon; all on one grid
#[derive(Debug, Clone, Copy)]
pub struct ZonalInputs<'a> {
    /// Slope in degrees
    pub slope: &'a Raster<f64>,
    /// Elevation (DEM)
    pub elevation: &'a Raster<f64>,
    /// Change index in physical units
    pub rdndvi: &'a Raster<f64>,
}

/// What to do with a polygon whose statistics are undefined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyZonePolicy {
    /// Exclude it, log a warning and report it in `skipped`
    #[default]
    Skip,
    /// Abort the run with [`Error::UndefinedStatistic`]
    Fail,
}

/// Zonal statistics of one retained polygon
#[derive(Debug, Clone)]
pub struct PolygonSummary {
    /// Position of the feature in the input collection
    pub index: usize,
    pub id: Option<String>,
    pub geometry: Geometry<f64>,
    /// Geometric area in CRS units squared
    pub area: f64,
    /// Pixels whose centre lies inside the polygon
    pub pixel_count: usize,
    pub slope: ZoneStats,
    pub elevation: ZoneStats,
    /// Mean change index (physical units)
    pub rdndvi: f64,
}

/// A polygon excluded under [`EmptyZonePolicy::Skip`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPolygon {
    /// Position of the feature in the input collection
    pub index: usize,
    /// Statistic that had no valid pixels
    pub statistic: String,
}

/// Output of phase 1, input of [`PolygonSummaries::score`](super::PolygonSummaries::score)
#[derive(Debug, Clone)]
pub struct PolygonSummaries {
    pub polygons: Vec<PolygonSummary>,
    pub skipped: Vec<SkippedPolygon>,
    pub(crate) extra_fields: bool,
    pub(crate) crs: Option<CRS>,
    pub(crate) name: Option<String>,
}

impl PolygonSummaries {
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Whether the extra statistics are exported
    pub fn extra_fields(&self) -> bool {
        self.extra_fields
    }
}

fn undefined(feature: usize, statistic: &str) -> Error {
    Error::UndefinedStatistic {
        feature,
        statistic: statistic.to_string(),
    }
}

fn summarize_one(
    index: usize,
    id: Option<String>,
    geometry: Option<&Geometry<f64>>,
    inputs: &ZonalInputs<'_>,
) -> Result<PolygonSummary> {
    let geometry = geometry.ok_or_else(|| undefined(index, "AREA"))?;
    let polygon_area = area(geometry);
    if !(polygon_area.is_finite() && polygon_area > 0.0) {
        return Err(undefined(index, "AREA"));
    }

    let cells = zone_cells(inputs.slope, geometry);

    let slope = ZoneStats::from_values(zone_values(inputs.slope, &cells))
        .ok_or_else(|| undefined(index, "Slope_mean"))?;
    let elevation = ZoneStats::from_values(zone_values(inputs.elevation, &cells))
        .ok_or_else(|| undefined(index, "Elevation_range"))?;
    let rdndvi = ZoneStats::from_values(zone_values(inputs.rdndvi, &cells))
        .ok_or_else(|| undefined(index, "RdNDVI"))?;

    Ok(PolygonSummary {
        index,
        id,
        geometry: geometry.clone(),
        area: polygon_area,
        pixel_count: cells.len(),
        slope,
        elevation,
        rdndvi: rdndvi.mean,
    })
}

/// Compute zonal summaries for every polygon.
///
/// A polygon without geometry, with non-positive area, or with no valid
/// pixel in any of the three rasters is handled according to `policy`.
///
/// # Arguments
/// * `features` - Polygons, usually from [`polygonize`](crate::vector::polygonize)
/// * `inputs` - Slope, elevation and change index rasters
/// * `extra_fields` - Export the additional slope/elevation statistics
/// * `policy` - Skip or fail on undefined statistics
pub fn summarize_polygons(
    features: &FeatureCollection,
    inputs: &ZonalInputs<'_>,
    extra_fields: bool,
    policy: EmptyZonePolicy,
) -> Result<PolygonSummaries> {
    inputs.slope.ensure_same_grid(inputs.elevation, "elevation")?;
    inputs.slope.ensure_same_grid(inputs.rdndvi, "rdndvi")?;
    if let (Some(a), Some(b)) = (inputs.slope.crs(), features.crs.as_ref())
        && !a.is_equivalent(b)
    {
        return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
    }

    let results: Vec<Result<PolygonSummary>> = (0..features.len())
        .into_par_iter()
        .map(|i| {
            let feature = &features.features[i];
            summarize_one(i, feature.id.clone(), feature.geometry.as_ref(), inputs)
        })
        .collect();

    let mut polygons = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for result in results {
        match result {
            Ok(summary) => polygons.push(summary),
            Err(Error::UndefinedStatistic { feature, statistic }) if policy == EmptyZonePolicy::Skip => {
                warn!(feature, statistic = %statistic, "no valid pixels under polygon, skipping it");
                skipped.push(SkippedPolygon {
                    index: feature,
                    statistic,
                });
            }
            Err(e) => return Err(e),
        }
    }

    debug!(retained = polygons.len(), skipped = skipped.len(), "summarized polygons");

    Ok(PolygonSummaries {
        polygons,
        skipped,
        extra_fields,
        crs: features.crs.clone().or_else(|| inputs.slope.crs().cloned()),
        name: features.name.clone(),
    })
}
