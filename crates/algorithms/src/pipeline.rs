//! End-to-end landslide detection
//!
//! Stages run in order, each producing a new raster or mask:
//!
//! 1. change index between pre- and post-event NDVI
//! 2. validity extent, water, artificial surfaces and AOI → event mask
//! 3. change threshold and slope → raw detection
//! 4. focal coverage on the post-event NDVI
//! 5. cleanup policy, then nodata outside the valid extent
//! 6. polygonize and score

use scarmap_core::raster::{Mask, Raster, MASK_TRUE};
use scarmap_core::vector::FeatureCollection;
use scarmap_core::Result;
use tracing::{debug, info};

use crate::config::DetectionConfig;
use crate::imagery::{change_index, decode_change_index};
use crate::masking::{
    and_combine, apply_extent, artificial_surface_mask, change_threshold_mask, slope_mask,
    validity_mask, water_mask,
};
use crate::morphology::CleanupPolicy;
use crate::scoring::{summarize_polygons, ScoredPolygons, SkippedPolygon, ZonalInputs};
use crate::statistics::focal_coverage;
use crate::terrain::slope;
use crate::vector::polygonize;

/// Layer name given to the polygonized landslides
pub const LANDSLIDE_LAYER: &str = "landslides";

/// Rasters of one scene, all on the grid of `pre_ndvi`
#[derive(Debug, Clone, Copy)]
pub struct SceneInputs<'a> {
    pub pre_ndvi: &'a Raster<f64>,
    pub post_ndvi: &'a Raster<f64>,
    pub post_ndwi: &'a Raster<f64>,
    pub dem: &'a Raster<f64>,
    /// Slope in degrees; derived from `dem` when absent
    pub slope: Option<&'a Raster<f64>>,
    /// 1 on artificial surfaces
    pub artificial: Option<&'a Mask>,
    /// 1 inside the area of interest
    pub aoi: Option<&'a Mask>,
}

impl<'a> SceneInputs<'a> {
    pub fn new(
        pre_ndvi: &'a Raster<f64>,
        post_ndvi: &'a Raster<f64>,
        post_ndwi: &'a Raster<f64>,
        dem: &'a Raster<f64>,
    ) -> Self {
        Self {
            pre_ndvi,
            post_ndvi,
            post_ndwi,
            dem,
            slope: None,
            artificial: None,
            aoi: None,
        }
    }

    pub fn with_slope(mut self, slope: &'a Raster<f64>) -> Self {
        self.slope = Some(slope);
        self
    }

    pub fn with_artificial(mut self, artificial: &'a Mask) -> Self {
        self.artificial = Some(artificial);
        self
    }

    pub fn with_aoi(mut self, aoi: &'a Mask) -> Self {
        self.aoi = Some(aoi);
        self
    }

    fn ensure_aligned(&self) -> Result<()> {
        let template = self.pre_ndvi;
        template.ensure_same_grid(self.post_ndvi, "post_ndvi")?;
        template.ensure_same_grid(self.post_ndwi, "post_ndwi")?;
        template.ensure_same_grid(self.dem, "dem")?;
        if let Some(s) = self.slope {
            template.ensure_same_grid(s, "slope")?;
        }
        if let Some(a) = self.artificial {
            template.ensure_same_grid(a, "artificial")?;
        }
        if let Some(a) = self.aoi {
            template.ensure_same_grid(a, "aoi")?;
        }
        Ok(())
    }
}

/// Everything a detection run produced
#[derive(Debug, Clone)]
pub struct Detection {
    /// Stored change index (×0.0001, nodata -32768)
    pub change_index: Raster<i32>,
    /// Slope used for thresholding and scoring
    pub slope: Raster<f64>,
    /// 1 where every input is valid, 255 elsewhere
    pub validity: Mask,
    pub water: Mask,
    /// `None` when no artificial layer was given or it was empty
    pub artificial: Option<Mask>,
    pub event: Mask,
    /// Change index above threshold inside the event mask
    pub change_mask: Mask,
    /// Change mask restricted to slopes above the fixed threshold
    pub detection: Mask,
    pub focal: Mask,
    pub cleanup: CleanupPolicy,
    pub sieved: Option<Mask>,
    pub rescued: Option<Mask>,
    /// Cleaned detection with 255 outside the valid extent
    pub final_mask: Mask,
    /// Polygonized final mask, geometry only
    pub polygons: FeatureCollection,
    pub scored: ScoredPolygons,
}

impl Detection {
    pub fn skipped(&self) -> &[SkippedPolygon] {
        &self.scored.skipped
    }

    /// Scored polygons ready for export
    pub fn to_feature_collection(&self) -> FeatureCollection {
        self.scored.to_feature_collection()
    }
}

/// Runs the detection stages under one validated configuration
#[derive(Debug, Clone)]
pub struct LandslideDetector {
    config: DetectionConfig,
}

impl LandslideDetector {
    /// Fails on an invalid configuration before any raster is read.
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn detect(&self, scene: &SceneInputs<'_>) -> Result<Detection> {
        scene.ensure_aligned()?;
        let config = &self.config;
        let (rows, cols) = scene.pre_ndvi.shape();
        info!(rows, cols, "detecting landslides");

        let index = change_index(scene.pre_ndvi, scene.post_ndvi, config.change_params())?;
        let validity = validity_mask(&[scene.pre_ndvi, scene.post_ndvi, scene.post_ndwi, scene.dem])?;

        let water = water_mask(scene.post_ndwi)?;
        let artificial = match scene.artificial {
            Some(surface) => artificial_surface_mask(surface)?,
            None => None,
        };

        let mut layers: Vec<&Mask> = vec![&validity, &water];
        if let Some(aoi) = scene.aoi {
            layers.push(aoi);
        }
        if let Some(a) = artificial.as_ref() {
            layers.push(a);
        }
        let event = and_combine(&layers)?;
        debug!(valid = validity.count_set(), event = event.count_set(), "event mask");

        let slope = match scene.slope {
            Some(s) => s.clone(),
            None => slope(scene.dem)?,
        };
        let change_mask = change_threshold_mask(&index, config.rdndvi_threshold, &event)?;
        let detection = slope_mask(&slope, &change_mask)?;
        debug!(
            changed = change_mask.count_set(),
            detected = detection.count_set(),
            "raw detection"
        );

        let focal = focal_coverage(scene.post_ndvi, config.focal_params())?;

        let cleanup = CleanupPolicy::from_min_area(config.min_area, scene.pre_ndvi.pixel_area())?;
        let cleaned = cleanup.apply(&detection, &focal)?;
        let final_mask = apply_extent(&cleaned.final_mask, &validity)?;

        let mut polygons = polygonize(&final_mask, MASK_TRUE)?;
        polygons.name = Some(LANDSLIDE_LAYER.to_string());

        let rdndvi = decode_change_index(&index)?;
        let inputs = ZonalInputs {
            slope: &slope,
            elevation: scene.dem,
            rdndvi: &rdndvi,
        };
        let summaries = summarize_polygons(&polygons, &inputs, config.extra_fields, config.empty_zone)?;
        let scored = summaries.score(&config.weights)?;

        info!(
            pixels = final_mask.count_set(),
            polygons = scored.len(),
            skipped = scored.skipped.len(),
            "detection finished"
        );

        Ok(Detection {
            change_index: index,
            slope,
            validity,
            water,
            artificial,
            event,
            change_mask,
            detection,
            focal,
            cleanup,
            sieved: cleaned.sieved,
            rescued: cleaned.rescued,
            final_mask,
            polygons,
            scored,
        })
    }
}
