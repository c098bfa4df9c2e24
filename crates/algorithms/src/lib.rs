//! # scarmap Algorithms
//!
//! Landslide detection from pre- and post-event imagery.
//!
//! ## Modules
//!
//! - **imagery**: Vegetation change index
//! - **masking**: Mask algebra and the water, artificial-surface, change and slope layers
//! - **statistics**: Focal coverage filter, zonal statistics
//! - **morphology**: Dilation, region labeling, sieve and the cleanup policy
//! - **terrain**: Slope
//! - **vector**: Polygonize, rasterize, area
//! - **scoring**: Two-phase polygon confidence scoring
//! - **pipeline**: The detection stages wired under one [`DetectionConfig`](config::DetectionConfig)

pub mod config;
pub mod imagery;
pub mod masking;
pub(crate) mod maybe_rayon;
pub mod morphology;
pub mod pipeline;
pub mod scoring;
pub mod statistics;
pub mod terrain;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::DetectionConfig;
    pub use crate::imagery::{change_index, decode_change_index, ChangeIndex, ChangeIndexParams};
    pub use crate::masking::{
        and_combine, apply_extent, artificial_surface_mask, change_threshold_mask, rescue_combine,
        slope_mask, validity_mask, water_mask,
    };
    pub use crate::morphology::{
        label_regions, sieve, CleanupPolicy, Connectivity, SieveParams, StructuringElement,
    };
    pub use crate::pipeline::{Detection, LandslideDetector, SceneInputs};
    pub use crate::scoring::{
        summarize_polygons, EmptyZonePolicy, PolygonSummaries, ScoredPolygons, ScoringWeights,
        ZonalInputs,
    };
    pub use crate::statistics::{focal_coverage, FocalCoverageParams, ZoneStats};
    pub use crate::terrain::slope;
    pub use crate::vector::{polygonize, rasterize_mask};
    pub use scarmap_core::prelude::*;
}
