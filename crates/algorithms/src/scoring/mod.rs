//! Polygon confidence scoring
//!
//! Scoring runs in two phases. [`summarize_polygons`] gathers zonal
//! statistics per polygon; [`PolygonSummaries::score`] then normalizes the
//! change index over the retained set and combines the four terms into
//! CONFIDENCE.

mod confidence;
mod summary;

pub use confidence::{
    area_term, awer, awer_term, normalized_rdndvi, slope_term, ScoredPolygon, ScoredPolygons,
    ScoringWeights,
};
pub use summary::{
    summarize_polygons, EmptyZonePolicy, PolygonSummaries, PolygonSummary, SkippedPolygon,
    ZonalInputs,
};
