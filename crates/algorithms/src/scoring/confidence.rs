//! Phase 2: confidence terms and the weighted score
//!
//! ```text
//! AreaTerm  = 1.0950 - (0.095 + 0.9032 * exp(-exp(1.4058 * (ln A - ln 6947.7772))))
//! SlopeTerm = 0.9979470 / (1 + exp(-0.7859512 * (Slope_mean - 10.9374365)))
//! AWERTerm  = tanh(sqrt(0.1 + AWER))
//! N_RdNDVI  = min(1, 3 * tanh(sqrt((RdNDVI - min) / (max - min))))
//! ```
//!
//! The RdNDVI term is normalized over the whole polygon set, so a single
//! polygon cannot be scored in isolation.

use scarmap_core::vector::{Feature, FeatureCollection};
use scarmap_core::{Error, Result, CRS};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::summary::{PolygonSummaries, PolygonSummary, SkippedPolygon};

/// Area (m²) at which the area curve has its inflection
const AREA_REFERENCE: f64 = 6947.7772;

/// Weights of the four confidence terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub area: f64,
    pub slope: f64,
    pub awer: f64,
    pub rdndvi: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            area: 1.0,
            slope: 1.0,
            awer: 1.0,
            rdndvi: 1.0,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [
            ("weights.area", self.area),
            ("weights.slope", self.slope),
            ("weights.awer", self.awer),
            ("weights.rdndvi", self.rdndvi),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidParameter {
                    name,
                    value: w.to_string(),
                    reason: "weight must be finite and non-negative".to_string(),
                });
            }
        }
        if self.total() <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "weights",
                value: format!("{self:?}"),
                reason: "at least one weight must be positive".to_string(),
            });
        }
        Ok(())
    }

    fn total(&self) -> f64 {
        self.area + self.slope + self.awer + self.rdndvi
    }
}

/// Gompertz-type curve in log-area, rising from about 0.097 to 1.0
pub fn area_term(area: f64) -> f64 {
    let x = 1.4058 * (area.ln() - AREA_REFERENCE.ln());
    1.0950 - (0.095 + 0.9032 * (-x.exp()).exp())
}

/// Logistic curve in mean slope with its midpoint near 10.94 degrees
pub fn slope_term(slope_mean: f64) -> f64 {
    0.9979470 / (1.0 + (-0.7859512 * (slope_mean - 10.9374365)).exp())
}

pub fn awer_term(awer: f64) -> f64 {
    (0.1 + awer).sqrt().tanh()
}

/// Area-weighted elevation range
pub fn awer(elevation_range: f64, area: f64) -> f64 {
    elevation_range / area.sqrt()
}

/// Normalized RdNDVI given the set's extremes; 0 when they coincide
pub fn normalized_rdndvi(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (3.0 * ((value - min) / (max - min)).sqrt().tanh()).min(1.0)
    } else {
        0.0
    }
}

/// One scored polygon with its term breakdown
#[derive(Debug, Clone)]
pub struct ScoredPolygon {
    pub summary: PolygonSummary,
    pub awer: f64,
    pub n_rdndvi: f64,
    pub area_term: f64,
    pub slope_term: f64,
    pub awer_term: f64,
    pub confidence: f64,
}

/// Output of phase 2
#[derive(Debug, Clone)]
pub struct ScoredPolygons {
    pub polygons: Vec<ScoredPolygon>,
    pub skipped: Vec<SkippedPolygon>,
    extra_fields: bool,
    crs: Option<CRS>,
    name: Option<String>,
}

impl PolygonSummaries {
    /// Score every retained polygon.
    ///
    /// Fails on invalid weights, or if a term is not finite (which valid
    /// summaries never produce).
    pub fn score(&self, weights: &ScoringWeights) -> Result<ScoredPolygons> {
        weights.validate()?;

        let (min, max) = self
            .polygons
            .iter()
            .map(|p| p.rdndvi)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        let total = weights.total();
        let mut polygons = Vec::with_capacity(self.polygons.len());

        for summary in &self.polygons {
            let awer = awer(summary.elevation.range, summary.area);
            let n_rdndvi = normalized_rdndvi(summary.rdndvi, min, max);
            let area_term = area_term(summary.area);
            let slope_term = slope_term(summary.slope.mean);
            let awer_term = awer_term(awer);

            let confidence = (weights.area * area_term
                + weights.slope * slope_term
                + weights.awer * awer_term
                + weights.rdndvi * n_rdndvi)
                / total;

            if !confidence.is_finite() || !awer.is_finite() {
                return Err(Error::UndefinedStatistic {
                    feature: summary.index,
                    statistic: "CONFIDENCE".to_string(),
                });
            }

            polygons.push(ScoredPolygon {
                summary: summary.clone(),
                awer,
                n_rdndvi,
                area_term,
                slope_term,
                awer_term,
                confidence,
            });
        }

        debug!(polygons = polygons.len(), rdndvi_min = min, rdndvi_max = max, "scored polygons");

        Ok(ScoredPolygons {
            polygons,
            skipped: self.skipped.clone(),
            extra_fields: self.extra_fields,
            crs: self.crs.clone(),
            name: self.name.clone(),
        })
    }
}

impl ScoredPolygons {
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Export as features with the scoring attributes.
    ///
    /// Always: CONFIDENCE, AREA, Slope_mean, AWER, N_RdNDVI. With extra
    /// fields also Slope_std/min/max/median, Elevation_min/max/range/mean/std
    /// and RdNDVI.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let mut collection = FeatureCollection::new();
        collection.crs = self.crs.clone();
        collection.name = self.name.clone();

        for scored in &self.polygons {
            let s = &scored.summary;
            let mut feature = Feature::new(s.geometry.clone());
            feature.id = s.id.clone();

            feature.set_property("CONFIDENCE", scored.confidence);
            feature.set_property("AREA", s.area);
            feature.set_property("Slope_mean", s.slope.mean);
            feature.set_property("AWER", scored.awer);
            feature.set_property("N_RdNDVI", scored.n_rdndvi);

            if self.extra_fields {
                feature.set_property("Slope_std", s.slope.std_dev);
                feature.set_property("Slope_min", s.slope.min);
                feature.set_property("Slope_max", s.slope.max);
                feature.set_property("Slope_median", s.slope.median);
                feature.set_property("Elevation_min", s.elevation.min);
                feature.set_property("Elevation_max", s.elevation.max);
                feature.set_property("Elevation_range", s.elevation.range);
                feature.set_property("Elevation_mean", s.elevation.mean);
                feature.set_property("Elevation_std", s.elevation.std_dev);
                feature.set_property("RdNDVI", s.rdndvi);
            }

            collection.push(feature);
        }

        collection
    }
}
