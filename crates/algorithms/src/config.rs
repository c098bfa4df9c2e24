//! Detection configuration and fixed thresholds

use std::path::Path;

use scarmap_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::imagery::ChangeIndexParams;
use crate::scoring::{EmptyZonePolicy, ScoringWeights};
use crate::statistics::FocalCoverageParams;

/// NDWI above which a pixel is water
pub const WATER_THRESHOLD: f64 = 0.1;

/// Slope (degrees) a detection must exceed
pub const SLOPE_THRESHOLD: f64 = 3.0;

/// Artificial-surface buffer in pixel resolutions
pub const BUFFER_MULTIPLIER: f64 = 1.5;

/// Region size (pixels) removed by the first sieve pass
pub const RESCUE_SIEVE_PIXELS: usize = 5;

/// Every tunable of a detection run.
///
/// Missing fields in a JSON document take their defaults:
///
/// ```json
/// { "kernel_size": 5, "min_area": 500.0, "weights": { "awer": 0.5 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Focal window size (odd)
    pub kernel_size: usize,
    /// Upper NDVI bound counted by the focal filter
    pub ndvi_threshold: f64,
    /// Fraction of the focal window that must be counted
    pub coverage_threshold: f64,
    /// Physical change index above which a pixel is a candidate
    pub rdndvi_threshold: f64,
    /// Minimum landslide area in CRS units squared; 0 disables cleanup
    pub min_area: f64,
    pub pre_scale: f64,
    pub post_scale: f64,
    /// Export the additional zonal statistics
    pub extra_fields: bool,
    pub weights: ScoringWeights,
    pub empty_zone: EmptyZonePolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let focal = FocalCoverageParams::default();
        let change = ChangeIndexParams::default();
        Self {
            kernel_size: focal.kernel_size,
            ndvi_threshold: focal.ndvi_threshold,
            coverage_threshold: focal.coverage_threshold,
            rdndvi_threshold: 0.2,
            min_area: 0.0,
            pre_scale: change.pre_scale,
            post_scale: change.post_scale,
            extra_fields: false,
            weights: ScoringWeights::default(),
            empty_zone: EmptyZonePolicy::Skip,
        }
    }
}

impl DetectionConfig {
    /// Parse a JSON document
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidParameter {
            name: "config",
            value: format!("line {}, column {}", e.line(), e.column()),
            reason: e.to_string(),
        })
    }

    /// Read and parse a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Other(e.to_string()))
    }

    pub fn focal_params(&self) -> FocalCoverageParams {
        FocalCoverageParams {
            kernel_size: self.kernel_size,
            ndvi_threshold: self.ndvi_threshold,
            coverage_threshold: self.coverage_threshold,
            scale: self.post_scale,
        }
    }

    pub fn change_params(&self) -> ChangeIndexParams {
        ChangeIndexParams {
            pre_scale: self.pre_scale,
            post_scale: self.post_scale,
        }
    }

    /// Check every parameter; no raster is touched.
    pub fn validate(&self) -> Result<()> {
        self.change_params().validate()?;
        self.focal_params().validate()?;
        self.weights.validate()?;

        if !self.rdndvi_threshold.is_finite() {
            return Err(Error::InvalidParameter {
                name: "rdndvi_threshold",
                value: self.rdndvi_threshold.to_string(),
                reason: "threshold must be finite".to_string(),
            });
        }
        if !self.min_area.is_finite() || self.min_area < 0.0 {
            return Err(Error::InvalidParameter {
                name: "min_area",
                value: self.min_area.to_string(),
                reason: "minimum area must be finite and non-negative".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.focal_params(), FocalCoverageParams::default());
        assert_eq!(config.kernel_size, 3);
        assert_eq!(config.ndvi_threshold, 0.3);
        assert_eq!(config.coverage_threshold, 0.3);
        assert_eq!(config.rdndvi_threshold, 0.2);
        assert_eq!(config.min_area, 0.0);
        assert_eq!(config.pre_scale, 1.0);
        assert_eq!(config.weights, ScoringWeights::default());
        assert_eq!(config.empty_zone, EmptyZonePolicy::Skip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = DetectionConfig::from_json(
            r#"{ "kernel_size": 5, "min_area": 500.0, "weights": { "awer": 0.5 }, "empty_zone": "fail" }"#,
        )
        .unwrap();
        assert_eq!(config.kernel_size, 5);
        assert_eq!(config.min_area, 500.0);
        assert_eq!(config.weights.awer, 0.5);
        assert_eq!(config.weights.area, 1.0);
        assert_eq!(config.empty_zone, EmptyZonePolicy::Fail);
        assert_eq!(config.rdndvi_threshold, 0.2);
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = DetectionConfig {
            min_area: 250.0,
            extra_fields: true,
            ..Default::default()
        };
        std::fs::write(&path, config.to_json().unwrap()).unwrap();
        assert_eq!(DetectionConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_values() {
        let even = DetectionConfig {
            kernel_size: 4,
            ..Default::default()
        };
        assert!(matches!(even.validate(), Err(Error::InvalidParameter { .. })));

        let negative = DetectionConfig {
            min_area: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let zero_scale = DetectionConfig {
            post_scale: 0.0,
            ..Default::default()
        };
        assert!(zero_scale.validate().is_err());

        assert!(DetectionConfig::from_json("{ not json").is_err());
    }
}
