//! Terrain analysis
//!
//! - **slope**: Horn slope in degrees

mod slope;

pub use slope::{slope, slope_with_params, Slope, SlopeParams};
