//! Statistical analysis algorithms for raster data
//!
//! - **focal**: Moving window coverage of low-vegetation pixels
//! - **zonal**: Statistics under polygon footprints

pub mod focal;
pub mod zonal;

pub use focal::{focal_coverage, FocalCoverage, FocalCoverageParams};
pub use zonal::{zone_cells, zone_values, ZoneStats};
