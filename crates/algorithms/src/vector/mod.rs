//! Vector algorithms
//!
//! - Polygonize: mask regions to polygon features
//! - Rasterize: polygon features to a mask
//! - Area: geometric measurement

mod measurements;
mod polygonize;
mod rasterize;

pub use measurements::area;
pub use polygonize::polygonize;
pub use rasterize::rasterize_mask;
