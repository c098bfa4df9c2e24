//! Binary mask convention
//!
//! A mask is a `u8` raster holding 1 (pixel belongs to the set), 0 (pixel is
//! excluded) or 255 (pixel lies outside the processing extent).

use super::Raster;

/// Binary mask raster
pub type Mask = Raster<u8>;

/// Pixel belongs to the set
pub const MASK_TRUE: u8 = 1;
/// Pixel is excluded
pub const MASK_FALSE: u8 = 0;
/// Pixel is outside the processing extent
pub const MASK_NODATA: u8 = 255;

impl Raster<u8> {
    /// Whether the mask value at (row, col) is set (equals 1 and is not nodata)
    pub fn is_set(&self, row: usize, col: usize) -> bool {
        self.data()
            .get((row, col))
            .is_some_and(|&v| v == MASK_TRUE && !self.is_nodata(v))
    }

    /// Number of set pixels
    pub fn count_set(&self) -> usize {
        if self.nodata() == Some(MASK_TRUE) {
            return 0;
        }
        self.count_value(MASK_TRUE)
    }

    /// Whether every pixel holds 0, 1 or the mask's nodata value
    pub fn is_binary(&self) -> bool {
        self.data()
            .iter()
            .all(|&v| v == MASK_TRUE || v == MASK_FALSE || self.is_nodata(v))
    }
}
