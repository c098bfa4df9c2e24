//! Imagery analysis algorithms
//!
//! Change detection between pre- and post-event vegetation indices.

mod change_detection;

pub use change_detection::{
    change_index, change_index_value, decode_change_index, ChangeIndex, ChangeIndexParams,
    CHANGE_INDEX_NODATA, CHANGE_INDEX_SCALE,
};
pub(crate) use change_detection::is_index_nodata;
