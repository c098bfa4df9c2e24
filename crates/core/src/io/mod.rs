//! I/O operations for reading and writing geospatial data
//!
//! - GeoTIFF rasters through the native `tiff` reader/writer
//! - GeoJSON feature collections

mod geojson_io;
mod native;

pub use geojson_io::{
    feature_collection_from_geojson, feature_collection_to_geojson, read_geojson, write_geojson,
};
pub use native::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer,
    GeoTiffOptions, SampleType,
};
