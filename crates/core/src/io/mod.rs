//! I/O for GeoTIFF rasters and GeoJSON layers

mod geojson_io;
mod native;

pub use geojson_io::{from_geojson_str, read_geojson, to_geojson_string, write_geojson};
pub use native::{read_geotiff, read_geotiff_from_buffer};
