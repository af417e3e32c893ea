//! Raster/vector conversion: masking rasters by polygons and polygonizing
//! rasters

mod mask;
mod polygonize;

pub(crate) use mask::cell_window;
pub use mask::extract_by_mask;
pub use polygonize::{polygonize, Polygonize, PolygonizeParams};
