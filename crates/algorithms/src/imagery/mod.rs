//! Land-cover raster selection

mod reclassify;

pub use reclassify::select_cells;
