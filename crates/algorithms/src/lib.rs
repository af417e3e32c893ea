//! # floodosp Algorithms
//!
//! The geometry engine behind the credit pipeline.
//!
//! ## Available Algorithm Categories
//!
//! - **vector**: clip, erase, dissolve, intersect, explode, selection, area in acres
//! - **conversion**: extract raster by polygon mask, raster to polygons
//! - **imagery**: land-cover cell selection
//! - **statistics**: zonal statistics over polygon zones
//!
//! [`GeoEngine`] bundles them behind the `SpatialOps` trait.

mod engine;
pub(crate) mod maybe_rayon;

pub mod conversion;
pub mod imagery;
pub mod statistics;
pub mod vector;

pub use engine::GeoEngine;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::conversion::{extract_by_mask, polygonize, Polygonize, PolygonizeParams};
    pub use crate::imagery::select_cells;
    pub use crate::statistics::{zonal_statistics, ZonalMean, ZonalParams, ZonalResult};
    pub use crate::vector::{
        area_acres, clip, dissolve, erase, explode, intersect, select_by_location, union_all,
    };
    pub use crate::GeoEngine;
    pub use floodosp_core::prelude::*;
}
