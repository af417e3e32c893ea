//! Statistical sampling of rasters by polygon zones

pub mod zonal;

pub use zonal::{zonal_statistics, ZonalMean, ZonalParams, ZonalResult};
