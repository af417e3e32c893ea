//! # floodosp Core
//!
//! Core types, traits and I/O for the floodosp open-space credit toolkit.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS` and `Region`: State Plane coordinate systems per supported state
//! - `Feature` / `FeatureCollection`: attributed polygon layers
//! - `SpatialOps`: the overlay/raster contract the credit pipeline is written against
//! - I/O for GeoTIFF rasters and GeoJSON layers

pub mod crs;
pub mod error;
pub mod io;
pub mod ops;
pub mod raster;
pub mod vector;

pub use crs::{Region, CRS};
pub use error::{Error, Result};
pub use ops::{AreaMeasure, SpatialOps};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{Region, CRS};
    pub use crate::error::{Error, Result};
    pub use crate::ops::{AreaMeasure, SpatialOps};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Core trait for stand-alone algorithms.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
