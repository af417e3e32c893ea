//! The geometry/raster contract the credit pipeline is written against.
//!
//! Everything the pipeline needs from a geometry engine goes through
//! [`SpatialOps`]. All operations accept empty inputs and return empty
//! outputs for them; emptiness is never an error.

use crate::crs::US_SURVEY_FOOT_M;
use crate::error::Result;
use crate::raster::Raster;
use crate::vector::{Feature, FeatureCollection};
use geo_types::MultiPolygon;
use serde::{Deserialize, Serialize};

/// Square meters per international acre
pub const SQ_METERS_PER_ACRE: f64 = 4046.8564224;

/// How polygon area is measured
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AreaMeasure {
    /// Coordinates are longitude/latitude degrees; area on the WGS84 ellipsoid
    Geodesic,
    /// Coordinates are projected; one coordinate unit is `unit_meters` meters
    Planar { unit_meters: f64 },
}

impl AreaMeasure {
    /// Planar measure in US survey feet (State Plane)
    pub fn survey_feet() -> Self {
        AreaMeasure::Planar {
            unit_meters: US_SURVEY_FOOT_M,
        }
    }

    /// Acres covered by `sq_units` squared coordinate units (planar only)
    pub fn planar_acres(&self, sq_units: f64) -> Option<f64> {
        match self {
            AreaMeasure::Planar { unit_meters } => {
                Some(sq_units * unit_meters * unit_meters / SQ_METERS_PER_ACRE)
            }
            AreaMeasure::Geodesic => None,
        }
    }
}

impl Default for AreaMeasure {
    fn default() -> Self {
        AreaMeasure::Geodesic
    }
}

/// Polygon overlay, selection, measurement and raster sampling.
///
/// Attribute handling follows the usual desktop-GIS conventions: overlay
/// outputs keep the attributes of the input layer, dissolve keeps only the
/// dissolve field.
pub trait SpatialOps: Send + Sync {
    /// Each input feature intersected with the union of `clip` features
    fn clip(&self, input: &FeatureCollection, clip: &FeatureCollection)
        -> Result<FeatureCollection>;

    /// Each input feature minus the union of `erase` features
    fn erase(
        &self,
        input: &FeatureCollection,
        erase: &FeatureCollection,
    ) -> Result<FeatureCollection>;

    /// Union features grouped by `field` (one group when `None`).
    /// Groups come out in order of first appearance; `multipart = false`
    /// splits each group into single-part features.
    fn dissolve(
        &self,
        input: &FeatureCollection,
        field: Option<&str>,
        multipart: bool,
    ) -> Result<FeatureCollection>;

    /// One feature per intersecting pair with geometry `a ∩ b`. Attributes
    /// of `a` are kept; those of `b` fill keys `a` does not have.
    fn intersect(&self, a: &FeatureCollection, b: &FeatureCollection)
        -> Result<FeatureCollection>;

    /// Multipart to singlepart
    fn explode(&self, input: &FeatureCollection) -> Result<FeatureCollection>;

    /// Features intersecting at least one selector feature
    fn select_by_location(
        &self,
        input: &FeatureCollection,
        selector: &FeatureCollection,
    ) -> Result<FeatureCollection>;

    /// Features whose attributes satisfy `predicate`
    fn select_by_attribute(
        &self,
        input: &FeatureCollection,
        predicate: &dyn Fn(&Feature) -> bool,
    ) -> FeatureCollection {
        input.filter(predicate)
    }

    /// Area in acres
    fn area_acres(&self, geometry: &MultiPolygon<f64>) -> f64;

    /// Crop to the mask extent; cells outside the mask or nodata become NaN
    fn extract_by_mask(&self, raster: &Raster<f64>, mask: &FeatureCollection)
        -> Result<Raster<f64>>;

    /// Cells failing `predicate` (or nodata) become NaN
    fn select_cells(
        &self,
        raster: &Raster<f64>,
        predicate: &(dyn Fn(f64) -> bool + Sync),
    ) -> Result<Raster<f64>>;

    /// Mean cell value per zone polygon, `None` where nothing can be sampled
    fn zonal_mean(&self, raster: &Raster<f64>, zones: &FeatureCollection)
        -> Result<Vec<Option<f64>>>;

    /// Regions of equal value as single-part polygons with field `gridcode`
    fn raster_to_polygons(&self, raster: &Raster<f64>) -> Result<FeatureCollection>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_planar_acres() {
        let unit = SQ_METERS_PER_ACRE.sqrt();
        let m = AreaMeasure::Planar { unit_meters: unit };
        assert_relative_eq!(m.planar_acres(85.0).unwrap(), 85.0, epsilon = 1e-9);
        assert!(AreaMeasure::Geodesic.planar_acres(1.0).is_none());
    }

    #[test]
    fn test_survey_feet_acre() {
        // 43560 square US survey feet per US survey acre
        let acres = AreaMeasure::survey_feet().planar_acres(43_560.0).unwrap();
        assert_relative_eq!(acres, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_measure_serde() {
        let json = serde_json::to_string(&AreaMeasure::Planar { unit_meters: 2.0 }).unwrap();
        assert_eq!(json, r#"{"kind":"planar","unit_meters":2.0}"#);
        let back: AreaMeasure = serde_json::from_str(r#"{"kind":"geodesic"}"#).unwrap();
        assert_eq!(back, AreaMeasure::Geodesic);
    }
}
