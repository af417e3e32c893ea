//! Area measurement in acres

use floodosp_core::ops::SQ_METERS_PER_ACRE;
use floodosp_core::AreaMeasure;
use geo::{Area, GeodesicArea, MultiPolygon};

/// Area of a multipolygon in acres.
///
/// Geodesic measurement treats coordinates as longitude/latitude on the
/// WGS84 ellipsoid; planar measurement scales squared CRS units by the
/// linear unit.
pub fn area_acres(geom: &MultiPolygon<f64>, measure: AreaMeasure) -> f64 {
    if geom.0.is_empty() {
        return 0.0;
    }
    match measure {
        AreaMeasure::Geodesic => geom.geodesic_area_unsigned() / SQ_METERS_PER_ACRE,
        AreaMeasure::Planar { .. } => measure
            .planar_acres(geom.unsigned_area())
            .unwrap_or(0.0),
    }
}
