//! `GeoEngine`: the default [`SpatialOps`] implementation

use crate::conversion::{extract_by_mask, polygonize, PolygonizeParams};
use crate::imagery::select_cells;
use crate::statistics::{zonal_statistics, ZonalParams};
use crate::vector;
use floodosp_core::raster::Raster;
use floodosp_core::{AreaMeasure, FeatureCollection, Result, SpatialOps};
use geo::MultiPolygon;

/// Pure-Rust geometry engine built on `geo` boolean operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoEngine {
    measure: AreaMeasure,
}

impl GeoEngine {
    pub fn new(measure: AreaMeasure) -> Self {
        Self { measure }
    }

    /// Engine measuring area on the ellipsoid (lon/lat inputs)
    pub fn geodesic() -> Self {
        Self::new(AreaMeasure::Geodesic)
    }

    /// Engine measuring planar area; one coordinate unit is `unit_meters` m
    pub fn planar(unit_meters: f64) -> Self {
        Self::new(AreaMeasure::Planar { unit_meters })
    }

    pub fn measure(&self) -> AreaMeasure {
        self.measure
    }
}

impl SpatialOps for GeoEngine {
    fn clip(&self, input: &FeatureCollection, clip: &FeatureCollection) -> Result<FeatureCollection> {
        Ok(vector::clip(input, clip))
    }

    fn erase(&self, input: &FeatureCollection, erase: &FeatureCollection) -> Result<FeatureCollection> {
        Ok(vector::erase(input, erase))
    }

    fn dissolve(
        &self,
        input: &FeatureCollection,
        field: Option<&str>,
        multipart: bool,
    ) -> Result<FeatureCollection> {
        Ok(vector::dissolve(input, field, multipart))
    }

    fn intersect(&self, a: &FeatureCollection, b: &FeatureCollection) -> Result<FeatureCollection> {
        Ok(vector::intersect(a, b))
    }

    fn explode(&self, input: &FeatureCollection) -> Result<FeatureCollection> {
        Ok(vector::explode(input))
    }

    fn select_by_location(
        &self,
        input: &FeatureCollection,
        selector: &FeatureCollection,
    ) -> Result<FeatureCollection> {
        Ok(vector::select_by_location(input, selector))
    }

    fn area_acres(&self, geometry: &MultiPolygon<f64>) -> f64 {
        vector::area_acres(geometry, self.measure)
    }

    fn extract_by_mask(&self, raster: &Raster<f64>, mask: &FeatureCollection) -> Result<Raster<f64>> {
        extract_by_mask(raster, mask)
    }

    fn select_cells(
        &self,
        raster: &Raster<f64>,
        predicate: &(dyn Fn(f64) -> bool + Sync),
    ) -> Result<Raster<f64>> {
        select_cells(raster, predicate)
    }

    fn zonal_mean(&self, raster: &Raster<f64>, zones: &FeatureCollection) -> Result<Vec<Option<f64>>> {
        Ok(zonal_statistics(raster, zones, &ZonalParams::default())?
            .into_iter()
            .map(|r| r.map(|r| r.mean))
            .collect())
    }

    fn raster_to_polygons(&self, raster: &Raster<f64>) -> Result<FeatureCollection> {
        polygonize(raster, PolygonizeParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use floodosp_core::ops::SQ_METERS_PER_ACRE;
    use floodosp_core::{Feature, GeoTransform};
    use geo::Rect;

    fn engine() -> GeoEngine {
        GeoEngine::planar(SQ_METERS_PER_ACRE.sqrt())
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Feature {
        Feature::new(Rect::new((x0, y0), (x1, y1)).to_polygon())
    }

    #[test]
    fn test_engine_as_trait_object() {
        let ops: &dyn SpatialOps = &engine();
        let sfha: FeatureCollection = vec![square(0.0, 0.0, 10.0, 10.0).with_property("SFHA_TF", "T")]
            .into_iter()
            .collect();
        let water: FeatureCollection = vec![square(0.0, 0.0, 5.0, 3.0)].into_iter().collect();

        let adjusted = ops.erase(&sfha, &water).unwrap();
        let dissolved = ops.dissolve(&adjusted, Some("SFHA_TF"), true).unwrap();
        assert_eq!(dissolved.len(), 1);
        assert_relative_eq!(ops.area_acres(&dissolved.polygons()), 85.0, epsilon = 1e-9);

        let flagged = ops.select_by_attribute(&sfha, &|f| f.get_text("SFHA_TF").as_deref() == Some("T"));
        assert_eq!(flagged.len(), 1);
    }

    #[test]
    fn test_mask_select_polygonize_chain() {
        let mut cover = Raster::filled(4, 4, 41.0);
        cover.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        cover.set(0, 0, 82.0).unwrap();

        let region: FeatureCollection = vec![square(0.0, 2.0, 2.0, 4.0)].into_iter().collect();
        let e = engine();
        let masked = e.extract_by_mask(&cover, &region).unwrap();
        let undeveloped = e
            .select_cells(&masked, &|v| v > 31.0 && v != 81.0 && v != 82.0)
            .unwrap();
        let polys = e.raster_to_polygons(&undeveloped).unwrap();

        assert_eq!(polys.len(), 1);
        assert_relative_eq!(e.area_acres(&polys.polygons()), 3.0, epsilon = 1e-9);

        let means = e.zonal_mean(&cover, &region).unwrap();
        assert_relative_eq!(means[0].unwrap(), (82.0 + 3.0 * 41.0) / 4.0, epsilon = 1e-12);
    }
}
