//! Raster to polygon conversion
//!
//! Each horizontal run of equal-valued cells becomes a rectangle; the
//! rectangles of one value are unioned and split into connected parts.
//! NaN cells produce nothing.

use crate::vector::union_all;
use floodosp_core::raster::Raster;
use floodosp_core::vector::AttributeValue;
use floodosp_core::{Algorithm, Error, Feature, FeatureCollection, Result};
use geo::{MultiPolygon, Polygon, Rect};
use std::collections::HashMap;

/// Parameters for polygonizing a raster
#[derive(Debug, Clone)]
pub struct PolygonizeParams {
    /// Name of the attribute holding the cell value
    pub field: String,
}

impl Default for PolygonizeParams {
    fn default() -> Self {
        Self {
            field: "gridcode".to_string(),
        }
    }
}

/// Raster-to-polygon algorithm
#[derive(Debug, Clone, Default)]
pub struct Polygonize;

impl Algorithm for Polygonize {
    type Input = Raster<f64>;
    type Output = FeatureCollection;
    type Params = PolygonizeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Polygonize"
    }

    fn description(&self) -> &'static str {
        "Convert regions of equal cell value to single-part polygons"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        polygonize(&input, params)
    }
}

fn value_attribute(v: f64) -> AttributeValue {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        AttributeValue::Int(v as i64)
    } else {
        AttributeValue::Float(v)
    }
}

/// Convert a raster to polygons, one feature per connected region.
///
/// Values are emitted in ascending order so the output is deterministic.
pub fn polygonize(raster: &Raster<f64>, params: PolygonizeParams) -> Result<FeatureCollection> {
    let (rows, cols) = raster.shape();
    let gt = raster.transform();
    let mut runs: HashMap<u64, Vec<MultiPolygon<f64>>> = HashMap::new();

    for row in 0..rows {
        let mut col = 0;
        while col < cols {
            let val = unsafe { raster.get_unchecked(row, col) };
            if raster.is_nodata(val) {
                col += 1;
                continue;
            }
            let start = col;
            while col < cols && unsafe { raster.get_unchecked(row, col) } == val {
                col += 1;
            }
            let (x0, y0) = gt.pixel_to_geo_corner(start, row);
            let (x1, y1) = gt.pixel_to_geo_corner(col, row + 1);
            let cell_run: Polygon<f64> = Rect::new((x0, y0), (x1, y1)).to_polygon();
            runs.entry(val.to_bits())
                .or_default()
                .push(MultiPolygon(vec![cell_run]));
        }
    }

    let mut values: Vec<(f64, Vec<MultiPolygon<f64>>)> = runs
        .into_iter()
        .map(|(bits, parts)| (f64::from_bits(bits), parts))
        .collect();
    values.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut out = FeatureCollection::new();
    for (value, parts) in values {
        for region in union_all(parts).0 {
            out.push(Feature::new(region).with_property(params.field.as_str(), value_attribute(value)));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use floodosp_core::GeoTransform;
    use geo::Area;

    fn raster(values: Vec<f64>, rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::from_vec(values, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r.set_nodata(Some(f64::NAN));
        r
    }

    #[test]
    fn test_regions_by_value() {
        let nan = f64::NAN;
        let r = raster(
            vec![
                41.0, 41.0, nan, 90.0,
                41.0, nan, nan, 90.0,
                nan, nan, 41.0, nan,
            ],
            3,
            4,
        );
        let out = polygonize(&r, PolygonizeParams::default()).unwrap();

        // two separate 41 regions, one 90 region
        assert_eq!(out.len(), 3);
        assert_eq!(out.features[0].get_f64("gridcode"), Some(41.0));
        assert_eq!(out.features[2].get_f64("gridcode"), Some(90.0));

        let total: f64 = out.iter().map(|f| f.polygons().unsigned_area()).sum();
        assert_relative_eq!(total, 6.0, epsilon = 1e-9);
        assert_relative_eq!(out.features[2].polygons().unsigned_area(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_all_blank() {
        let r = raster(vec![f64::NAN; 4], 2, 2);
        assert!(polygonize(&r, PolygonizeParams::default()).unwrap().is_empty());
    }

    #[test]
    fn test_algorithm_trait() {
        let r = raster(vec![52.0; 4], 2, 2);
        let out = Polygonize.execute_default(r).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.features[0].get_property("gridcode"), Some(&AttributeValue::Int(52)));
    }
}
