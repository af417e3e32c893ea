//! Extract by mask
//!
//! Crops a raster to the extent of a polygon layer and blanks every cell
//! whose centre lies outside the polygons.

use crate::maybe_rayon::*;
use crate::vector::bounding_box;
use floodosp_core::raster::Raster;
use floodosp_core::{Error, FeatureCollection, Result};
use geo::{Contains, MultiPolygon, Point};
use ndarray::Array2;

/// Cell window (row0, col0, rows, cols) covering a box, clamped to the grid
pub(crate) fn cell_window(
    raster: &Raster<f64>,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
) -> Option<(usize, usize, usize, usize)> {
    let gt = raster.transform();
    let (c0, r0) = gt.geo_to_pixel(min_x, max_y);
    let (c1, r1) = gt.geo_to_pixel(max_x, min_y);
    if !(c0.is_finite() && c1.is_finite() && r0.is_finite() && r1.is_finite()) {
        return None;
    }

    let clamp = |v: f64, hi: usize| v.max(0.0).min(hi as f64) as usize;
    let col0 = clamp(c0.min(c1).floor(), raster.cols());
    let col1 = clamp(c0.max(c1).ceil(), raster.cols());
    let row0 = clamp(r0.min(r1).floor(), raster.rows());
    let row1 = clamp(r0.max(r1).ceil(), raster.rows());

    (col1 > col0 && row1 > row0).then_some((row0, col0, row1 - row0, col1 - col0))
}

/// Crop `raster` to the mask extent (snapped to the cell grid). Cells whose
/// centres fall outside the mask, and no-data cells, become NaN.
///
/// An empty or non-overlapping mask yields a 0x0 raster.
pub fn extract_by_mask(raster: &Raster<f64>, mask: &FeatureCollection) -> Result<Raster<f64>> {
    let shape: MultiPolygon<f64> = mask.polygons();

    let window = bounding_box(&shape)
        .and_then(|bb| cell_window(raster, bb.min_x, bb.min_y, bb.max_x, bb.max_y));
    let Some((row0, col0, rows, cols)) = window else {
        let mut empty = raster.with_same_meta::<f64>(0, 0);
        empty.set_nodata(Some(f64::NAN));
        return Ok(empty);
    };

    let cropped = raster.window(row0, col0, rows, cols)?;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, cell) in row_data.iter_mut().enumerate() {
                let val = unsafe { cropped.get_unchecked(row, col) };
                if cropped.is_nodata(val) {
                    continue;
                }
                let (x, y) = cropped.pixel_to_geo(col, row);
                if shape.contains(&Point::new(x, y)) {
                    *cell = val;
                }
            }
            row_data
        })
        .collect();

    let mut output = cropped.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
