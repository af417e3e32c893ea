//! Cell selection
//!
//! Keeps raster cells whose value satisfies a predicate and blanks the rest.
//! This is the "select non-developed land cover" step: a conditional
//! reclassification whose output is either the input value or no-data.

use crate::maybe_rayon::*;
use floodosp_core::raster::Raster;
use floodosp_core::{Error, Result};
use ndarray::Array2;

/// Keep cells where `predicate(value)` holds; others become NaN.
///
/// No-data cells (the raster's nodata value or NaN) are never passed to the
/// predicate and always come out as NaN. The output nodata is NaN.
pub fn select_cells<P>(raster: &Raster<f64>, predicate: P) -> Result<Raster<f64>>
where
    P: Fn(f64) -> bool + Sync,
{
    let (rows, cols) = raster.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, cell) in row_data.iter_mut().enumerate() {
                let val = unsafe { raster.get_unchecked(row, col) };
                if raster.is_nodata(val) {
                    continue;
                }
                if predicate(val) {
                    *cell = val;
                }
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
