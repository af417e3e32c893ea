//! Attribute names written to output layers, and the small helpers that
//! fill them

use floodosp_core::{FeatureCollection, Result, SpatialOps};

pub const AREA_GEO: &str = "AREA_GEO";
pub const OSP_ID: &str = "OSP_ID";
pub const OPEN_WATER: &str = "Open_Water";
pub const PCT_IMPERVIOUS: &str = "NLCD_MEAN_PctImperv";
pub const IMPERVIOUS_ACRES: &str = "Imperv_acres";
pub const AOSP: &str = "aOSP";
pub const COSP: &str = "cOSP";
pub const NFOS1: &str = "NFOS1";
pub const ANFOS1: &str = "aNFOS1";
pub const CNFOS1: &str = "cNFOS1";
pub const PARCEL_FID: &str = "PARCEL_FID";
pub const INTERSECT_ACRES: &str = "intersect_area_acres";
pub const PERCENT_ASFHA: &str = "Percent_aSFHA";

/// `acres / basis * weight`, or 0 when the basis is not positive
pub fn weighted_share(acres: f64, basis: f64, weight: f64) -> f64 {
    if basis > 0.0 {
        acres / basis * weight
    } else {
        0.0
    }
}

/// Write each feature's area in acres to `AREA_GEO`
pub(crate) fn add_area(ops: &dyn SpatialOps, layer: &mut FeatureCollection) {
    for feature in layer.iter_mut() {
        let acres = ops.area_acres(&feature.polygons());
        feature.set_property(AREA_GEO, acres);
    }
}

/// Features whose `AREA_GEO` is at least `min_acres`
pub(crate) fn drop_smaller_than(layer: FeatureCollection, min_acres: f64) -> FeatureCollection {
    layer
        .into_iter()
        .filter(|f| f.get_f64(AREA_GEO).is_some_and(|a| a >= min_acres))
        .collect()
}

/// Features whose `AREA_GEO` is strictly greater than `acres`
pub(crate) fn keep_larger_than(layer: FeatureCollection, acres: f64) -> FeatureCollection {
    layer
        .into_iter()
        .filter(|f| f.get_f64(AREA_GEO).is_some_and(|a| a > acres))
        .collect()
}

/// Measure, then drop features below `min_acres`
pub(crate) fn measured_at_least(
    ops: &dyn SpatialOps,
    mut layer: FeatureCollection,
    min_acres: f64,
) -> Result<FeatureCollection> {
    add_area(ops, &mut layer);
    Ok(drop_smaller_than(layer, min_acres))
}
