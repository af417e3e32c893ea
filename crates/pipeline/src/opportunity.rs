//! Future OSP opportunities
//!
//! Undeveloped land cover inside the aSFHA that is not already eligible.
//! With parcel data the opportunity is expressed per parcel; without it
//! the land-cover polygons themselves are used, minus slivers.

use crate::config::PipelineParams;
use crate::exclusion::HazardArea;
use crate::fields::{
    add_area, drop_smaller_than, weighted_share, AREA_GEO, COSP, INTERSECT_ACRES, PARCEL_FID,
    PERCENT_ASFHA,
};
use floodosp_core::{FeatureCollection, Raster, Result, SpatialOps};
use std::collections::HashMap;
use tracing::debug;

/// Output of the opportunity stage
#[derive(Debug, Clone, Default)]
pub struct Opportunities {
    /// Undeveloped land-cover polygons of the search region
    pub undeveloped: FeatureCollection,
    /// Parcels touching undeveloped land (parcel path only)
    pub future_parcels: FeatureCollection,
    /// `OSP_Opportunities` with `AREA_GEO` and `cOSP`
    pub opportunities: FeatureCollection,
    pub acres: f64,
    pub credit: f64,
}

pub struct OpportunityEngine<'a> {
    ops: &'a dyn SpatialOps,
    params: &'a PipelineParams,
}

impl<'a> OpportunityEngine<'a> {
    pub fn new(ops: &'a dyn SpatialOps, params: &'a PipelineParams) -> Self {
        Self { ops, params }
    }

    /// The aSFHA minus eligible land, or the whole aSFHA when nothing is
    /// eligible
    pub fn search_region(&self, hazard: &HazardArea, eligible: &FeatureCollection) -> Result<FeatureCollection> {
        if eligible.is_empty() {
            Ok(hazard.adjusted.clone())
        } else {
            self.ops.erase(&hazard.adjusted, eligible)
        }
    }

    /// Undeveloped land-cover cells of `region` as polygons
    pub fn undeveloped(&self, land_cover: &Raster<f64>, region: &FeatureCollection) -> Result<FeatureCollection> {
        if region.is_empty() {
            return Ok(FeatureCollection::new());
        }
        let masked = self.ops.extract_by_mask(land_cover, region)?;
        let params = self.params;
        let selected = self.ops.select_cells(&masked, &|v| params.is_undeveloped(v))?;
        self.ops.raster_to_polygons(&selected)
    }

    /// Parcels touching undeveloped land, annotated with the undeveloped
    /// acreage they hold and the share of the parcel it represents
    pub fn future_parcels(
        &self,
        parcels: &FeatureCollection,
        undeveloped: &FeatureCollection,
    ) -> Result<FeatureCollection> {
        let mut selected = self.ops.select_by_location(parcels, undeveloped)?;
        for (i, feature) in selected.iter_mut().enumerate() {
            feature.set_property(PARCEL_FID, (i + 1) as i64);
        }

        let pieces = self.ops.intersect(&selected, undeveloped)?;
        let mut inside: HashMap<i64, f64> = HashMap::new();
        for piece in pieces.iter() {
            if let Some(fid) = piece.get_f64(PARCEL_FID) {
                *inside.entry(fid as i64).or_insert(0.0) += self.ops.area_acres(&piece.polygons());
            }
        }

        add_area(self.ops, &mut selected);
        for feature in selected.iter_mut() {
            let fid = feature.get_f64(PARCEL_FID).unwrap_or(0.0) as i64;
            let shared = inside.get(&fid).copied().unwrap_or(0.0);
            let area = feature.get_f64(AREA_GEO).unwrap_or(0.0);
            feature.set_property(INTERSECT_ACRES, shared);
            feature.set_property(PERCENT_ASFHA, weighted_share(shared, area, 100.0));
        }
        Ok(selected)
    }

    pub fn evaluate(
        &self,
        hazard: &HazardArea,
        eligible: &FeatureCollection,
        land_cover: &Raster<f64>,
        boundary: &FeatureCollection,
        parcels: Option<&FeatureCollection>,
    ) -> Result<Opportunities> {
        let mut result = Opportunities::default();
        if hazard.is_empty() {
            return Ok(result);
        }

        let region = self.search_region(hazard, eligible)?;
        let undeveloped = self.undeveloped(land_cover, &region)?;

        let local_parcels = match parcels {
            Some(p) if !p.is_empty() => self.ops.clip(p, boundary)?,
            _ => FeatureCollection::new(),
        };

        let mut opportunities = if !local_parcels.is_empty() {
            let future = self.future_parcels(&local_parcels, &undeveloped)?;
            let mut clipped = self.ops.clip(&future, &undeveloped)?;
            add_area(self.ops, &mut clipped);
            result.future_parcels = future;
            clipped
        } else if !undeveloped.is_empty() {
            let mut polygons = undeveloped.clone();
            add_area(self.ops, &mut polygons);
            drop_smaller_than(polygons, self.params.min_opportunity_acres)
        } else {
            FeatureCollection::new()
        };
        debug!(
            undeveloped = undeveloped.len(),
            opportunities = opportunities.len(),
            "opportunity search"
        );

        for feature in opportunities.iter_mut() {
            let acres = feature.get_f64(AREA_GEO).unwrap_or(0.0);
            feature.set_property(COSP, weighted_share(acres, hazard.acres, self.params.osp_weight));
        }
        result.acres = opportunities.sum_field(AREA_GEO);
        result.credit = opportunities.sum_field(COSP);
        result.opportunities = opportunities;
        result.undeveloped = undeveloped;
        Ok(result)
    }
}
