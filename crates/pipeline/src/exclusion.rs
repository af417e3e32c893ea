//! Excluded areas and the adjusted flood hazard area (aSFHA)
//!
//! Large open water, and optionally large federal or tribal holdings, are
//! erased from the SFHA. What remains is dissolved on the hazard flag into
//! one multipart polygon per community.

use crate::config::{FieldNames, PipelineParams};
use crate::fields::{add_area, keep_larger_than, AREA_GEO, OPEN_WATER};
use crate::region::CommunityRegion;
use floodosp_core::{Feature, FeatureCollection, Result, SpatialOps};
use tracing::debug;

/// Adjusted hazard area of one community
#[derive(Debug, Clone, Default)]
pub struct HazardArea {
    /// aSFHA with `AREA_GEO`
    pub adjusted: FeatureCollection,
    /// `aSFHA_Area_Acres`; 0 when the aSFHA is empty
    pub acres: f64,
    pub excluded: FeatureCollection,
}

impl HazardArea {
    pub fn is_empty(&self) -> bool {
        self.adjusted.is_empty()
    }
}

pub struct ExclusionEngine<'a> {
    ops: &'a dyn SpatialOps,
    fields: &'a FieldNames,
    params: &'a PipelineParams,
    federal_tribal: bool,
}

fn has_code(feature: &Feature, field: &str, codes: &[i64]) -> bool {
    feature
        .get_f64(field)
        .is_some_and(|v| codes.iter().any(|&c| c as f64 == v))
}

impl<'a> ExclusionEngine<'a> {
    pub fn new(
        ops: &'a dyn SpatialOps,
        fields: &'a FieldNames,
        params: &'a PipelineParams,
        federal_tribal: bool,
    ) -> Self {
        Self {
            ops,
            fields,
            params,
            federal_tribal,
        }
    }

    /// Whitelisted hydrography types, merged and split into single parts,
    /// larger than the exclusion minimum
    pub fn open_water(&self, region: &CommunityRegion) -> Result<FeatureCollection> {
        let ftype = self.fields.feature_type.as_str();
        let mut water = self.ops.select_by_attribute(&region.hydro_waterbody, &|f| {
            has_code(f, ftype, &self.params.open_water_waterbody_types)
        });
        water.extend(self.ops.select_by_attribute(&region.hydro_area, &|f| {
            has_code(f, ftype, &self.params.open_water_area_types)
        }));
        for feature in water.iter_mut() {
            feature.set_property(OPEN_WATER, 1i64);
        }

        let mut dissolved = self.ops.dissolve(&water, Some(OPEN_WATER), false)?;
        add_area(self.ops, &mut dissolved);
        Ok(keep_larger_than(dissolved, self.params.min_exclusion_acres))
    }

    /// Federal and tribal protected areas larger than the exclusion minimum
    pub fn federal_tribal(&self, region: &CommunityRegion) -> Result<FeatureCollection> {
        let mang = self.fields.management_type.as_str();
        let selected = self.ops.select_by_attribute(&region.protected_areas, &|f| {
            f.get_text(mang)
                .is_some_and(|t| self.params.federal_tribal_types.iter().any(|c| c == t.trim()))
        });
        if selected.is_empty() {
            return Ok(selected);
        }
        let mut parts = self.ops.explode(&selected)?;
        add_area(self.ops, &mut parts);
        Ok(keep_larger_than(parts, self.params.min_exclusion_acres))
    }

    /// Union of every applicable exclusion
    pub fn excluded_areas(&self, region: &CommunityRegion) -> Result<FeatureCollection> {
        let mut excluded = self.open_water(region)?;
        if self.federal_tribal {
            let holdings = self.federal_tribal(region)?;
            debug!(
                community = %region.community_id,
                count = holdings.len(),
                "federal/tribal exclusions"
            );
            excluded.extend(holdings);
        }
        Ok(excluded)
    }

    pub fn adjusted_hazard(&self, region: &CommunityRegion) -> Result<HazardArea> {
        if region.sfha.is_empty() {
            return Ok(HazardArea::default());
        }
        let excluded = self.excluded_areas(region)?;
        let erased = self.ops.erase(&region.sfha, &excluded)?;
        let mut adjusted = self
            .ops
            .dissolve(&erased, Some(self.fields.hazard_flag.as_str()), true)?;
        add_area(self.ops, &mut adjusted);
        let acres = adjusted.sum_field(AREA_GEO);
        Ok(HazardArea {
            adjusted,
            acres,
            excluded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use floodosp_algorithms::GeoEngine;
    use floodosp_core::ops::SQ_METERS_PER_ACRE;
    use geo::Rect;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Feature {
        Feature::new(Rect::new((x0, y0), (x1, y1)).to_polygon())
    }

    fn region() -> CommunityRegion {
        let mut sfha: FeatureCollection = vec![rect(0.0, 0.0, 10.0, 10.0).with_property("SFHA_TF", "T")]
            .into_iter()
            .collect();
        let ops = GeoEngine::planar(SQ_METERS_PER_ACRE.sqrt());
        add_area(&ops, &mut sfha);
        CommunityRegion {
            community_id: "370001".into(),
            boundary: vec![rect(0.0, 0.0, 10.0, 10.0)].into_iter().collect(),
            sfha,
            sfha_acres: 100.0,
            // a 15-acre lake, a 4-acre pond and an excluded swamp type
            hydro_waterbody: vec![
                rect(0.0, 0.0, 5.0, 3.0).with_property("FType", 390i64),
                rect(6.0, 6.0, 8.0, 8.0).with_property("FType", 436i64),
                rect(0.0, 5.0, 10.0, 10.0).with_property("FType", 466i64),
            ]
            .into_iter()
            .collect(),
            hydro_area: FeatureCollection::new(),
            protected_areas: vec![
                rect(5.0, 0.0, 10.0, 5.0).with_property("Mang_Type", "FED"),
                rect(0.0, 5.0, 2.0, 7.0).with_property("Mang_Type", "TRIB"),
                rect(2.0, 5.0, 10.0, 10.0).with_property("Mang_Type", "LOC"),
            ]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn test_open_water_only() {
        let ops = GeoEngine::planar(SQ_METERS_PER_ACRE.sqrt());
        let fields = FieldNames::default();
        let params = PipelineParams::default();
        let engine = ExclusionEngine::new(&ops, &fields, &params, false);

        let water = engine.open_water(&region()).unwrap();
        assert_eq!(water.len(), 1);

        let hazard = engine.adjusted_hazard(&region()).unwrap();
        assert_eq!(hazard.adjusted.len(), 1);
        assert_relative_eq!(hazard.acres, 85.0, epsilon = 1e-9);
        assert!(hazard.acres <= region().sfha_acres);
    }

    #[test]
    fn test_federal_tribal_exclusion() {
        let ops = GeoEngine::planar(SQ_METERS_PER_ACRE.sqrt());
        let fields = FieldNames::default();
        let params = PipelineParams::default();
        let engine = ExclusionEngine::new(&ops, &fields, &params, true);

        let holdings = engine.federal_tribal(&region()).unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings.features[0].get_text("Mang_Type").as_deref(), Some("FED"));

        // lake (15 ac) and federal land (25 ac) only share an edge
        let hazard = engine.adjusted_hazard(&region()).unwrap();
        assert_relative_eq!(hazard.acres, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_sfha() {
        let ops = GeoEngine::planar(SQ_METERS_PER_ACRE.sqrt());
        let fields = FieldNames::default();
        let params = PipelineParams::default();
        let engine = ExclusionEngine::new(&ops, &fields, &params, true);
        let hazard = engine.adjusted_hazard(&CommunityRegion::default()).unwrap();
        assert!(hazard.is_empty());
        assert_eq!(hazard.acres, 0.0);
    }
}
