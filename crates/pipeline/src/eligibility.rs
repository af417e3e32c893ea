//! Current OSP credit
//!
//! Protected areas inside the aSFHA are measured, filtered to the minimum
//! area the impervious raster can resolve, and reduced by their impervious
//! share. GAP status 1 and 2 land is scored separately as NFOS1 before any
//! state supplement is merged in. The consolidated set is clipped to the
//! aSFHA again to give `OSP_Eligible`.

use crate::config::{FieldNames, PipelineParams};
use crate::exclusion::HazardArea;
use crate::fields::{
    measured_at_least, weighted_share, ANFOS1, AOSP, AREA_GEO, CNFOS1, COSP, IMPERVIOUS_ACRES, NFOS1,
    OSP_ID, PCT_IMPERVIOUS,
};
use crate::plan::Supplement;
use crate::region::CommunityRegion;
use floodosp_core::{FeatureCollection, Raster, Result, SpatialOps};
use tracing::debug;

/// Optional state layers merged into the eligible set
#[derive(Debug, Clone, Copy, Default)]
pub struct StateLayers<'a> {
    pub easements: Option<&'a FeatureCollection>,
    pub resource_protection: Option<&'a FeatureCollection>,
}

/// Output of the eligibility stage
#[derive(Debug, Clone, Default)]
pub struct Eligibility {
    /// Protected areas flagged NFOS1
    pub nfos1: FeatureCollection,
    /// Final `OSP_Eligible` layer
    pub eligible: FeatureCollection,
    pub nfos_acres: f64,
    pub nfos_credit: f64,
    pub osp_acres: f64,
    pub osp_credit: f64,
}

pub struct EligibilityEngine<'a> {
    ops: &'a dyn SpatialOps,
    fields: &'a FieldNames,
    params: &'a PipelineParams,
}

impl<'a> EligibilityEngine<'a> {
    pub fn new(ops: &'a dyn SpatialOps, fields: &'a FieldNames, params: &'a PipelineParams) -> Self {
        Self { ops, fields, params }
    }

    /// Write `NLCD_MEAN_PctImperv`, `Imperv_acres` and `aOSP` to every
    /// feature. Features must already carry `AREA_GEO`.
    ///
    /// A zone the raster cannot sample counts as fully pervious.
    pub fn adjust_for_impervious(&self, layer: &mut FeatureCollection, impervious: &Raster<f64>) -> Result<()> {
        let means = self.ops.zonal_mean(impervious, layer)?;
        for (feature, mean) in layer.iter_mut().zip(means) {
            let pct = mean.unwrap_or(0.0).clamp(0.0, 100.0);
            let area = feature.get_f64(AREA_GEO).unwrap_or(0.0);
            let impervious_acres = pct / 100.0 * area;
            feature.set_property(PCT_IMPERVIOUS, pct);
            feature.set_property(IMPERVIOUS_ACRES, impervious_acres);
            feature.set_property(AOSP, area - impervious_acres);
        }
        Ok(())
    }

    fn is_natural(&self, gap: Option<String>) -> bool {
        gap.is_some_and(|g| self.params.natural_gap_codes.iter().any(|c| c == g.trim()))
    }

    /// Flag GAP 1/2 polygons and credit them. Returns the flagged subset
    /// and the acre and credit sums over it.
    pub fn score_natural(&self, protected: &mut FeatureCollection, asfha_acres: f64) -> (FeatureCollection, f64, f64) {
        let gap = self.fields.gap_status.as_str();
        if !protected.iter().any(|f| self.is_natural(f.get_text(gap))) {
            return (FeatureCollection::new(), 0.0, 0.0);
        }

        let mut flagged = FeatureCollection::new();
        for feature in protected.iter_mut() {
            if self.is_natural(feature.get_text(gap)) {
                let acres = feature.get_f64(AOSP).unwrap_or(0.0);
                feature.set_property(NFOS1, 1i64);
                feature.set_property(ANFOS1, acres);
                feature.set_property(CNFOS1, weighted_share(acres, asfha_acres, self.params.nfos1_weight));
                flagged.push(feature.clone());
            } else {
                feature.set_property(NFOS1, 0i64);
                feature.set_property(CNFOS1, 0.0);
            }
        }
        let acres = flagged.sum_field(ANFOS1);
        let credit = flagged.sum_field(CNFOS1);
        (flagged, acres, credit)
    }

    /// Consolidate protected areas per the supplement rule
    pub fn consolidate(
        &self,
        protected: &FeatureCollection,
        boundary: &FeatureCollection,
        supplement: Supplement,
        state: StateLayers<'_>,
    ) -> Result<FeatureCollection> {
        let mut merged = self.ops.dissolve(protected, Some(OSP_ID), true)?;
        let Supplement::Virginia { easements, rpa } = supplement else {
            return Ok(merged);
        };

        let additions = [
            (easements, state.easements, "DCR"),
            (rpa, state.resource_protection, "RPA"),
        ];
        for (enabled, layer, prefix) in additions {
            let Some(layer) = layer.filter(|_| enabled) else {
                continue;
            };
            let local = self.ops.clip(layer, boundary)?;
            let mut uncovered = self.ops.erase(&local, &merged)?;
            for (i, feature) in uncovered.iter_mut().enumerate() {
                feature.set_property(OSP_ID, format!("{}_{}", prefix, i + 1));
            }
            debug!(prefix, count = uncovered.len(), "state protected areas added");
            merged.extend(uncovered);
        }
        Ok(merged)
    }

    pub fn evaluate(
        &self,
        region: &CommunityRegion,
        hazard: &HazardArea,
        impervious: &Raster<f64>,
        supplement: Supplement,
        state: StateLayers<'_>,
    ) -> Result<Eligibility> {
        let mut result = Eligibility::default();
        let min_acres = self.params.min_eligible_acres;

        let clipped = self.ops.clip(&region.protected_areas, &hazard.adjusted)?;
        let mut protected = measured_at_least(self.ops, clipped, min_acres)?;

        let mut masked: Option<Raster<f64>> = None;
        if !protected.is_empty() {
            let raster = self.ops.extract_by_mask(impervious, &region.boundary)?;
            self.adjust_for_impervious(&mut protected, &raster)?;
            let (nfos1, acres, credit) = self.score_natural(&mut protected, hazard.acres);
            result.nfos1 = nfos1;
            result.nfos_acres = acres;
            result.nfos_credit = credit;
            masked = Some(raster);
        }

        let consolidated = self.consolidate(&protected, &region.boundary, supplement, state)?;
        let clipped = self.ops.clip(&consolidated, &hazard.adjusted)?;
        let mut eligible = measured_at_least(self.ops, clipped, min_acres)?;

        if !eligible.is_empty() {
            let raster = match masked {
                Some(r) => r,
                None => self.ops.extract_by_mask(impervious, &region.boundary)?,
            };
            self.adjust_for_impervious(&mut eligible, &raster)?;
            for feature in eligible.iter_mut() {
                let acres = feature.get_f64(AOSP).unwrap_or(0.0);
                feature.set_property(COSP, weighted_share(acres, hazard.acres, self.params.osp_weight));
            }
            result.osp_acres = eligible.sum_field(AOSP);
            result.osp_credit = eligible.sum_field(COSP);
        }
        result.eligible = eligible;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::add_area;
    use approx::assert_relative_eq;
    use floodosp_algorithms::GeoEngine;
    use floodosp_core::ops::SQ_METERS_PER_ACRE;
    use floodosp_core::{Feature, GeoTransform};
    use geo::Rect;

    fn ops() -> GeoEngine {
        GeoEngine::planar(SQ_METERS_PER_ACRE.sqrt())
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Feature {
        Feature::new(Rect::new((x0, y0), (x1, y1)).to_polygon())
    }

    fn layer(features: Vec<Feature>) -> FeatureCollection {
        features.into_iter().collect()
    }

    /// 10x10 grid, 20 % impervious in the bottom-left 2x5 block, 0 elsewhere
    fn impervious() -> Raster<f64> {
        let mut r = Raster::filled(10, 10, 0.0);
        r.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        for row in 5..10 {
            for col in 0..2 {
                r.set(row, col, 20.0).unwrap();
            }
        }
        r
    }

    fn hazard() -> HazardArea {
        let mut adjusted = layer(vec![rect(0.0, 0.0, 10.0, 10.0).with_property("SFHA_TF", "T")]);
        add_area(&ops(), &mut adjusted);
        HazardArea {
            adjusted,
            acres: 100.0,
            excluded: FeatureCollection::new(),
        }
    }

    fn region(protected: Vec<Feature>) -> CommunityRegion {
        CommunityRegion {
            community_id: "510001".into(),
            boundary: layer(vec![rect(0.0, 0.0, 10.0, 10.0)]),
            protected_areas: layer(protected),
            ..Default::default()
        }
    }

    #[test]
    fn test_impervious_adjustment_and_credit() {
        let ops = ops();
        let fields = FieldNames::default();
        let params = PipelineParams::default();
        let engine = EligibilityEngine::new(&ops, &fields, &params);

        let region = region(vec![
            rect(0.0, 0.0, 2.0, 5.0).with_property("OSP_ID", "PADUS_1").with_property("GAP_Sts", "2"),
            rect(5.0, 5.0, 5.5, 5.5).with_property("OSP_ID", "PADUS_2"),
        ]);
        let out = engine
            .evaluate(&region, &hazard(), &impervious(), Supplement::DissolveOnly, StateLayers::default())
            .unwrap();

        // the 0.25-acre polygon is below the sampling threshold
        assert_eq!(out.eligible.len(), 1);
        let f = &out.eligible.features[0];
        assert_relative_eq!(f.get_f64(PCT_IMPERVIOUS).unwrap(), 20.0, epsilon = 1e-9);
        assert_relative_eq!(f.get_f64(IMPERVIOUS_ACRES).unwrap(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(out.osp_acres, 8.0, epsilon = 1e-9);
        assert_relative_eq!(out.osp_credit, 8.0 / 100.0 * 1450.0, epsilon = 1e-9);

        assert_eq!(out.nfos1.len(), 1);
        assert_relative_eq!(out.nfos_acres, 8.0, epsilon = 1e-9);
        assert_relative_eq!(out.nfos_credit, 8.0 / 100.0 * 190.0, epsilon = 1e-9);
        assert!(f.get_f64(AOSP).unwrap() <= f.get_f64(AREA_GEO).unwrap());
    }

    #[test]
    fn test_gap_status_numeric_and_unflagged() {
        let ops = ops();
        let fields = FieldNames::default();
        let params = PipelineParams::default();
        let engine = EligibilityEngine::new(&ops, &fields, &params);

        let mut protected = layer(vec![
            rect(0.0, 0.0, 1.0, 1.0).with_property("GAP_Sts", 1i64).with_property(AOSP, 1.0),
            rect(1.0, 0.0, 2.0, 1.0).with_property("GAP_Sts", "3").with_property(AOSP, 1.0),
        ]);
        let (flagged, acres, credit) = engine.score_natural(&mut protected, 10.0);
        assert_eq!(flagged.len(), 1);
        assert_eq!(acres, 1.0);
        assert_relative_eq!(credit, 19.0, epsilon = 1e-12);
        assert_eq!(protected.features[1].get_f64(NFOS1), Some(0.0));
        assert_eq!(protected.features[1].get_f64(CNFOS1), Some(0.0));

        let mut none = layer(vec![rect(0.0, 0.0, 1.0, 1.0).with_property("GAP_Sts", "4")]);
        let (flagged, acres, credit) = engine.score_natural(&mut none, 10.0);
        assert!(flagged.is_empty());
        assert_eq!((acres, credit), (0.0, 0.0));
        assert!(none.features[0].get_property(NFOS1).is_none());
    }

    #[test]
    fn test_virginia_supplements() {
        let ops = ops();
        let fields = FieldNames::default();
        let params = PipelineParams::default();
        let engine = EligibilityEngine::new(&ops, &fields, &params);

        let protected = layer(vec![
            rect(0.0, 0.0, 4.0, 4.0).with_property(OSP_ID, "PADUS_1"),
            rect(2.0, 2.0, 5.0, 5.0).with_property(OSP_ID, "PADUS_1"),
        ]);
        let boundary = layer(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let easements = layer(vec![rect(0.0, 0.0, 8.0, 4.0)]);
        let rpa = layer(vec![rect(0.0, 0.0, 10.0, 6.0)]);
        let state = StateLayers {
            easements: Some(&easements),
            resource_protection: Some(&rpa),
        };

        let dissolve_only = engine
            .consolidate(&protected, &boundary, Supplement::DissolveOnly, state)
            .unwrap();
        assert_eq!(dissolve_only.len(), 1);
        let base = ops.area_acres(&dissolve_only.polygons());
        assert_relative_eq!(base, 16.0 + 9.0 - 4.0, epsilon = 1e-9);

        let without_rpa = engine
            .consolidate(&protected, &boundary, Supplement::Virginia { easements: true, rpa: false }, state)
            .unwrap();
        // the easement loses the 18 acres already protected
        assert_eq!(without_rpa.features[1].get_text(OSP_ID).as_deref(), Some("DCR_1"));
        assert_relative_eq!(ops.area_acres(&without_rpa.polygons()), base + 14.0, epsilon = 1e-9);

        let with_rpa = engine
            .consolidate(&protected, &boundary, Supplement::Virginia { easements: true, rpa: true }, state)
            .unwrap();
        assert_relative_eq!(ops.area_acres(&with_rpa.polygons()), 60.0, epsilon = 1e-9);
        assert!(with_rpa.iter().any(|f| f.get_text(OSP_ID).as_deref() == Some("RPA_1")));
    }

    #[test]
    fn test_no_protected_areas() {
        let ops = ops();
        let fields = FieldNames::default();
        let params = PipelineParams::default();
        let engine = EligibilityEngine::new(&ops, &fields, &params);
        let out = engine
            .evaluate(&region(vec![]), &hazard(), &impervious(), Supplement::DissolveOnly, StateLayers::default())
            .unwrap();
        assert!(out.eligible.is_empty());
        assert_eq!((out.osp_acres, out.osp_credit, out.nfos_acres, out.nfos_credit), (0.0, 0.0, 0.0, 0.0));
    }
}
