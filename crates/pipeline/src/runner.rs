//! Per-community orchestration
//!
//! Each community walks the stages in order and always ends with a
//! recorded result row. A stage that comes up empty just feeds zeros
//! forward; an engine error is logged and counted, and the row keeps the
//! hazard acreage computed before the failure with every later column zero.
//! Nothing computed for one community is visible to the next except the
//! aggregate layers and the result table in the [`Workspace`].

use crate::config::{CommunitySelection, RunConfig};
use crate::credit::{CreditCalculator, CreditInputs, CreditWeights};
use crate::eligibility::{EligibilityEngine, StateLayers};
use crate::error::{PipelineError, Result};
use crate::exclusion::ExclusionEngine;
use crate::inputs::Datasets;
use crate::opportunity::OpportunityEngine;
use crate::plan::StagePlan;
use crate::region::RegionExtractor;
use crate::result::CommunityResult;
use crate::workspace::{LayerRole, Workspace, HAZARD_COPY};
use floodosp_core::{FeatureCollection, SpatialOps};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Progress of one community through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Init,
    BoundaryExtracted,
    HazardComputed,
    EligibilityComputed,
    OpportunityComputed,
    ResultRecorded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::BoundaryExtracted => "boundary extracted",
            Stage::HazardComputed => "hazard computed",
            Stage::EligibilityComputed => "eligibility computed",
            Stage::OpportunityComputed => "opportunity computed",
            Stage::ResultRecorded => "result recorded",
        };
        f.write_str(name)
    }
}

/// Everything one community contributes to the workspace
#[derive(Debug, Clone)]
pub struct CommunityOutput {
    pub result: CommunityResult,
    pub layers: Vec<(LayerRole, FeatureCollection)>,
    /// Last stage completed before the result was recorded
    pub reached: Stage,
    pub error: Option<String>,
    pub elapsed: Duration,
}

/// Outcome of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub communities: usize,
    /// Communities whose credit columns were zeroed after an engine error
    pub failed: Vec<String>,
    pub elapsed: Duration,
}

pub struct CommunityRunner<'a> {
    config: &'a RunConfig,
    datasets: &'a Datasets,
    ops: &'a dyn SpatialOps,
    plan: StagePlan,
}

impl<'a> CommunityRunner<'a> {
    pub fn new(config: &'a RunConfig, datasets: &'a Datasets, ops: &'a dyn SpatialOps) -> Self {
        let plan = StagePlan::resolve(config, datasets);
        debug!(?plan, "stage plan");
        Self {
            config,
            datasets,
            ops,
            plan,
        }
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// Community IDs to process, in order
    pub fn community_ids(&self) -> Result<Vec<String>> {
        let field = self.config.fields.community_id.as_str();
        match &self.config.communities {
            CommunitySelection::One(id) => {
                let id = id.trim().to_string();
                if !self.datasets.community_ids(field).contains(&id) {
                    warn!(community = %id, "community not found in the hazard-boundary layer");
                }
                Ok(vec![id])
            }
            CommunitySelection::All => {
                let ids = self.datasets.community_ids(field);
                if ids.is_empty() {
                    return Err(PipelineError::NoCommunities);
                }
                Ok(ids)
            }
        }
    }

    fn compute(
        &self,
        community_id: &str,
        reached: &mut Stage,
        row: &mut CommunityResult,
        layers: &mut Vec<(LayerRole, FeatureCollection)>,
    ) -> floodosp_core::Result<()> {
        let fields = &self.config.fields;
        let params = &self.config.params;

        let region = RegionExtractor::new(self.ops, fields, self.plan.id_prefix)
            .extract(community_id, self.datasets)?;
        *reached = Stage::BoundaryExtracted;
        row.sfha_acres = region.sfha_acres;
        debug!(community = community_id, stage = %reached, sfha_acres = region.sfha_acres);
        if region.is_empty() {
            warn!(community = community_id, "no hazard polygons for community");
        }
        layers.push((LayerRole::Sfha, region.sfha.clone()));

        let hazard = ExclusionEngine::new(self.ops, fields, params, self.plan.federal_tribal_exclusion)
            .adjusted_hazard(&region)?;
        *reached = Stage::HazardComputed;
        row.asfha_acres = hazard.acres;
        debug!(community = community_id, stage = %reached, asfha_acres = hazard.acres);
        if hazard.is_empty() && !region.is_empty() {
            warn!(community = community_id, "adjusted hazard area is empty");
        }
        layers.push((LayerRole::AdjustedSfha, hazard.adjusted.clone()));

        let state = StateLayers {
            easements: self.datasets.state_easements.as_ref(),
            resource_protection: self.datasets.resource_protection.as_ref(),
        };
        let eligibility = EligibilityEngine::new(self.ops, fields, params).evaluate(
            &region,
            &hazard,
            &self.datasets.impervious,
            self.plan.supplement_for(community_id),
            state,
        )?;
        *reached = Stage::EligibilityComputed;
        debug!(
            community = community_id,
            stage = %reached,
            eligible = eligibility.eligible.len(),
            osp_acres = eligibility.osp_acres
        );

        let parcels = if self.plan.parcels {
            self.datasets.parcels.as_ref()
        } else {
            None
        };
        let opportunities = OpportunityEngine::new(self.ops, params).evaluate(
            &hazard,
            &eligibility.eligible,
            &self.datasets.land_cover,
            &region.boundary,
            parcels,
        )?;
        *reached = Stage::OpportunityComputed;
        debug!(
            community = community_id,
            stage = %reached,
            opportunity_acres = opportunities.acres
        );

        let inputs = CreditInputs {
            osp_acres: eligibility.osp_acres,
            osp_credit: eligibility.osp_credit,
            nfos_acres: eligibility.nfos_acres,
            nfos_credit: eligibility.nfos_credit,
            opportunity_acres: opportunities.acres,
            opportunity_credit: opportunities.credit,
            asfha_acres: hazard.acres,
        };
        let weights = CreditWeights {
            nfos1: params.nfos1_weight,
            nfos2: params.nfos2_weight,
        };
        let totals = CreditCalculator::compute(&inputs, &weights);

        if !eligibility.nfos1.is_empty() {
            layers.push((LayerRole::Nfos1, eligibility.nfos1));
        }
        layers.push((LayerRole::OspEligible, eligibility.eligible));
        if !opportunities.future_parcels.is_empty() {
            layers.push((LayerRole::FutureOspParcels, opportunities.future_parcels));
        }
        layers.push((LayerRole::OspOpportunities, opportunities.opportunities));

        *row = CommunityResult::new(community_id, region.sfha_acres, &inputs, &totals);
        Ok(())
    }

    /// Run every stage for one community. Never fails: after an engine
    /// error the row keeps `SFHA`/`aSFHA` from the stages that finished,
    /// the credit columns stay zero and no layers are recorded.
    pub fn process(&self, community_id: &str) -> CommunityOutput {
        let start = Instant::now();
        let mut reached = Stage::Init;
        let mut result = CommunityResult::zeroed(community_id);
        let mut layers = Vec::new();

        let error = match self.compute(community_id, &mut reached, &mut result, &mut layers) {
            Ok(()) => None,
            Err(e) => {
                warn!(community = community_id, stage = %reached, error = %e, "community failed, recording zero credits");
                layers.clear();
                Some(e.to_string())
            }
        };

        let elapsed = start.elapsed();
        info!(community = community_id, ?elapsed, "community processed");
        CommunityOutput {
            result,
            layers,
            reached,
            error,
            elapsed,
        }
    }

    fn apply(&self, workspace: &mut Workspace, output: CommunityOutput, summary: &mut RunSummary) {
        let id = output.result.community_id.clone();
        for (role, layer) in output.layers {
            workspace.add_community_layer(&id, role, layer);
        }
        workspace.record(output.result, &self.config.fields.community_id);
        debug!(community = %id, stage = %Stage::ResultRecorded);
        if output.error.is_some() {
            summary.failed.push(id);
        }
        summary.communities += 1;
    }

    fn prepare(&self, workspace: &mut Workspace) -> Result<Vec<String>> {
        let ids = self.community_ids()?;
        if workspace.layer(HAZARD_COPY).is_none() {
            workspace.init_hazard_copy(&self.datasets.hazard_boundary);
        }
        info!(
            region = %self.config.region,
            communities = ids.len(),
            "starting open space credit run"
        );
        Ok(ids)
    }

    /// Process communities one after another
    pub fn run(&self, workspace: &mut Workspace) -> Result<RunSummary> {
        self.run_with(workspace, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_done` after each community is
    /// recorded
    pub fn run_with<F>(&self, workspace: &mut Workspace, mut on_done: F) -> Result<RunSummary>
    where
        F: FnMut(&CommunityResult),
    {
        let start = Instant::now();
        let ids = self.prepare(workspace)?;
        let mut summary = RunSummary::default();
        for id in &ids {
            let output = self.process(id);
            on_done(&output.result);
            self.apply(workspace, output, &mut summary);
        }
        summary.elapsed = start.elapsed();
        Ok(summary)
    }

    /// Compute communities on the rayon pool, then record them in input
    /// order, so the workspace matches a sequential run
    #[cfg(feature = "parallel")]
    pub fn run_parallel(&self, workspace: &mut Workspace) -> Result<RunSummary> {
        use rayon::prelude::*;

        let start = Instant::now();
        let ids = self.prepare(workspace)?;
        let outputs: Vec<CommunityOutput> = ids.par_iter().map(|id| self.process(id)).collect();

        let mut summary = RunSummary::default();
        for output in outputs {
            self.apply(workspace, output, &mut summary);
        }
        summary.elapsed = start.elapsed();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CoordinateSpace, DatasetPaths, FieldNames, PipelineParams, ProtectedAreasSource};
    use floodosp_algorithms::GeoEngine;
    use floodosp_core::ops::SQ_METERS_PER_ACRE;
    use floodosp_core::{Feature, GeoTransform, Raster, Region};
    use geo::{MultiPolygon, Rect};
    use std::path::PathBuf;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Feature {
        Feature::new(Rect::new((x0, y0), (x1, y1)).to_polygon())
    }

    fn config(communities: CommunitySelection) -> RunConfig {
        RunConfig {
            region: Region::NorthCarolina,
            communities,
            workspace: PathBuf::from("out"),
            datasets: DatasetPaths {
                hazard_boundary: PathBuf::new(),
                flood_hazard: PathBuf::new(),
                hydro_area: PathBuf::new(),
                hydro_waterbody: PathBuf::new(),
                impervious: PathBuf::new(),
                land_cover: PathBuf::new(),
                protected_areas: PathBuf::new(),
                parcels: None,
                state_easements: None,
                resource_protection: None,
            },
            protected_source: ProtectedAreasSource::Custom,
            coordinate_space: CoordinateSpace::StatePlane,
            fields: FieldNames::default(),
            params: PipelineParams::default(),
        }
    }

    fn datasets() -> Datasets {
        let hazard: FeatureCollection = vec![
            rect(0.0, 0.0, 10.0, 10.0).with_property("CID", "370001").with_property("SFHA_TF", "T"),
            rect(20.0, 0.0, 30.0, 10.0).with_property("CID", "370002").with_property("SFHA_TF", "F"),
        ]
        .into_iter()
        .collect();
        let mut cover = Raster::filled(10, 30, 41.0);
        cover.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        let mut impervious = Raster::filled(10, 30, 0.0);
        impervious.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        Datasets {
            hazard_boundary: hazard.clone(),
            flood_hazard: hazard,
            land_cover: cover,
            impervious,
            protected_areas: vec![rect(0.0, 0.0, 2.0, 2.0)].into_iter().collect(),
            ..Default::default()
        }
    }

    /// Delegates to `GeoEngine` but fails every overlay intersection
    struct FailingIntersect(GeoEngine);

    impl SpatialOps for FailingIntersect {
        fn clip(&self, input: &FeatureCollection, clip: &FeatureCollection) -> floodosp_core::Result<FeatureCollection> {
            self.0.clip(input, clip)
        }

        fn erase(&self, input: &FeatureCollection, erase: &FeatureCollection) -> floodosp_core::Result<FeatureCollection> {
            self.0.erase(input, erase)
        }

        fn dissolve(
            &self,
            input: &FeatureCollection,
            field: Option<&str>,
            multipart: bool,
        ) -> floodosp_core::Result<FeatureCollection> {
            self.0.dissolve(input, field, multipart)
        }

        fn intersect(&self, _a: &FeatureCollection, _b: &FeatureCollection) -> floodosp_core::Result<FeatureCollection> {
            Err(floodosp_core::Error::Algorithm("intersect failed".into()))
        }

        fn explode(&self, input: &FeatureCollection) -> floodosp_core::Result<FeatureCollection> {
            self.0.explode(input)
        }

        fn select_by_location(
            &self,
            input: &FeatureCollection,
            selector: &FeatureCollection,
        ) -> floodosp_core::Result<FeatureCollection> {
            self.0.select_by_location(input, selector)
        }

        fn area_acres(&self, geometry: &MultiPolygon<f64>) -> f64 {
            self.0.area_acres(geometry)
        }

        fn extract_by_mask(&self, raster: &Raster<f64>, mask: &FeatureCollection) -> floodosp_core::Result<Raster<f64>> {
            self.0.extract_by_mask(raster, mask)
        }

        fn select_cells(
            &self,
            raster: &Raster<f64>,
            predicate: &(dyn Fn(f64) -> bool + Sync),
        ) -> floodosp_core::Result<Raster<f64>> {
            self.0.select_cells(raster, predicate)
        }

        fn zonal_mean(&self, raster: &Raster<f64>, zones: &FeatureCollection) -> floodosp_core::Result<Vec<Option<f64>>> {
            self.0.zonal_mean(raster, zones)
        }

        fn raster_to_polygons(&self, raster: &Raster<f64>) -> floodosp_core::Result<FeatureCollection> {
            self.0.raster_to_polygons(raster)
        }
    }

    #[test]
    fn test_community_ids() {
        let data = datasets();
        let ops = GeoEngine::planar(SQ_METERS_PER_ACRE.sqrt());
        let cfg = config(CommunitySelection::All);
        let runner = CommunityRunner::new(&cfg, &data, &ops);
        assert_eq!(runner.community_ids().unwrap(), vec!["370001", "370002"]);

        let cfg = config(CommunitySelection::One(" 999 ".into()));
        let runner = CommunityRunner::new(&cfg, &data, &ops);
        assert_eq!(runner.community_ids().unwrap(), vec!["999"]);

        let empty = Datasets::default();
        let cfg = config(CommunitySelection::All);
        let runner = CommunityRunner::new(&cfg, &empty, &ops);
        assert!(matches!(runner.community_ids(), Err(PipelineError::NoCommunities)));
    }

    #[test]
    fn test_process_reaches_every_stage() {
        let data = datasets();
        let ops = GeoEngine::planar(SQ_METERS_PER_ACRE.sqrt());
        let cfg = config(CommunitySelection::All);
        let runner = CommunityRunner::new(&cfg, &data, &ops);

        let out = runner.process("370001");
        assert_eq!(out.reached, Stage::OpportunityComputed);
        assert!(out.error.is_none());
        assert!((out.result.osp_acres_curr - 4.0).abs() < 1e-9);
        assert!((out.result.osp_acres_future - 96.0).abs() < 1e-9);

        // community whose polygons are all outside the SFHA
        let out = runner.process("370002");
        assert_eq!(out.reached, Stage::OpportunityComputed);
        assert_eq!(out.result, CommunityResult::zeroed("370002"));
    }

    #[test]
    fn test_run_records_every_community() {
        let data = datasets();
        let ops = GeoEngine::planar(SQ_METERS_PER_ACRE.sqrt());
        let cfg = config(CommunitySelection::All);
        let runner = CommunityRunner::new(&cfg, &data, &ops);

        let mut ws = Workspace::new();
        let mut seen = Vec::new();
        let summary = runner
            .run_with(&mut ws, |r| seen.push(r.community_id.clone()))
            .unwrap();
        assert_eq!(summary.communities, 2);
        assert!(summary.failed.is_empty());
        assert_eq!(seen, vec!["370001", "370002"]);
        assert_eq!(ws.results().len(), 2);
        assert!(ws.layer("CID370001_OSP_Eligible").is_some());
        assert_eq!(ws.layer(HAZARD_COPY).unwrap().len(), 2);
    }

    #[test]
    fn test_engine_error_keeps_hazard_acreage() {
        let mut data = datasets();
        data.parcels = Some(vec![rect(0.0, 0.0, 10.0, 10.0).with_property("PIN", "A")].into_iter().collect());
        let ops = FailingIntersect(GeoEngine::planar(SQ_METERS_PER_ACRE.sqrt()));
        let cfg = config(CommunitySelection::One("370001".into()));
        let runner = CommunityRunner::new(&cfg, &data, &ops);

        let out = runner.process("370001");
        assert_eq!(out.reached, Stage::EligibilityComputed);
        assert!(out.error.as_deref().is_some_and(|e| e.contains("intersect failed")));
        assert!(out.layers.is_empty());
        assert!((out.result.sfha_acres - 100.0).abs() < 1e-9);
        assert!((out.result.asfha_acres - 100.0).abs() < 1e-9);
        assert_eq!(
            out.result,
            CommunityResult {
                sfha_acres: out.result.sfha_acres,
                asfha_acres: out.result.asfha_acres,
                ..CommunityResult::zeroed("370001")
            }
        );

        let mut ws = Workspace::new();
        let summary = runner.run(&mut ws).unwrap();
        assert_eq!(summary.failed, vec!["370001"]);
        assert!((ws.results()[0].asfha_acres - 100.0).abs() < 1e-9);
        assert!(ws.layer("CID370001_OSP_Eligible").is_none());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let data = datasets();
        let ops = GeoEngine::planar(SQ_METERS_PER_ACRE.sqrt());
        let cfg = config(CommunitySelection::All);
        let runner = CommunityRunner::new(&cfg, &data, &ops);

        let mut sequential = Workspace::new();
        runner.run(&mut sequential).unwrap();
        let mut parallel = Workspace::new();
        runner.run_parallel(&mut parallel).unwrap();

        assert_eq!(sequential.results(), parallel.results());
        assert_eq!(
            sequential.layer_names().collect::<Vec<_>>(),
            parallel.layer_names().collect::<Vec<_>>()
        );
    }
}
