//! Output store
//!
//! Named layers, the five aggregate layers fed by every community, the
//! augmented hazard-boundary copy and the result table.

use crate::error::{PipelineError, Result};
use crate::result::CommunityResult;
use floodosp_core::io::write_geojson;
use floodosp_core::FeatureCollection;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Roles of per-community layers; each role also names an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerRole {
    Sfha,
    AdjustedSfha,
    Nfos1,
    OspEligible,
    FutureOspParcels,
    OspOpportunities,
}

impl LayerRole {
    /// Roles accumulated across communities
    pub const AGGREGATES: [LayerRole; 5] = [
        LayerRole::AdjustedSfha,
        LayerRole::Nfos1,
        LayerRole::OspEligible,
        LayerRole::FutureOspParcels,
        LayerRole::OspOpportunities,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LayerRole::Sfha => "SFHA",
            LayerRole::AdjustedSfha => "aSFHA",
            LayerRole::Nfos1 => "NFOS1",
            LayerRole::OspEligible => "OSP_Eligible",
            LayerRole::FutureOspParcels => "Future_OSP_Parcels",
            LayerRole::OspOpportunities => "OSP_Opportunities",
        }
    }

    pub fn is_aggregate(&self) -> bool {
        Self::AGGREGATES.contains(self)
    }

    /// `CID<id>_<role>`
    pub fn community_layer(&self, community_id: &str) -> String {
        format!("CID{}_{}", community_id, self.name())
    }
}

/// Name of the augmented hazard-boundary copy
pub const HAZARD_COPY: &str = "NFHL_Copy";
/// File holding the result rows
pub const RESULTS_FILE: &str = "results.json";

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    layers: BTreeMap<String, FeatureCollection>,
    results: Vec<CommunityResult>,
}

impl Workspace {
    /// Empty store with the aggregate layers created
    pub fn new() -> Self {
        let mut ws = Self::default();
        for role in LayerRole::AGGREGATES {
            ws.layers.insert(role.name().to_string(), FeatureCollection::new());
        }
        ws
    }

    /// Copy of the hazard-boundary layer carrying every result column,
    /// zero until a community is recorded
    pub fn init_hazard_copy(&mut self, hazard_boundary: &FeatureCollection) {
        let mut copy = hazard_boundary.clone();
        let zero = CommunityResult::default();
        for feature in copy.iter_mut() {
            for (name, value) in zero.columns() {
                feature.set_property(name, value);
            }
        }
        self.layers.insert(HAZARD_COPY.to_string(), copy);
    }

    pub fn insert(&mut self, name: impl Into<String>, layer: FeatureCollection) {
        self.layers.insert(name.into(), layer);
    }

    pub fn layer(&self, name: &str) -> Option<&FeatureCollection> {
        self.layers.get(name)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Store a community layer under `CID<id>_<role>` and append it to the
    /// role's aggregate
    pub fn add_community_layer(&mut self, community_id: &str, role: LayerRole, layer: FeatureCollection) {
        if role.is_aggregate() {
            self.layers
                .entry(role.name().to_string())
                .or_default()
                .extend(layer.clone());
        }
        self.layers.insert(role.community_layer(community_id), layer);
    }

    /// Record a result row and write its columns to the matching features
    /// of the hazard copy
    pub fn record(&mut self, result: CommunityResult, id_field: &str) {
        if let Some(copy) = self.layers.get_mut(HAZARD_COPY) {
            for feature in copy.iter_mut() {
                let matches = feature
                    .get_text(id_field)
                    .is_some_and(|id| id.trim() == result.community_id);
                if matches {
                    for (name, value) in result.columns() {
                        feature.set_property(name, value);
                    }
                }
            }
        }
        self.results.retain(|r| r.community_id != result.community_id);
        self.results.push(result);
    }

    pub fn results(&self) -> &[CommunityResult] {
        &self.results
    }

    /// Write every layer as `<dir>/<name>.geojson` and the result rows as
    /// `<dir>/results.json`. Returns the written paths.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| PipelineError::Output {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;

        let mut written = Vec::with_capacity(self.layers.len() + 1);
        for (name, layer) in &self.layers {
            let path = dir.join(format!("{}.geojson", name));
            write_geojson(layer, &path).map_err(|source| PipelineError::Output {
                path: path.clone(),
                source,
            })?;
            written.push(path);
        }

        let path = dir.join(RESULTS_FILE);
        let file = File::create(&path).map_err(|e| PipelineError::Output {
            path: path.clone(),
            source: e.into(),
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.results).map_err(|source| {
            PipelineError::ResultsWrite {
                path: path.clone(),
                source,
            }
        })?;
        writer.flush().map_err(|e| PipelineError::Output {
            path: path.clone(),
            source: e.into(),
        })?;
        written.push(path);
        Ok(written)
    }
}
