//! Run configuration
//!
//! A [`RunConfig`] is everything collected once per run: the state, which
//! communities to process, where the inputs live and where outputs go. It
//! deserializes from JSON; every tunable constant lives in
//! [`PipelineParams`] with the CRS defaults.

use crate::error::{PipelineError, Result};
use floodosp_algorithms::GeoEngine;
use floodosp_core::{AreaMeasure, Region};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which communities a run covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunitySelection {
    /// A single community ID
    One(String),
    /// Every ID found in the hazard-boundary layer
    All,
}

/// Origin of the protected-areas layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectedAreasSource {
    /// The national protected-areas inventory (PAD-US): carries management
    /// type and GAP status, enables the federal/tribal exclusion
    NationalInventory,
    /// A locally supplied layer
    Custom,
}

impl ProtectedAreasSource {
    /// Prefix of generated `OSP_ID` values
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ProtectedAreasSource::NationalInventory => "PADUS",
            ProtectedAreasSource::Custom => "OSP",
        }
    }
}

/// Coordinate space of the input data, which decides how area is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// Longitude/latitude; geodesic area
    Geographic,
    /// Already projected to the region's State Plane zone; planar area.
    /// This is the default because the published acreage is measured in the
    /// projected State Plane coordinates, not on the ellipsoid.
    #[default]
    StatePlane,
}

/// Attribute names looked up in the input layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub community_id: String,
    pub hazard_flag: String,
    pub feature_type: String,
    pub management_type: String,
    pub gap_status: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            community_id: "CID".to_string(),
            hazard_flag: "SFHA_TF".to_string(),
            feature_type: "FType".to_string(),
            management_type: "Mang_Type".to_string(),
            gap_status: "GAP_Sts".to_string(),
        }
    }
}

/// Communities protecting Resource Protection Areas under the Chesapeake
/// Bay Preservation Act
pub const CHESAPEAKE_BAY_ACT_CIDS: [i64; 46] = [
    510001, 515520, 510249, 510198, 510035, 510048, 515525, 510071, 510237, 510077, 510303,
    510201, 510082, 510312, 510304, 510084, 510096, 510098, 510306, 510105, 510107, 510204,
    510119, 510310, 510308, 510154, 510157, 510250, 510182, 515519, 510034, 510039, 515524,
    510054, 510065, 515527, 510080, 510103, 510104, 510112, 510183, 515529, 510129, 510156,
    515531, 510294,
];

/// Whether a numeric community ID appears in `list`
pub(crate) fn community_listed(list: &[i64], community_id: &str) -> bool {
    community_id
        .trim()
        .parse::<i64>()
        .map(|cid| list.contains(&cid))
        .unwrap_or(false)
}

/// Thresholds, code lists and credit weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// Eligible polygons below this many acres are dropped before sampling
    pub min_eligible_acres: f64,
    /// Opportunity polygons below this are dropped (no-parcel path only)
    pub min_opportunity_acres: f64,
    /// Open water and federal/tribal land must exceed this to be excluded
    pub min_exclusion_acres: f64,
    /// Hydrography area feature types counted as open water
    pub open_water_area_types: Vec<i64>,
    /// Hydrography waterbody feature types counted as open water
    pub open_water_waterbody_types: Vec<i64>,
    /// Land-cover classes at or below this are water or developed
    pub developed_max_class: f64,
    /// Additional non-natural classes (pasture, cultivated crops)
    pub non_natural_classes: Vec<i64>,
    /// Management types excluded from the adjusted hazard area
    pub federal_tribal_types: Vec<String>,
    /// GAP status codes that qualify for NFOS1
    pub natural_gap_codes: Vec<String>,
    pub osp_weight: f64,
    pub nfos1_weight: f64,
    pub nfos2_weight: f64,
    pub rpa_communities: Vec<i64>,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            min_eligible_acres: 0.3,
            min_opportunity_acres: 0.5,
            min_exclusion_acres: 10.0,
            open_water_area_types: vec![445, 460, 312],
            open_water_waterbody_types: vec![390, 436, 493],
            developed_max_class: 31.0,
            non_natural_classes: vec![81, 82],
            federal_tribal_types: vec!["FED".to_string(), "TRIB".to_string()],
            natural_gap_codes: vec!["1".to_string(), "2".to_string()],
            osp_weight: 1450.0,
            nfos1_weight: 190.0,
            nfos2_weight: 50.0,
            rpa_communities: CHESAPEAKE_BAY_ACT_CIDS.to_vec(),
        }
    }
}

impl PipelineParams {
    /// Land-cover rule for undeveloped land: class above the developed range
    /// and not pasture/crops
    pub fn is_undeveloped(&self, class: f64) -> bool {
        class > self.developed_max_class
            && !self
                .non_natural_classes
                .iter()
                .any(|&c| (c as f64 - class).abs() < f64::EPSILON)
    }

    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("min_eligible_acres", self.min_eligible_acres),
            ("min_opportunity_acres", self.min_opportunity_acres),
            ("min_exclusion_acres", self.min_exclusion_acres),
            ("osp_weight", self.osp_weight),
            ("nfos1_weight", self.nfos1_weight),
            ("nfos2_weight", self.nfos2_weight),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::InvalidParameter {
                    name,
                    reason: format!("must be a finite non-negative number, got {}", value),
                });
            }
        }
        Ok(())
    }
}

/// Input locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPaths {
    pub hazard_boundary: PathBuf,
    pub flood_hazard: PathBuf,
    pub hydro_area: PathBuf,
    pub hydro_waterbody: PathBuf,
    /// Percent impervious surface raster
    pub impervious: PathBuf,
    /// Land-cover class raster
    pub land_cover: PathBuf,
    pub protected_areas: PathBuf,
    #[serde(default)]
    pub parcels: Option<PathBuf>,
    /// Virginia only
    #[serde(default)]
    pub state_easements: Option<PathBuf>,
    /// Virginia only
    #[serde(default)]
    pub resource_protection: Option<PathBuf>,
}

/// Everything collected once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub region: Region,
    pub communities: CommunitySelection,
    pub workspace: PathBuf,
    pub datasets: DatasetPaths,
    pub protected_source: ProtectedAreasSource,
    #[serde(default)]
    pub coordinate_space: CoordinateSpace,
    #[serde(default)]
    pub fields: FieldNames,
    #[serde(default)]
    pub params: PipelineParams,
}

impl RunConfig {
    /// Load and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig =
            serde_json::from_str(&text).map_err(|source| PipelineError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let CommunitySelection::One(id) = &self.communities {
            if id.trim().is_empty() {
                return Err(PipelineError::InvalidParameter {
                    name: "community",
                    reason: "community ID is empty".to_string(),
                });
            }
        }
        self.params.validate()
    }

    /// Area measure implied by the coordinate space. State Plane inputs are
    /// measured in squared survey feet; lon/lat inputs use geodesic area.
    pub fn area_measure(&self) -> AreaMeasure {
        match self.coordinate_space {
            CoordinateSpace::Geographic => AreaMeasure::Geodesic,
            CoordinateSpace::StatePlane => AreaMeasure::Planar {
                unit_meters: self.region.linear_unit_meters(),
            },
        }
    }

    /// Geometry engine measuring area the way this run needs
    pub fn engine(&self) -> GeoEngine {
        GeoEngine::new(self.area_measure())
    }
}
