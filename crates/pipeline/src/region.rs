//! Community extraction
//!
//! Selects a community's hazard polygons, unions them into its boundary
//! and clips every source layer to that boundary. An ID with no polygons
//! gives an empty region, never an error.

use crate::config::FieldNames;
use crate::fields::{add_area, AREA_GEO, OSP_ID};
use crate::inputs::Datasets;
use floodosp_core::{FeatureCollection, Result, SpatialOps};

/// Value of the hazard flag marking SFHA polygons
pub const SFHA_TRUE: &str = "T";

/// Layers of one community, all clipped to its boundary
#[derive(Debug, Clone, Default)]
pub struct CommunityRegion {
    pub community_id: String,
    /// Union of the community's hazard-boundary polygons
    pub boundary: FeatureCollection,
    /// SFHA polygons with `AREA_GEO`
    pub sfha: FeatureCollection,
    pub sfha_acres: f64,
    pub hydro_area: FeatureCollection,
    pub hydro_waterbody: FeatureCollection,
    /// Protected areas with `OSP_ID` assigned
    pub protected_areas: FeatureCollection,
}

impl CommunityRegion {
    pub fn is_empty(&self) -> bool {
        self.boundary.is_empty()
    }
}

pub struct RegionExtractor<'a> {
    ops: &'a dyn SpatialOps,
    fields: &'a FieldNames,
    id_prefix: &'a str,
}

impl<'a> RegionExtractor<'a> {
    pub fn new(ops: &'a dyn SpatialOps, fields: &'a FieldNames, id_prefix: &'a str) -> Self {
        Self {
            ops,
            fields,
            id_prefix,
        }
    }

    /// Dissolved boundary of `community_id`. IDs compare with surrounding
    /// whitespace removed on both sides.
    pub fn boundary(&self, community_id: &str, hazard_boundary: &FeatureCollection) -> Result<FeatureCollection> {
        let community_id = community_id.trim();
        let field = self.fields.community_id.as_str();
        let selected = self.ops.select_by_attribute(hazard_boundary, &|f| {
            f.get_text(field).is_some_and(|id| id.trim() == community_id)
        });
        self.ops.dissolve(&selected, Some(field), true)
    }

    pub fn extract(&self, community_id: &str, datasets: &Datasets) -> Result<CommunityRegion> {
        let community_id = community_id.trim();
        let boundary = self.boundary(community_id, &datasets.hazard_boundary)?;
        if boundary.is_empty() {
            return Ok(CommunityRegion {
                community_id: community_id.to_string(),
                ..Default::default()
            });
        }

        let flag = self.fields.hazard_flag.as_str();
        let hazard_clip = self.ops.clip(&datasets.flood_hazard, &boundary)?;
        let mut sfha = self.ops.select_by_attribute(&hazard_clip, &|f| {
            f.get_text(flag).is_some_and(|v| v.trim() == SFHA_TRUE)
        });
        add_area(self.ops, &mut sfha);
        let sfha_acres = sfha.sum_field(AREA_GEO);

        let hydro_area = self.ops.clip(&datasets.hydro_area, &boundary)?;
        let hydro_waterbody = self.ops.clip(&datasets.hydro_waterbody, &boundary)?;

        let mut protected_areas = self.ops.clip(&datasets.protected_areas, &boundary)?;
        for (i, feature) in protected_areas.iter_mut().enumerate() {
            feature.set_property(OSP_ID, format!("{}_{}", self.id_prefix, i + 1));
        }

        Ok(CommunityRegion {
            community_id: community_id.to_string(),
            boundary,
            sfha,
            sfha_acres,
            hydro_area,
            hydro_waterbody,
            protected_areas,
        })
    }
}
