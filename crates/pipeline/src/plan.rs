//! Pipeline assembly
//!
//! Options are resolved once per run into a [`StagePlan`]; the stages
//! consult the plan instead of re-testing region codes and dataset
//! presence on every community.

use crate::config::{community_listed, ProtectedAreasSource, RunConfig};
use crate::inputs::Datasets;
use floodosp_core::Region;

/// How eligible protected areas are consolidated before the final clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supplement {
    /// Dissolve by `OSP_ID`
    DissolveOnly,
    /// Dissolve by `OSP_ID`, then merge in uncovered state easements and,
    /// for Chesapeake Bay Act communities, resource protection areas
    Virginia { easements: bool, rpa: bool },
}

/// Stage options resolved at assembly time
#[derive(Debug, Clone, PartialEq)]
pub struct StagePlan {
    /// Exclude large federal and tribal holdings from the hazard area
    pub federal_tribal_exclusion: bool,
    /// `OSP_ID` prefix for protected areas
    pub id_prefix: &'static str,
    pub parcels: bool,
    supplement: Supplement,
    rpa_communities: Vec<i64>,
}

impl StagePlan {
    pub fn resolve(config: &RunConfig, datasets: &Datasets) -> Self {
        let supplement = match config.region {
            Region::Virginia => Supplement::Virginia {
                easements: datasets.state_easements.is_some(),
                rpa: datasets.resource_protection.is_some(),
            },
            _ => Supplement::DissolveOnly,
        };
        Self {
            federal_tribal_exclusion: config.protected_source == ProtectedAreasSource::NationalInventory,
            id_prefix: config.protected_source.id_prefix(),
            parcels: datasets.parcels.as_ref().is_some_and(|p| !p.is_empty()),
            supplement,
            rpa_communities: config.params.rpa_communities.clone(),
        }
    }

    /// Supplement for one community; the RPA merge only applies to listed
    /// communities
    pub fn supplement_for(&self, community_id: &str) -> Supplement {
        match self.supplement {
            Supplement::Virginia { easements, rpa } => {
                Supplement::Virginia {
                    easements,
                    rpa: rpa && community_listed(&self.rpa_communities, community_id),
                }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodosp_core::FeatureCollection;

    fn config(region: &str, source: &str) -> RunConfig {
        let text = format!(
            r#"{{
                "region": "{region}",
                "communities": "all",
                "workspace": "out",
                "datasets": {{
                    "hazard_boundary": "a", "flood_hazard": "a", "hydro_area": "b",
                    "hydro_waterbody": "c", "impervious": "d", "land_cover": "e",
                    "protected_areas": "f"
                }},
                "protected_source": "{source}"
            }}"#
        );
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_non_virginia_dissolves_only() {
        let plan = StagePlan::resolve(&config("NC", "national_inventory"), &Datasets::default());
        assert!(plan.federal_tribal_exclusion);
        assert_eq!(plan.id_prefix, "PADUS");
        assert!(!plan.parcels);
        assert_eq!(plan.supplement_for("510001"), Supplement::DissolveOnly);
    }

    #[test]
    fn test_virginia_rpa_only_for_listed_communities() {
        let datasets = Datasets {
            state_easements: Some(FeatureCollection::new()),
            resource_protection: Some(FeatureCollection::new()),
            parcels: Some(FeatureCollection::new()),
            ..Default::default()
        };
        let plan = StagePlan::resolve(&config("VA", "custom"), &datasets);
        assert!(!plan.federal_tribal_exclusion);
        assert_eq!(plan.id_prefix, "OSP");
        // an empty parcel layer counts as no parcels
        assert!(!plan.parcels);
        assert_eq!(
            plan.supplement_for("510001"),
            Supplement::Virginia { easements: true, rpa: true }
        );
        assert_eq!(
            plan.supplement_for("510002"),
            Supplement::Virginia { easements: true, rpa: false }
        );
    }
}
