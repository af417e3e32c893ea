//! Input datasets held in memory for the whole run

use crate::config::DatasetPaths;
use crate::error::{PipelineError, Result};
use floodosp_core::io::{read_geojson, read_geotiff};
use floodosp_core::{FeatureCollection, Raster};
use std::path::Path;

/// Every input layer of a run
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub hazard_boundary: FeatureCollection,
    pub flood_hazard: FeatureCollection,
    pub hydro_area: FeatureCollection,
    pub hydro_waterbody: FeatureCollection,
    /// Percent impervious surface (0-100)
    pub impervious: Raster<f64>,
    /// Land-cover class codes
    pub land_cover: Raster<f64>,
    pub protected_areas: FeatureCollection,
    pub parcels: Option<FeatureCollection>,
    pub state_easements: Option<FeatureCollection>,
    pub resource_protection: Option<FeatureCollection>,
}

fn load_layer(dataset: &'static str, path: &Path) -> Result<FeatureCollection> {
    read_geojson(path).map_err(|source| PipelineError::Dataset {
        dataset,
        path: path.to_path_buf(),
        source,
    })
}

fn load_raster(dataset: &'static str, path: &Path) -> Result<Raster<f64>> {
    read_geotiff::<f64, _>(path).map_err(|source| PipelineError::Dataset {
        dataset,
        path: path.to_path_buf(),
        source,
    })
}

impl Datasets {
    /// Read every configured dataset. `progress` is called with each
    /// dataset name before it is read.
    pub fn load<F>(paths: &DatasetPaths, mut progress: F) -> Result<Self>
    where
        F: FnMut(&str),
    {
        let mut layer = |name: &'static str, path: &Path| {
            progress(name);
            load_layer(name, path)
        };

        let hazard_boundary = layer("hazard boundary", &paths.hazard_boundary)?;
        let flood_hazard = if paths.flood_hazard == paths.hazard_boundary {
            hazard_boundary.clone()
        } else {
            layer("flood hazard", &paths.flood_hazard)?
        };
        let hydro_area = layer("hydrography areas", &paths.hydro_area)?;
        let hydro_waterbody = layer("hydrography waterbodies", &paths.hydro_waterbody)?;
        let protected_areas = layer("protected areas", &paths.protected_areas)?;
        let parcels = paths
            .parcels
            .as_deref()
            .map(|p| layer("parcels", p))
            .transpose()?;
        let state_easements = paths
            .state_easements
            .as_deref()
            .map(|p| layer("state conservation easements", p))
            .transpose()?;
        let resource_protection = paths
            .resource_protection
            .as_deref()
            .map(|p| layer("resource protection areas", p))
            .transpose()?;

        progress("impervious raster");
        let impervious = load_raster("impervious raster", &paths.impervious)?;
        progress("land cover raster");
        let land_cover = load_raster("land cover raster", &paths.land_cover)?;

        Ok(Self {
            hazard_boundary,
            flood_hazard,
            hydro_area,
            hydro_waterbody,
            impervious,
            land_cover,
            protected_areas,
            parcels,
            state_easements,
            resource_protection,
        })
    }

    /// Distinct trimmed values of `field` in the hazard-boundary layer, in
    /// order of first appearance. Blank values are skipped.
    pub fn community_ids(&self, field: &str) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.hazard_boundary.iter().filter_map(|f| f.get_text(field)) {
            let id = id.trim();
            if !id.is_empty() && !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodosp_core::io::write_geojson;
    use floodosp_core::Feature;
    use geo::Rect;
    use std::path::PathBuf;

    fn layer_with_ids(ids: &[&str]) -> FeatureCollection {
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                let x = i as f64;
                Feature::new(Rect::new((x, 0.0), (x + 1.0, 1.0)).to_polygon()).with_property("CID", *id)
            })
            .collect()
    }

    #[test]
    fn test_community_ids_first_appearance() {
        let datasets = Datasets {
            hazard_boundary: layer_with_ids(&["510002", "510001", "510002", "370001"]),
            ..Default::default()
        };
        assert_eq!(datasets.community_ids("CID"), vec!["510002", "510001", "370001"]);
        assert!(datasets.community_ids("NOPE").is_empty());
    }

    #[test]
    fn test_community_ids_trimmed() {
        let datasets = Datasets {
            hazard_boundary: layer_with_ids(&[" 370001", "370001 ", "  ", "370002"]),
            ..Default::default()
        };
        assert_eq!(datasets.community_ids("CID"), vec!["370001", "370002"]);
    }

    #[test]
    fn test_missing_dataset_names_the_layer() {
        let dir = tempfile::tempdir().unwrap();
        let hazard = dir.path().join("hazard.geojson");
        write_geojson(&layer_with_ids(&["1"]), &hazard).unwrap();

        let paths = DatasetPaths {
            hazard_boundary: hazard.clone(),
            flood_hazard: hazard,
            hydro_area: dir.path().join("missing.geojson"),
            hydro_waterbody: PathBuf::from("unused"),
            impervious: PathBuf::from("unused"),
            land_cover: PathBuf::from("unused"),
            protected_areas: PathBuf::from("unused"),
            parcels: None,
            state_easements: None,
            resource_protection: None,
        };
        let mut seen = Vec::new();
        let err = Datasets::load(&paths, |name| seen.push(name.to_string())).unwrap_err();
        assert!(matches!(err, PipelineError::Dataset { dataset: "hydrography areas", .. }));
        assert_eq!(seen, vec!["hazard boundary", "hydrography areas"]);
    }
}
