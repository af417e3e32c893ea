//! GeoJSON layer reading and writing

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::{feature::Id, GeoJson, JsonObject, JsonValue};
use std::fs;
use std::path::Path;

fn attribute_from_json(value: &JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => AttributeValue::String(s.clone()),
        other => AttributeValue::String(other.to_string()),
    }
}

fn attribute_to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => JsonValue::from(*i),
        // NaN and infinities have no JSON form
        AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}

fn feature_from_geojson(feature: geojson::Feature) -> Result<Feature> {
    let geometry = match feature.geometry {
        Some(g) => Some(geo_types::Geometry::<f64>::try_from(g)?),
        None => None,
    };

    let properties = feature
        .properties
        .unwrap_or_default()
        .iter()
        .map(|(k, v)| (k.clone(), attribute_from_json(v)))
        .collect();

    let id = feature.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

fn feature_to_geojson(feature: &Feature) -> geojson::Feature {
    let properties: JsonObject = feature
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), attribute_to_json(v)))
        .collect();

    geojson::Feature {
        bbox: None,
        geometry: feature
            .geometry
            .as_ref()
            .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
        id: feature.id.clone().map(Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Parse a GeoJSON document. A bare Feature or Geometry becomes a
/// one-feature layer.
pub fn from_geojson_str(text: &str) -> Result<FeatureCollection> {
    let parsed: GeoJson = text.parse()?;
    match parsed {
        GeoJson::FeatureCollection(fc) => fc
            .features
            .into_iter()
            .map(feature_from_geojson)
            .collect::<Result<Vec<_>>>()
            .map(FeatureCollection::from_features),
        GeoJson::Feature(f) => Ok(FeatureCollection::from_features(vec![feature_from_geojson(f)?])),
        GeoJson::Geometry(g) => {
            let geometry = geo_types::Geometry::<f64>::try_from(g)?;
            Ok(FeatureCollection::from_features(vec![Feature::new(geometry)]))
        }
    }
}

/// Serialize a layer as a GeoJSON FeatureCollection
pub fn to_geojson_string(layer: &FeatureCollection) -> String {
    let fc = geojson::FeatureCollection {
        bbox: None,
        features: layer.iter().map(feature_to_geojson).collect(),
        foreign_members: None,
    };
    GeoJson::FeatureCollection(fc).to_string()
}

/// Read a GeoJSON file into a layer
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    from_geojson_str(&text).map_err(|e| match e {
        Error::GeoJson(inner) => Error::Other(format!("{}: {}", path.display(), inner)),
        other => other,
    })
}

/// Write a layer to a GeoJSON file, replacing any existing file
pub fn write_geojson<P: AsRef<Path>>(layer: &FeatureCollection, path: P) -> Result<()> {
    fs::write(path, to_geojson_string(layer))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Rect;

    const HAZARD: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 7,
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]},
                "properties": {"CID": "370001", "SFHA_TF": "T", "DEPTH": 1.5, "ZONE": null}
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": {"CID": "370001", "GAP_Sts": 2}
            }
        ]
    }"#;

    #[test]
    fn test_parse_feature_collection() {
        let layer = from_geojson_str(HAZARD).unwrap();
        assert_eq!(layer.len(), 2);

        let first = &layer.features[0];
        assert_eq!(first.id.as_deref(), Some("7"));
        assert_eq!(first.get_text("SFHA_TF").as_deref(), Some("T"));
        assert_eq!(first.get_f64("DEPTH"), Some(1.5));
        assert!(first.get_text("ZONE").is_none());
        assert_eq!(first.polygons().0.len(), 1);

        let second = &layer.features[1];
        assert!(second.geometry.is_none());
        assert_eq!(second.get_property("GAP_Sts"), Some(&AttributeValue::Int(2)));
    }

    #[test]
    fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layer.geojson");

        let layer = FeatureCollection::from_features(vec![Feature::new(
            Rect::new((0.0, 0.0), (2.0, 3.0)).to_polygon(),
        )
        .with_property("OSP_ID", "OSP_1")
        .with_property("AREA_GEO", 6.0)
        .with_property("BAD", f64::NAN)]);
        write_geojson(&layer, &path).unwrap();

        let back = read_geojson(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.features[0].get_text("OSP_ID").as_deref(), Some("OSP_1"));
        assert_eq!(back.features[0].get_f64("AREA_GEO"), Some(6.0));
        assert!(back.features[0].get_property("BAD").unwrap().is_null());
    }

    #[test]
    fn test_invalid_document() {
        assert!(from_geojson_str("{\"type\": \"Nope\"}").is_err());
    }
}
