//! Attributed polygon layers
//!
//! Every vector dataset in the credit workflow (hazard zones, protected
//! areas, parcels, easements) is a set of polygon features with a handful of
//! typed attributes. Geometry is carried as `geo_types`, attributes as a
//! small dynamic value type.

use geo_types::{Geometry, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric view; numeric text such as "2" also converts
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::String(s) => s.trim().parse().ok(),
            AttributeValue::Bool(_) | AttributeValue::Null => None,
        }
    }

    /// String view, only for text values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Text form used for grouping and code comparison. Integral floats
    /// print without a fractional part so `2.0` and `"2"` compare equal.
    pub fn to_text(&self) -> String {
        match self {
            AttributeValue::Null => String::new(),
            AttributeValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                format!("{}", *v as i64)
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(v) => f.write_str(v),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

/// Collect the polygonal parts of any geometry; points and lines are dropped
pub fn to_multi_polygon(geometry: &Geometry<f64>) -> MultiPolygon<f64> {
    fn collect(geometry: &Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
        match geometry {
            Geometry::Polygon(p) => out.push(p.clone()),
            Geometry::MultiPolygon(mp) => out.extend(mp.0.iter().cloned()),
            Geometry::Rect(r) => out.push(r.to_polygon()),
            Geometry::Triangle(t) => out.push(t.to_polygon()),
            Geometry::GeometryCollection(gc) => {
                for g in gc.iter() {
                    collect(g, out);
                }
            }
            _ => {}
        }
    }

    let mut polygons = Vec::new();
    collect(geometry, &mut polygons);
    MultiPolygon(polygons)
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Numeric attribute, `None` if absent or non-numeric
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(AttributeValue::as_f64)
    }

    /// Attribute in text form, `None` if absent or null
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.properties
            .get(key)
            .filter(|v| !v.is_null())
            .map(AttributeValue::to_text)
    }

    /// Polygonal parts of the geometry (empty when there is none)
    pub fn polygons(&self) -> MultiPolygon<f64> {
        self.geometry
            .as_ref()
            .map(to_multi_polygon)
            .unwrap_or_else(|| MultiPolygon(Vec::new()))
    }

    /// Same attributes, new geometry
    pub fn with_geometry(&self, geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            properties: self.properties.clone(),
            id: self.id.clone(),
        }
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn from_features(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Feature> {
        self.features.iter_mut()
    }

    /// Append every feature of `other` (a merge of two layers)
    pub fn extend(&mut self, other: FeatureCollection) {
        self.features.extend(other.features);
    }

    /// Features whose attributes satisfy the predicate
    pub fn filter<F>(&self, predicate: F) -> FeatureCollection
    where
        F: Fn(&Feature) -> bool,
    {
        self.features
            .iter()
            .filter(|f| predicate(f))
            .cloned()
            .collect()
    }

    /// Whether any feature carries the field
    pub fn has_field(&self, field: &str) -> bool {
        self.features.iter().any(|f| f.properties.contains_key(field))
    }

    /// Sum of a numeric field over all features; missing values count as 0
    pub fn sum_field(&self, field: &str) -> f64 {
        self.features.iter().filter_map(|f| f.get_f64(field)).sum()
    }

    /// All polygonal parts of the layer as one multipolygon (not dissolved)
    pub fn polygons(&self) -> MultiPolygon<f64> {
        MultiPolygon(self.features.iter().flat_map(|f| f.polygons().0).collect())
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Point, Rect};

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        Rect::new((x, y), (x + size, y + size)).to_polygon()
    }

    #[test]
    fn test_attribute_text_form() {
        assert_eq!(AttributeValue::Float(2.0).to_text(), "2");
        assert_eq!(AttributeValue::Int(460).to_text(), "460");
        assert_eq!(AttributeValue::from("T").to_text(), "T");
        assert_eq!(AttributeValue::Float(0.25).to_text(), "0.25");
        assert_eq!(AttributeValue::from(" 2 ").as_f64(), Some(2.0));
    }

    #[test]
    fn test_feature_accessors() {
        let f = Feature::new(square(0.0, 0.0, 1.0))
            .with_property("CID", "370001")
            .with_property("AREA", 1.5);
        assert_eq!(f.get_text("CID").as_deref(), Some("370001"));
        assert_eq!(f.get_f64("AREA"), Some(1.5));
        assert_eq!(f.get_f64("CID"), Some(370001.0));
        assert!(f.get_text("missing").is_none());
        assert_eq!(f.polygons().0.len(), 1);
    }

    #[test]
    fn test_point_geometry_has_no_polygons() {
        let f = Feature::new(Point::new(1.0, 2.0));
        assert!(f.polygons().0.is_empty());
        assert!(Feature::empty().polygons().0.is_empty());
    }

    #[test]
    fn test_collection_filter_and_sum() {
        let layer: FeatureCollection = (0..4)
            .map(|i| {
                Feature::new(square(i as f64, 0.0, 1.0))
                    .with_property("GAP", i as i64)
                    .with_property("ACRES", 2.0)
            })
            .collect();

        let gap12 = layer.filter(|f| matches!(f.get_text("GAP").as_deref(), Some("1") | Some("2")));
        assert_eq!(gap12.len(), 2);
        assert_eq!(layer.sum_field("ACRES"), 8.0);
        assert!(layer.has_field("GAP"));
        assert_eq!(layer.polygons().0.len(), 4);
    }

    #[test]
    fn test_geometry_collection_flattening() {
        let poly = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let gc = Geometry::GeometryCollection(geo_types::GeometryCollection(vec![
            Geometry::Polygon(poly.clone()),
            Geometry::Point(Point::new(5.0, 5.0)),
            Geometry::MultiPolygon(MultiPolygon(vec![poly])),
        ]));
        assert_eq!(to_multi_polygon(&gc).0.len(), 2);
    }
}
