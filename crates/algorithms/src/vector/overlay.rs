//! Polygon overlay: clip, erase, dissolve, intersect, explode
//!
//! Attribute rules follow the desktop-GIS tools the credit workflow was
//! designed around: clip and erase keep input attributes, dissolve keeps
//! only the dissolve field, intersect carries both sides.

use crate::maybe_rayon::*;
use crate::vector::spatial::{bounding_box, BoundingBox};
use floodosp_core::vector::AttributeValue;
use floodosp_core::{Feature, FeatureCollection};
use geo::{Area, BooleanOps, Geometry, MultiPolygon, Polygon};
use std::collections::HashMap;

/// Drop degenerate rings left behind by overlay
fn clean(geom: MultiPolygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon(
        geom.0
            .into_iter()
            .filter(|p| p.exterior().0.len() >= 4 && p.unsigned_area() > 0.0)
            .collect(),
    )
}

/// Single polygons are written as `Polygon`, everything else as `MultiPolygon`
pub fn into_geometry(mut geom: MultiPolygon<f64>) -> Geometry<f64> {
    if geom.0.len() == 1 {
        if let Some(p) = geom.0.pop() {
            return Geometry::Polygon(p);
        }
    }
    Geometry::MultiPolygon(geom)
}

/// Union of many multipolygons, merged pairwise in a balanced tree
pub fn union_all(parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    let mut level: Vec<MultiPolygon<f64>> = parts.into_iter().filter(|p| !p.0.is_empty()).collect();

    while level.len() > 1 {
        let current = &level;
        level = (0..(current.len() + 1) / 2)
            .into_par_iter()
            .map(|i| match current.get(2 * i + 1) {
                Some(other) => current[2 * i].union(other),
                None => current[2 * i].clone(),
            })
            .collect();
    }

    level.pop().map(clean).unwrap_or_else(|| MultiPolygon(Vec::new()))
}

/// Union of every polygon in a layer
pub fn union_layer(layer: &FeatureCollection) -> MultiPolygon<f64> {
    union_all(layer.iter().map(Feature::polygons).collect())
}

/// Shared body of clip and erase: apply `op` between each input feature and
/// the unioned overlay layer.
fn overlay_each<F>(input: &FeatureCollection, overlay: &MultiPolygon<f64>, op: F) -> FeatureCollection
where
    F: Fn(&MultiPolygon<f64>, Option<BoundingBox>) -> Option<MultiPolygon<f64>> + Sync,
{
    let overlay_box = bounding_box(overlay);
    let features = &input.features;

    (0..features.len())
        .into_par_iter()
        .filter_map(|i| {
            let feature = &features[i];
            let geom = feature.polygons();
            if geom.0.is_empty() {
                return None;
            }
            let out = clean(op(&geom, overlay_box)?);
            (!out.0.is_empty()).then(|| feature.with_geometry(into_geometry(out)))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

/// Each input feature intersected with the union of the clip layer
pub fn clip(input: &FeatureCollection, clip_layer: &FeatureCollection) -> FeatureCollection {
    let mask = union_layer(clip_layer);
    if mask.0.is_empty() {
        return FeatureCollection::new();
    }

    overlay_each(input, &mask, |geom, mask_box| {
        let disjoint = match (bounding_box(geom), mask_box) {
            (Some(a), Some(b)) => !a.intersects(&b),
            _ => true,
        };
        if disjoint {
            None
        } else {
            Some(geom.intersection(&mask))
        }
    })
}

/// Each input feature minus the union of the erase layer
pub fn erase(input: &FeatureCollection, erase_layer: &FeatureCollection) -> FeatureCollection {
    let cutter = union_layer(erase_layer);
    if cutter.0.is_empty() {
        return overlay_each(input, &cutter, |geom, _| Some(geom.clone()));
    }

    overlay_each(input, &cutter, |geom, cutter_box| {
        let disjoint = match (bounding_box(geom), cutter_box) {
            (Some(a), Some(b)) => !a.intersects(&b),
            _ => true,
        };
        if disjoint {
            Some(geom.clone())
        } else {
            Some(geom.difference(&cutter))
        }
    })
}

/// Union features grouped by the text form of `field`.
///
/// Groups are emitted in order of first appearance. Features missing the
/// field fall into one group with a null key. With `multipart = false` each
/// group is split into single-part features.
pub fn dissolve(input: &FeatureCollection, field: Option<&str>, multipart: bool) -> FeatureCollection {
    let mut order: Vec<(Option<AttributeValue>, Vec<MultiPolygon<f64>>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for feature in input.iter() {
        let geom = feature.polygons();
        if geom.0.is_empty() {
            continue;
        }
        let value = field.map(|f| feature.get_property(f).cloned().unwrap_or(AttributeValue::Null));
        let key = value.as_ref().map(AttributeValue::to_text).unwrap_or_default();
        let slot = *index.entry(key).or_insert_with(|| {
            order.push((value, Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(geom);
    }

    let mut out = FeatureCollection::new();
    for (value, parts) in order {
        let merged = union_all(parts);
        if merged.0.is_empty() {
            continue;
        }
        let make = |geom: Geometry<f64>| {
            let mut feature = Feature::new(geom);
            if let (Some(name), Some(v)) = (field, &value) {
                feature.set_property(name, v.clone());
            }
            feature
        };
        if multipart {
            out.push(make(into_geometry(merged)));
        } else {
            for poly in merged.0 {
                out.push(make(Geometry::Polygon(poly)));
            }
        }
    }
    out
}

/// One feature per overlapping (a, b) pair with geometry `a ∩ b`.
///
/// The output keeps every attribute of `a` and adds those of `b` whose
/// keys `a` does not already carry.
pub fn intersect(a: &FeatureCollection, b: &FeatureCollection) -> FeatureCollection {
    let right: Vec<(&Feature, MultiPolygon<f64>, BoundingBox)> = b
        .iter()
        .filter_map(|f| {
            let geom = f.polygons();
            let bb = bounding_box(&geom)?;
            Some((f, geom, bb))
        })
        .collect();
    let left = &a.features;

    (0..left.len())
        .into_par_iter()
        .flat_map(|i| {
            let feature = &left[i];
            let geom = feature.polygons();
            let mut pieces = Vec::new();
            let Some(bb) = bounding_box(&geom) else {
                return pieces;
            };
            for (other, other_geom, other_bb) in &right {
                if !bb.intersects(other_bb) {
                    continue;
                }
                let shared = clean(geom.intersection(other_geom));
                if shared.0.is_empty() {
                    continue;
                }
                let mut piece = feature.with_geometry(into_geometry(shared));
                for (key, value) in &other.properties {
                    piece
                        .properties
                        .entry(key.clone())
                        .or_insert_with(|| value.clone());
                }
                pieces.push(piece);
            }
            pieces
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

/// Multipart to singlepart; attributes are copied to every part
pub fn explode(input: &FeatureCollection) -> FeatureCollection {
    input
        .iter()
        .flat_map(|feature| {
            feature
                .polygons()
                .0
                .into_iter()
                .map(move |poly: Polygon<f64>| feature.with_geometry(poly))
        })
        .collect()
}
