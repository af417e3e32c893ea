//! Selection by location

use crate::maybe_rayon::*;
use crate::vector::spatial::bounding_box;
use floodosp_core::FeatureCollection;
use geo::Intersects;

/// Features of `input` that intersect (or touch) any selector feature
pub fn select_by_location(input: &FeatureCollection, selector: &FeatureCollection) -> FeatureCollection {
    let selectors: Vec<_> = selector
        .iter()
        .filter_map(|f| {
            let geom = f.polygons();
            bounding_box(&geom).map(|bb| (geom, bb))
        })
        .collect();
    if selectors.is_empty() {
        return FeatureCollection::new();
    }

    let features = &input.features;
    let keep: Vec<bool> = (0..features.len())
        .into_par_iter()
        .map(|i| {
            let geom = features[i].polygons();
            let Some(bb) = bounding_box(&geom) else {
                return false;
            };
            selectors
                .iter()
                .any(|(other, other_bb)| bb.intersects(other_bb) && geom.intersects(other))
        })
        .collect();

    features
        .iter()
        .zip(keep)
        .filter_map(|(f, keep)| keep.then(|| f.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodosp_core::Feature;
    use geo::Rect;

    #[test]
    fn test_select_by_location() {
        let parcels: FeatureCollection = vec![
            Feature::new(Rect::new((0.0, 0.0), (2.0, 2.0)).to_polygon()).with_property("PIN", "A"),
            Feature::new(Rect::new((5.0, 5.0), (6.0, 6.0)).to_polygon()).with_property("PIN", "B"),
            Feature::new(Rect::new((2.0, 0.0), (3.0, 1.0)).to_polygon()).with_property("PIN", "C"),
        ]
        .into_iter()
        .collect();
        let undeveloped: FeatureCollection =
            vec![Feature::new(Rect::new((1.0, 1.0), (2.0, 3.0)).to_polygon())]
                .into_iter()
                .collect();

        let picked = select_by_location(&parcels, &undeveloped);
        let pins: Vec<_> = picked.iter().filter_map(|f| f.get_text("PIN")).collect();
        // C only touches the selector at a corner point
        assert_eq!(pins, vec!["A", "C"]);
        assert!(select_by_location(&parcels, &FeatureCollection::new()).is_empty());
    }
}
