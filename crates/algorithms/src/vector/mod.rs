//! Vector analysis algorithms
//!
//! Polygon operations on attributed layers:
//! - Overlay: clip, erase, intersect
//! - Dissolve and explode
//! - Selection by location
//! - Area in acres (geodesic or planar)

mod measurements;
mod overlay;
mod select;
mod spatial;

pub use measurements::area_acres;
pub use overlay::{clip, dissolve, erase, explode, intersect, into_geometry, union_all, union_layer};
pub use select::select_by_location;
pub use spatial::{bounding_box, BoundingBox};
