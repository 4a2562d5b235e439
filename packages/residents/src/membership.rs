//! Point-in-polygon membership for residents.
//!
//! Edge convention: membership is **boundary-exclusive**. A resident lying
//! exactly on an edge or a vertex of the ring is not a member, matching
//! [`geo::Contains`] semantics for polygons.

use canvass_geometry::{MIN_VERTICES, bounding_box, to_closed_ring, to_geo_polygon};
use canvass_territory_models::{Point, Resident};
use geo::Contains;

/// Returns the residents strictly inside `polygon`.
///
/// The ring is closed before testing. Residents outside the ring's
/// bounding box are rejected without a full containment test. Nothing is
/// cached between calls; the polygon changes with every vertex the agent
/// places.
#[must_use]
pub fn filter_in_polygon(polygon: &[Point], residents: &[Resident]) -> Vec<Resident> {
    let ring = to_closed_ring(polygon);
    if ring.len() <= MIN_VERTICES {
        return Vec::new();
    }

    let Some(bbox) = bounding_box(&ring) else {
        return Vec::new();
    };
    let shape = to_geo_polygon(&ring);

    let members: Vec<Resident> = residents
        .iter()
        .filter(|r| {
            let (x, y) = (r.location.longitude, r.location.latitude);
            x >= bbox.min().x && x <= bbox.max().x && y >= bbox.min().y && y <= bbox.max().y
        })
        .filter(|r| shape.contains(&geo::Point::new(r.location.longitude, r.location.latitude)))
        .cloned()
        .collect();

    log::trace!(
        "{} of {} residents inside {}-vertex polygon",
        members.len(),
        residents.len(),
        ring.len() - 1
    );

    members
}
