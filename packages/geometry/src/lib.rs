#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pure helpers for territory boundary rings.
//!
//! Boundaries are held in *canonical* form: an open ring whose last point
//! does not repeat the first. Anything leaving the process (overlap
//! checks, create/update payloads) is closed again with
//! [`to_closed_ring`] or [`boundary_geometry`], which also performs the
//! `(lat, lng)` → `[lng, lat]` axis swap.

use canvass_territory_models::Point;
use geo::{LineString, Polygon, Rect, coord};
use geojson::{Geometry, Value};
use thiserror::Error;

/// Coordinate tolerance, in degrees, below which two vertices are the same.
///
/// Absorbs floating-point noise from map library round-trips.
pub const COORDINATE_TOLERANCE: f64 = 1e-6;

/// Minimum number of distinct vertices in a valid boundary.
pub const MIN_VERTICES: usize = 3;

/// Errors converting wire geometries into boundaries.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The geometry was not a `Polygon`.
    #[error("Expected a Polygon geometry, got {kind}")]
    NotAPolygon {
        /// `GeoJSON` type name that was received.
        kind: String,
    },

    /// The polygon had no exterior ring or too few vertices.
    #[error("Polygon ring has {count} distinct vertices (need at least {MIN_VERTICES})")]
    TooFewVertices {
        /// Distinct vertices found.
        count: usize,
    },

    /// A position did not carry both longitude and latitude.
    #[error("Malformed position with {len} ordinates")]
    MalformedPosition {
        /// Number of ordinates in the position.
        len: usize,
    },
}

/// Whether two points differ by less than `tolerance` on both axes.
#[must_use]
pub fn points_equal(a: Point, b: Point, tolerance: f64) -> bool {
    (a.latitude - b.latitude).abs() < tolerance && (a.longitude - b.longitude).abs() < tolerance
}

/// Strips the closing point from a ring, if present.
///
/// Trailing repeats of the first point are all removed, so the result
/// never ends on its first point and a second call is a no-op.
#[must_use]
pub fn normalize(points: &[Point]) -> Vec<Point> {
    let mut ring = points.to_vec();
    while ring.len() > 1 && points_equal(ring[0], ring[ring.len() - 1], COORDINATE_TOLERANCE) {
        ring.pop();
    }
    ring
}

/// Compares two boundaries vertex by vertex after normalization.
///
/// Returns `false` when either side is absent or the vertex counts
/// differ. Vertex order and starting point matter: a rotated or reversed
/// ring is a different boundary.
#[must_use]
pub fn polygons_equal(a: Option<&[Point]>, b: Option<&[Point]>, tolerance: f64) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };

    let a = normalize(a);
    let b = normalize(b);

    a.len() == b.len()
        && a
            .iter()
            .zip(&b)
            .all(|(p, q)| points_equal(*p, *q, tolerance))
}

/// [`polygons_equal`] with [`COORDINATE_TOLERANCE`] for two present rings.
#[must_use]
pub fn same_shape(a: &[Point], b: &[Point]) -> bool {
    polygons_equal(Some(a), Some(b), COORDINATE_TOLERANCE)
}

/// Returns the ring with its first point re-appended, unless it is
/// already closed.
#[must_use]
pub fn to_closed_ring(points: &[Point]) -> Vec<Point> {
    let mut ring = points.to_vec();
    if let [first, .., last] = points {
        if !points_equal(*first, *last, COORDINATE_TOLERANCE) {
            ring.push(*first);
        }
    }
    ring
}

/// Builds a closed `[lng, lat]` `GeoJSON` `Polygon` for a boundary.
#[must_use]
pub fn boundary_geometry(points: &[Point]) -> Geometry {
    let ring = to_closed_ring(points)
        .into_iter()
        .map(|p| p.to_lng_lat().to_vec())
        .collect();
    Geometry::new(Value::Polygon(vec![ring]))
}

/// Reads a boundary back out of a `GeoJSON` `Polygon`.
///
/// Only the exterior ring is used. The result is normalized.
///
/// # Errors
///
/// Returns [`GeometryError`] if the geometry is not a polygon, a position
/// is malformed, or the ring has fewer than [`MIN_VERTICES`] vertices.
pub fn points_from_geometry(geometry: &Geometry) -> Result<Vec<Point>, GeometryError> {
    let Value::Polygon(rings) = &geometry.value else {
        return Err(GeometryError::NotAPolygon {
            kind: geometry.value.type_name().to_string(),
        });
    };

    let exterior = rings.first().map(Vec::as_slice).unwrap_or_default();
    let points = exterior
        .iter()
        .map(|position| match position.as_slice() {
            [lng, lat, ..] => Ok(Point::from_lng_lat([*lng, *lat])),
            other => Err(GeometryError::MalformedPosition { len: other.len() }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let points = normalize(&points);
    if points.len() < MIN_VERTICES {
        return Err(GeometryError::TooFewVertices {
            count: points.len(),
        });
    }

    Ok(points)
}

/// Converts a boundary into a [`geo::Polygon`] with `x = lng, y = lat`.
///
/// `geo` closes the exterior ring itself.
#[must_use]
pub fn to_geo_polygon(points: &[Point]) -> Polygon<f64> {
    let exterior: LineString<f64> = points
        .iter()
        .map(|p| coord! { x: p.longitude, y: p.latitude })
        .collect();
    Polygon::new(exterior, vec![])
}

/// Axis-aligned bounding box of a boundary, `x = lng, y = lat`.
///
/// Returns `None` for an empty input.
#[must_use]
pub fn bounding_box(points: &[Point]) -> Option<Rect<f64>> {
    let first = points.first()?;
    let (mut min_lat, mut max_lat) = (first.latitude, first.latitude);
    let (mut min_lng, mut max_lng) = (first.longitude, first.longitude);

    for p in &points[1..] {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Some(Rect::new(
        coord! { x: min_lng, y: min_lat },
        coord! { x: max_lng, y: max_lat },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
        ]
    }

    #[test]
    fn normalize_strips_closing_point() {
        let mut closed = square();
        closed.push(Point::new(0.0, 0.0));
        assert_eq!(normalize(&closed), square());
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut closed = square();
        closed.push(Point::new(0.000_000_1, 0.0));
        let once = normalize(&closed);
        assert_eq!(normalize(&once), once);
        assert_eq!(normalize(&square()), square());
    }

    #[test]
    fn normalize_is_idempotent_with_repeated_closing_points() {
        let mut closed = square();
        closed.push(square()[0]);
        closed.push(square()[0]);
        let once = normalize(&closed);
        assert_eq!(once, square());
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn normalize_leaves_single_point_alone() {
        let single = vec![Point::new(3.0, 4.0)];
        assert_eq!(normalize(&single), single);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn polygons_equal_absorbs_noise() {
        let noisy: Vec<Point> = square()
            .into_iter()
            .map(|p| Point::new(p.latitude + 5e-7, p.longitude - 5e-7))
            .collect();
        assert!(polygons_equal(
            Some(&square()),
            Some(&noisy),
            COORDINATE_TOLERANCE
        ));
    }

    #[test]
    fn polygons_equal_detects_real_edits() {
        let mut moved = square();
        moved[2] = Point::new(1.0, 1.01);
        assert!(!same_shape(&square(), &moved));
    }

    #[test]
    fn polygons_equal_is_order_sensitive() {
        let mut rotated = square();
        rotated.rotate_left(1);
        assert!(!same_shape(&square(), &rotated));

        let mut reversed = square();
        reversed.reverse();
        assert!(!same_shape(&square(), &reversed));
    }

    #[test]
    fn polygons_equal_requires_both_sides() {
        assert!(!polygons_equal(None, Some(&square()), COORDINATE_TOLERANCE));
        assert!(!polygons_equal(Some(&square()), None, COORDINATE_TOLERANCE));
        assert!(!polygons_equal(None, None, COORDINATE_TOLERANCE));
    }

    #[test]
    fn polygons_equal_ignores_closing_point() {
        let mut closed = square();
        closed.push(square()[0]);
        assert!(same_shape(&square(), &closed));
    }

    #[test]
    fn closed_ring_round_trips() {
        let ring = to_closed_ring(&square());
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[4], ring[0]);
        assert!(same_shape(&square(), &ring[..ring.len() - 1]));
    }

    #[test]
    fn closed_ring_does_not_double_close() {
        let ring = to_closed_ring(&square());
        assert_eq!(to_closed_ring(&ring), ring);
    }

    #[test]
    fn boundary_geometry_uses_lng_lat() {
        let triangle = vec![
            Point::new(41.0, -87.0),
            Point::new(41.5, -87.0),
            Point::new(41.5, -87.5),
        ];
        let json = serde_json::to_value(boundary_geometry(&triangle)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "Polygon",
                "coordinates": [[
                    [-87.0, 41.0],
                    [-87.0, 41.5],
                    [-87.5, 41.5],
                    [-87.0, 41.0]
                ]]
            })
        );
    }

    #[test]
    fn points_from_geometry_reverses_boundary_geometry() {
        let geometry = boundary_geometry(&square());
        let points = points_from_geometry(&geometry).unwrap();
        assert!(same_shape(&points, &square()));
        assert_eq!(points.len(), 4);
    }

    #[test]
    fn points_from_geometry_reads_lng_lat_positions() {
        let geometry = Geometry::new(Value::Polygon(vec![vec![
            vec![-87.0, 41.0],
            vec![-87.0, 41.5],
            vec![-87.5, 41.5],
            vec![-87.0, 41.0],
        ]]));
        let points = points_from_geometry(&geometry).unwrap();
        assert_eq!(
            points,
            vec![
                Point::new(41.0, -87.0),
                Point::new(41.5, -87.0),
                Point::new(41.5, -87.5),
            ]
        );
    }

    #[test]
    fn points_from_geometry_rejects_non_polygons() {
        let line = Geometry::new(Value::LineString(vec![vec![0.0, 0.0], vec![1.0, 1.0]]));
        assert!(matches!(
            points_from_geometry(&line),
            Err(GeometryError::NotAPolygon { .. })
        ));
    }

    #[test]
    fn points_from_geometry_rejects_degenerate_rings() {
        let geometry = Geometry::new(Value::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        ]]));
        assert!(matches!(
            points_from_geometry(&geometry),
            Err(GeometryError::TooFewVertices { count: 2 })
        ));
    }

    #[test]
    fn bounding_box_spans_ring() {
        let rect = bounding_box(&square()).unwrap();
        assert!((rect.min().x - 0.0).abs() < f64::EPSILON);
        assert!((rect.max().y - 1.0).abs() < f64::EPSILON);
        assert!(bounding_box(&[]).is_none());
    }
}
