//! Swept box and point queries against a single convex polygon.
//!
//! The world is a side view, so every query runs in the XZ plane using
//! [`Vec2`] where `x` is world X and `y` is world Z. Geometry goes through
//! parry2d: shape casts for moving boxes, `contact` for initial overlap and
//! ray casts for points.
//!
//! Shapes within [`CONTACT_EPSILON`] of each other are touching, not
//! overlapping. Touching shapes only collide when moving into each other,
//! which lets a character slide along a floor it rests on without snagging
//! on tile seams.

use glam::Vec2;
use parry2d::math::{Isometry, Point, Real, Vector};
use parry2d::query::{self, PointQuery, Ray, RayCast, ShapeCastOptions};
use parry2d::shape::{ConvexPolygon, Cuboid};

/// Separation below which two shapes count as touching.
pub const CONTACT_EPSILON: f32 = 1.0e-3;

/// A contact found by [`sweep_box_polygon`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Fraction of the sweep completed at first contact.
    pub time: f32,
    /// Contact normal, pointing from the polygon toward the box.
    pub normal: Vec2,
    /// Contact point on the polygon boundary.
    pub point: Vec2,
    /// The shapes already overlapped at the start of the sweep.
    pub start_penetrating: bool,
    /// Overlap depth along `normal` when `start_penetrating` is set.
    pub depth: f32,
}

/// Sweep an axis-aligned box by `delta` against a convex, counter-clockwise
/// polygon given in world coordinates. A zero `half` sweeps a point.
///
/// A zero-length sweep doubles as an overlap test: it only reports a
/// penetrating contact.
pub fn sweep_box_polygon(center: Vec2, half: Vec2, delta: Vec2, polygon: &[Vec2]) -> Option<Contact> {
    let polygon = ConvexPolygon::from_convex_polyline(polygon.iter().map(|v| to_point(*v)).collect())?;

    if half.x <= 0.0 || half.y <= 0.0 {
        return sweep_point(&polygon, center, delta);
    }

    let cuboid = Cuboid::new(Vector::new(half.x, half.y));
    let polygon_pos = Isometry::identity();
    let box_pos = Isometry::translation(center.x, center.y);

    if let Ok(Some(overlap)) = query::contact(&polygon_pos, &polygon, &box_pos, &cuboid, 0.0) {
        if overlap.dist < -CONTACT_EPSILON {
            return Some(Contact {
                time: 0.0,
                normal: to_vec2(*overlap.normal1),
                point: Vec2::new(overlap.point1.x, overlap.point1.y),
                start_penetrating: true,
                depth: -overlap.dist,
            });
        }
    }

    if delta.length_squared() <= f32::EPSILON {
        return None;
    }

    let options = ShapeCastOptions {
        max_time_of_impact: 1.0,
        target_distance: 0.0,
        stop_at_penetration: true,
        compute_impact_geometry_on_penetration: true,
    };
    let hit = query::cast_shapes(
        &polygon_pos,
        &Vector::zeros(),
        &polygon,
        &box_pos,
        &to_vector(delta),
        &cuboid,
        options,
    )
    .ok()
    .flatten()?;

    let normal = to_vec2(*hit.normal1);
    if is_sliding_or_leaving(normal, delta) {
        return None;
    }

    Some(Contact {
        time: hit.time_of_impact.clamp(0.0, 1.0),
        normal,
        point: Vec2::new(hit.witness1.x, hit.witness1.y),
        start_penetrating: false,
        depth: 0.0,
    })
}

fn sweep_point(polygon: &ConvexPolygon, origin: Vec2, delta: Vec2) -> Option<Contact> {
    let identity = Isometry::identity();
    let start = to_point(origin);

    let projection = polygon.project_point(&identity, &start, false);
    let push = Vec2::new(projection.point.x, projection.point.y) - origin;
    if projection.is_inside && push.length() > CONTACT_EPSILON {
        return Some(Contact {
            time: 0.0,
            normal: push.normalize(),
            point: Vec2::new(projection.point.x, projection.point.y),
            start_penetrating: true,
            depth: push.length(),
        });
    }

    if delta.length_squared() <= f32::EPSILON {
        return None;
    }

    let ray = Ray::new(start, to_vector(delta));
    let hit = polygon.cast_ray_and_get_normal(&identity, &ray, 1.0, true)?;
    let normal = to_vec2(hit.normal);
    if is_sliding_or_leaving(normal, delta) {
        return None;
    }

    let point = ray.point_at(hit.time_of_impact);
    Some(Contact {
        time: hit.time_of_impact,
        normal,
        point: Vec2::new(point.x, point.y),
        start_penetrating: false,
        depth: 0.0,
    })
}

/// Motion that doesn't push into the surface it touches is not blocked.
fn is_sliding_or_leaving(normal: Vec2, delta: Vec2) -> bool {
    normal.dot(delta) >= -CONTACT_EPSILON * delta.length()
}

#[inline]
fn to_point(v: Vec2) -> Point<Real> {
    Point::new(v.x, v.y)
}

#[inline]
fn to_vector(v: Vec2) -> Vector<Real> {
    Vector::new(v.x, v.y)
}

#[inline]
fn to_vec2(v: Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}
