//! Surfaces: the pieces of world geometry a character can hit or stand on.
//!
//! Surfaces live in the [`CollisionWorld`](super::CollisionWorld) registry and
//! are referred to by [`SurfaceId`] handles. Movement state never holds a
//! surface directly, it re-resolves the handle on every lookup, so a removed
//! platform shows up as a handle that no longer resolves.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::flags::ContentFlags;

/// Handle to a surface in the collision registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u32);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a surface may move between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mobility {
    /// Never moves. Floor results on it may be cached.
    #[default]
    Static,
    /// Moves under external control (platforms, other characters).
    Movable,
}

/// A convex piece of geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Surface {
    /// Debug name.
    pub name: String,

    /// World position of the outline origin.
    pub position: Vec3,

    /// World rotation. Only rotation about the lateral (Y) axis is meaningful.
    pub rotation: Quat,

    /// Linear velocity, reported to characters standing on it.
    pub velocity: Vec3,

    /// Angular velocity (radians/second).
    pub angular_velocity: Vec3,

    pub mobility: Mobility,

    /// Content flags for collision filtering.
    pub contents: ContentFlags,

    /// Disabled surfaces are skipped by every query.
    pub collision_enabled: bool,

    /// Whether characters may use this surface as a base.
    pub can_be_base: bool,

    /// What this surface itself stands on. Only characters set this.
    pub base: Option<SurfaceId>,

    /// Convex outline in local XZ coordinates, counter-clockwise.
    outline: Vec<Vec2>,
}

impl Surface {
    /// Create a static solid surface from a convex, counter-clockwise outline.
    pub fn new(name: impl Into<String>, position: Vec3, outline: Vec<Vec2>, contents: ContentFlags) -> Self {
        Self {
            name: name.into(),
            position,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mobility: Mobility::Static,
            contents,
            collision_enabled: true,
            can_be_base: true,
            base: None,
            outline,
        }
    }

    /// Create a box surface centered on `position`.
    pub fn rect(name: impl Into<String>, position: Vec3, half_width: f32, half_height: f32, contents: ContentFlags) -> Self {
        let outline = vec![
            Vec2::new(-half_width, -half_height),
            Vec2::new(half_width, -half_height),
            Vec2::new(half_width, half_height),
            Vec2::new(-half_width, half_height),
        ];
        Self::new(name, position, outline, contents)
    }

    pub fn with_mobility(mut self, mobility: Mobility) -> Self {
        self.mobility = mobility;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Local outline.
    pub fn outline(&self) -> &[Vec2] {
        &self.outline
    }

    /// Outline transformed into world XZ coordinates.
    pub fn world_outline(&self) -> Vec<Vec2> {
        self.outline
            .iter()
            .map(|v| {
                let p = self.rotation * Vec3::new(v.x, 0.0, v.y) + self.position;
                Vec2::new(p.x, p.z)
            })
            .collect()
    }

    /// World-space bounds of the outline in XZ.
    pub fn world_bounds(&self) -> (Vec2, Vec2) {
        self.world_outline()
            .iter()
            .fold((Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            })
    }

    /// Surfaces that can move invalidate cached floor results.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.mobility == Mobility::Movable
    }

    /// Whether a character sweep would be stopped by this surface.
    #[inline]
    pub fn blocks_characters(&self) -> bool {
        self.collision_enabled && self.contents.blocks_characters()
    }

    /// Velocity of a point rigidly attached to this surface.
    pub fn point_velocity(&self, point: Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(point - self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_outline_is_ccw() {
        let surface = Surface::rect("tile", Vec3::new(8.0, 0.0, 8.0), 8.0, 8.0, ContentFlags::SOLID);
        let world = surface.world_outline();
        let area: f32 = (0..world.len())
            .map(|i| world[i].perp_dot(world[(i + 1) % world.len()]))
            .sum();
        assert!(area > 0.0, "Outline should wind counter-clockwise");
        assert_eq!(surface.world_bounds(), (Vec2::new(0.0, 0.0), Vec2::new(16.0, 16.0)));
    }

    #[test]
    fn test_rotated_outline() {
        let mut surface = Surface::rect("bar", Vec3::ZERO, 10.0, 1.0, ContentFlags::SOLID);
        surface.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let (lo, hi) = surface.world_bounds();
        assert!((hi.y - 10.0).abs() < 1e-3, "Quarter turn should stand the bar up: {:?}", hi);
        assert!((lo.x + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_point_velocity() {
        let mut surface = Surface::rect("wheel", Vec3::ZERO, 10.0, 10.0, ContentFlags::PLATFORM)
            .with_mobility(Mobility::Movable)
            .with_velocity(Vec3::new(5.0, 0.0, 0.0));
        surface.angular_velocity = Vec3::new(0.0, 1.0, 0.0);

        // w x r with w = +Y and r = +Z gives +X
        let v = surface.point_velocity(Vec3::new(0.0, 0.0, 10.0));
        assert!((v - Vec3::new(15.0, 0.0, 0.0)).length() < 1e-5, "v={:?}", v);
        assert!(surface.is_dynamic());
    }
}
