//! Hit results, trace shapes and query parameters.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::flags::ContentFlags;
use super::surface::SurfaceId;

/// Result of a sweep or line trace through the world.
///
/// Sweeps move a shape from `trace_start` to `trace_end` and report the first
/// blocking contact along the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitResult {
    /// Whether the trace was stopped by something.
    pub blocking_hit: bool,

    /// Whether the shape already overlapped the hit surface at the start.
    ///
    /// In that case `time` is 0, `normal` is the direction that separates
    /// the shapes fastest and `penetration_depth` is how far to push.
    pub start_penetrating: bool,

    /// Fraction of the trace completed before the hit.
    ///
    /// - `1.0` = traveled the full distance (no collision)
    /// - `0.0` = blocked at the start
    pub time: f32,

    /// Distance traveled before the hit.
    pub distance: f32,

    /// Shape center at the time of impact.
    pub location: Vec3,

    /// Contact point on the struck surface.
    pub impact_point: Vec3,

    /// Surface normal at the contact, pointing away from the struck surface.
    /// Zero when nothing was hit.
    pub normal: Vec3,

    /// Overlap depth when `start_penetrating` is set.
    pub penetration_depth: f32,

    pub trace_start: Vec3,
    pub trace_end: Vec3,

    /// Surface that was hit, if any.
    pub surface: Option<SurfaceId>,

    /// Content flags of what was hit.
    pub contents: ContentFlags,
}

impl Default for HitResult {
    fn default() -> Self {
        Self::no_hit(Vec3::ZERO, Vec3::ZERO)
    }
}

impl HitResult {
    /// Create a result indicating the trace reached its end.
    pub fn no_hit(start: Vec3, end: Vec3) -> Self {
        Self {
            blocking_hit: false,
            start_penetrating: false,
            time: 1.0,
            distance: (end - start).length(),
            location: end,
            impact_point: end,
            normal: Vec3::ZERO,
            penetration_depth: 0.0,
            trace_start: start,
            trace_end: end,
            surface: None,
            contents: ContentFlags::EMPTY,
        }
    }

    /// A blocking hit that did not start inside the surface.
    #[inline]
    pub fn is_valid_blocking_hit(&self) -> bool {
        self.blocking_hit && !self.start_penetrating
    }

    /// Fraction of the trace left over after the hit.
    #[inline]
    pub fn remaining_fraction(&self) -> f32 {
        1.0 - self.time
    }
}

/// Per-axis amounts to shrink a box by before a query.
///
/// Each delta is subtracted from the matching half extent. Extents never
/// shrink below [`TraceShape::MIN_EXTENT`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShrinkExtent {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl ShrinkExtent {
    pub const NONE: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// Shrink only the horizontal extents.
    pub fn horizontal(amount: f32) -> Self {
        Self { x: amount, y: amount, z: 0.0 }
    }

    /// Shrink only the vertical extent.
    pub fn vertical(amount: f32) -> Self {
        Self { x: 0.0, y: 0.0, z: amount }
    }

    pub fn uniform(amount: f32) -> Self {
        Self { x: amount, y: amount, z: amount }
    }
}

/// Shape used for collision traces.
///
/// - **Box**: an axis-aligned box around the trace origin. Characters are boxes.
/// - **Point**: an infinitely small shape, used for line traces and probes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TraceShape {
    /// An axis-aligned box, centered on the trace origin.
    Box {
        /// Half-size in each axis (x, y, z).
        half_extents: Vec3,
    },

    /// A single point.
    Point,
}

impl TraceShape {
    /// Smallest half extent a shrunk box keeps.
    pub const MIN_EXTENT: f32 = 1.0e-3;

    pub fn from_half_extents(half_extents: Vec3) -> Self {
        Self::Box { half_extents }
    }

    /// Half extents of the shape (zero for a point).
    pub fn half_extents(&self) -> Vec3 {
        match self {
            Self::Box { half_extents } => *half_extents,
            Self::Point => Vec3::ZERO,
        }
    }

    #[inline]
    pub fn half_height(&self) -> f32 {
        self.half_extents().z
    }

    /// Horizontal reach of the shape along the side-scrolling axis.
    #[inline]
    pub fn half_width(&self) -> f32 {
        self.half_extents().x
    }

    /// Return a copy of this shape with each axis shrunk by `shrink`.
    pub fn shrunk(&self, shrink: ShrinkExtent) -> Self {
        match self {
            Self::Box { half_extents } => Self::Box {
                half_extents: Vec3::new(
                    (half_extents.x - shrink.x).max(Self::MIN_EXTENT),
                    (half_extents.y - shrink.y).max(Self::MIN_EXTENT),
                    (half_extents.z - shrink.z).max(Self::MIN_EXTENT),
                ),
            },
            Self::Point => Self::Point,
        }
    }

    /// Return a copy of this box with a different horizontal half-width.
    pub fn with_half_width(&self, half_width: f32) -> Self {
        match self {
            Self::Box { half_extents } => Self::Box {
                half_extents: Vec3::new(half_width, half_extents.y, half_extents.z),
            },
            Self::Point => Self::Point,
        }
    }

    /// Check if this is a point trace.
    #[inline]
    pub fn is_point(&self) -> bool {
        matches!(self, Self::Point)
    }
}

/// Filter for a collision query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Only surfaces whose contents intersect this mask are tested.
    pub mask: ContentFlags,

    /// Surface to skip, typically the querying character's own body.
    pub ignore: Option<SurfaceId>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self::character(None)
    }
}

impl QueryParams {
    /// Parameters for a character movement query.
    pub fn character(ignore: Option<SurfaceId>) -> Self {
        Self {
            mask: ContentFlags::MASK_CHARACTER_SOLID,
            ignore,
        }
    }

    pub fn with_mask(mut self, mask: ContentFlags) -> Self {
        self.mask = mask;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_hit() {
        let result = HitResult::no_hit(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        assert!(!result.blocking_hit);
        assert!(!result.is_valid_blocking_hit());
        assert_eq!(result.time, 1.0);
        assert_eq!(result.location, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(result.normal, Vec3::ZERO);
    }

    #[test]
    fn test_penetrating_hit_is_not_valid_blocking() {
        let mut result = HitResult::no_hit(Vec3::ZERO, Vec3::ZERO);
        result.blocking_hit = true;
        result.start_penetrating = true;
        assert!(!result.is_valid_blocking_hit());
    }

    #[test]
    fn test_shrink_per_axis() {
        let shape = TraceShape::from_half_extents(Vec3::new(9.0, 8.0, 10.0));
        let shrunk = shape.shrunk(ShrinkExtent::horizontal(0.5));
        assert_eq!(shrunk.half_extents(), Vec3::new(8.5, 7.5, 10.0));

        let shrunk = shape.shrunk(ShrinkExtent::vertical(2.0));
        assert_eq!(shrunk.half_extents(), Vec3::new(9.0, 8.0, 8.0));
    }

    #[test]
    fn test_shrink_never_collapses() {
        let shape = TraceShape::from_half_extents(Vec3::new(1.0, 1.0, 1.0));
        let shrunk = shape.shrunk(ShrinkExtent::uniform(5.0));
        assert_eq!(shrunk.half_extents(), Vec3::splat(TraceShape::MIN_EXTENT));

        assert_eq!(TraceShape::Point.shrunk(ShrinkExtent::uniform(1.0)), TraceShape::Point);
    }
}
