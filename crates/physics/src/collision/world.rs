//! Collision world containing all static and moving geometry.
//!
//! The collision world is a registry of convex [`Surface`]s indexed by
//! [`SurfaceId`]. Removing a surface leaves its slot empty so handles held by
//! movement state never alias a newer surface.

use glam::{Quat, Vec2, Vec3};
use parry2d::math::{Point, Real};
use parry2d::shape::ConvexPolygon;

use super::flags::ContentFlags;
use super::query::CollisionQuery;
use super::surface::{Surface, SurfaceId};
use super::sweep::{sweep_box_polygon, Contact};
use super::trace::{HitResult, QueryParams, TraceShape};

/// The collision world containing all geometry.
#[derive(Debug, Clone, Default)]
pub struct CollisionWorld {
    surfaces: Vec<Option<Surface>>,
}

impl CollisionWorld {
    /// Create an empty collision world.
    pub fn new() -> Self {
        Self { surfaces: Vec::new() }
    }

    /// Register a surface and return its handle.
    pub fn add_surface(&mut self, surface: Surface) -> SurfaceId {
        let id = SurfaceId(self.surfaces.len() as u32);
        self.surfaces.push(Some(surface));
        id
    }

    /// Add an axis-aligned box to the world.
    ///
    /// # Arguments
    ///
    /// * `center` - Center position of the box in world space
    /// * `half_extents` - Half-size in each axis; Y is ignored
    /// * `contents` - Content flags for collision filtering
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3, contents: ContentFlags) -> SurfaceId {
        let name = format!("box{}", self.surfaces.len());
        self.add_surface(Surface::rect(name, center, half_extents.x, half_extents.z, contents))
    }

    /// Add the convex hull of `points` (world XZ) to the world.
    ///
    /// # Returns
    ///
    /// The surface handle, or `None` if the points don't span an area.
    pub fn add_convex_hull(&mut self, points: &[Vec2], contents: ContentFlags) -> Option<SurfaceId> {
        let hull = convex_hull(points)?;
        let name = format!("hull{}", self.surfaces.len());
        Some(self.add_surface(Surface::new(name, Vec3::ZERO, hull, contents)))
    }

    /// Remove a surface. Its handle stops resolving.
    pub fn remove_surface(&mut self, id: SurfaceId) -> Option<Surface> {
        self.surfaces.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Move a surface to a new transform.
    pub fn set_transform(&mut self, id: SurfaceId, position: Vec3, rotation: Quat) {
        if let Some(surface) = self.surface_mut(id) {
            surface.position = position;
            surface.rotation = rotation;
        }
    }

    /// Remove all collision geometry.
    pub fn clear(&mut self) {
        self.surfaces.clear();
    }

    /// Number of live surfaces.
    pub fn live_count(&self) -> usize {
        self.surfaces.iter().flatten().count()
    }

    /// Iterate over live surfaces.
    pub fn iter(&self) -> impl Iterator<Item = (SurfaceId, &Surface)> {
        self.surfaces
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (SurfaceId(i as u32), s)))
    }

    /// Whether `shape` at `position` overlaps any blocking surface.
    pub fn overlaps(&self, shape: TraceShape, position: Vec3, params: &QueryParams) -> bool {
        self.sweep(shape, position, position, params).start_penetrating
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    /// Surfaces the query may touch, after mask and bounds culling.
    fn candidates<'a>(
        &'a self,
        params: &'a QueryParams,
        sweep_lo: Vec2,
        sweep_hi: Vec2,
    ) -> impl Iterator<Item = (SurfaceId, &'a Surface, Vec<Vec2>)> + 'a {
        self.iter().filter_map(move |(id, surface)| {
            if !surface.collision_enabled || !surface.contents.intersects(params.mask) || params.ignore == Some(id) {
                return None;
            }
            let outline = surface.world_outline();
            let (lo, hi) = outline
                .iter()
                .fold((Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)), |(lo, hi), v| {
                    (lo.min(*v), hi.max(*v))
                });
            if hi.x < sweep_lo.x || lo.x > sweep_hi.x || hi.y < sweep_lo.y || lo.y > sweep_hi.y {
                return None;
            }
            Some((id, surface, outline))
        })
    }

    fn contacts(&self, shape: TraceShape, start: Vec3, end: Vec3, params: &QueryParams) -> Vec<(SurfaceId, Contact)> {
        let half = shape.half_extents();
        let half = Vec2::new(half.x, half.z);
        let center = Vec2::new(start.x, start.z);
        let delta = Vec2::new(end.x - start.x, end.z - start.z);

        let margin = half + Vec2::splat(1.0);
        let sweep_lo = center.min(center + delta) - margin;
        let sweep_hi = center.max(center + delta) + margin;

        self.candidates(params, sweep_lo, sweep_hi)
            .filter_map(|(id, _, outline)| sweep_box_polygon(center, half, delta, &outline).map(|c| (id, c)))
            .collect()
    }

    fn to_hit(&self, id: SurfaceId, contact: &Contact, start: Vec3, end: Vec3) -> HitResult {
        let location = start + (end - start) * contact.time;
        HitResult {
            blocking_hit: true,
            start_penetrating: contact.start_penetrating,
            time: contact.time,
            distance: (end - start).length() * contact.time,
            location,
            impact_point: Vec3::new(contact.point.x, location.y, contact.point.y),
            normal: Vec3::new(contact.normal.x, 0.0, contact.normal.y),
            penetration_depth: contact.depth,
            trace_start: start,
            trace_end: end,
            surface: Some(id),
            contents: self.surface(id).map(|s| s.contents).unwrap_or_default(),
        }
    }
}

/// Earlier hits win; at equal time an initial overlap wins, then the deeper one.
fn is_better(candidate: &Contact, best: &Contact) -> bool {
    if candidate.time != best.time {
        return candidate.time < best.time;
    }
    if candidate.start_penetrating != best.start_penetrating {
        return candidate.start_penetrating;
    }
    candidate.depth > best.depth
}

impl CollisionQuery for CollisionWorld {
    fn sweep(&self, shape: TraceShape, start: Vec3, end: Vec3, params: &QueryParams) -> HitResult {
        let mut best: Option<(SurfaceId, Contact)> = None;
        for (id, contact) in self.contacts(shape, start, end, params) {
            let replace = match &best {
                Some((_, current)) => is_better(&contact, current),
                None => true,
            };
            if replace {
                best = Some((id, contact));
            }
        }

        match best {
            Some((id, contact)) => self.to_hit(id, &contact, start, end),
            None => HitResult::no_hit(start, end),
        }
    }

    fn line_trace_multi(&self, start: Vec3, end: Vec3, params: &QueryParams) -> Vec<HitResult> {
        let mut contacts = self.contacts(TraceShape::Point, start, end, params);
        contacts.sort_by(|(a_id, a), (b_id, b)| a.time.total_cmp(&b.time).then(a_id.cmp(b_id)));
        contacts
            .iter()
            .map(|(id, contact)| self.to_hit(*id, contact, start, end))
            .collect()
    }

    fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn surface_count(&self) -> usize {
        self.surfaces.len()
    }
}

/// Counter-clockwise convex hull of `points`. `None` for degenerate input.
fn convex_hull(points: &[Vec2]) -> Option<Vec<Vec2>> {
    let points: Vec<Point<Real>> = points.iter().map(|p| Point::new(p.x, p.y)).collect();
    let hull = ConvexPolygon::from_convex_hull(&points)?;
    Some(hull.points().iter().map(|p| Vec2::new(p.x, p.y)).collect())
}

// ============================================================================
// Tests
// ============================================================================
