//! Floor finding.
//!
//! A walking character hovers [`MIN_FLOOR_DIST`] above the ground so that
//! horizontal sweeps never scrape the floor. The floor is found by sweeping
//! the character box straight down, with a line trace from the box center
//! as a fallback when the sweep is inconclusive.
//!
//! # Caching
//!
//! While standing still on a static surface the last result is reused.
//! A fresh probe is forced after a teleport or height adjustment, when the
//! cached floor was not walkable, or when the base can move or no longer
//! blocks.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collision::{CollisionQuery, HitResult, QueryParams, ShrinkExtent, SurfaceId, TraceShape};

use super::config::MovementConfig;
use super::context::{MoveContext, KINDA_SMALL_NUMBER};

/// Clearance kept between the character and the floor.
pub const MIN_FLOOR_DIST: f32 = 2.0;

/// Largest clearance still treated as standing on the floor.
pub const MAX_FLOOR_DIST: f32 = 2.4;

/// How much narrower the retry sweep is when the floor sweep starts inside
/// adjacent geometry.
pub const SWEEP_EDGE_REJECT_DISTANCE: f32 = 0.15;

/// Result of a floor probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorResult {
    /// Something was hit below the character.
    pub blocking_hit: bool,

    /// The hit can be walked on. Never set without `blocking_hit`.
    pub walkable: bool,

    /// The result came from the line trace fallback.
    pub used_line_trace: bool,

    /// Distance from the box bottom to the floor, from the sweep.
    pub sweep_distance: f32,

    /// Distance from the box bottom to the floor, from the line trace.
    pub line_distance: f32,

    /// The hit that produced this result.
    pub hit: HitResult,
}

impl Default for FloorResult {
    fn default() -> Self {
        Self {
            blocking_hit: false,
            walkable: false,
            used_line_trace: false,
            sweep_distance: 0.0,
            line_distance: 0.0,
            hit: HitResult::default(),
        }
    }
}

impl FloorResult {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn is_walkable_floor(&self) -> bool {
        self.blocking_hit && self.walkable
    }

    #[inline]
    pub fn hit_normal(&self) -> Vec3 {
        self.hit.normal
    }

    #[inline]
    pub fn hit_surface(&self) -> Option<SurfaceId> {
        self.hit.surface
    }

    /// Distance to the floor from whichever probe produced the result.
    pub fn distance(&self) -> f32 {
        if self.used_line_trace {
            self.line_distance
        } else {
            self.sweep_distance
        }
    }

    fn set_from_sweep(&mut self, hit: HitResult, sweep_distance: f32, walkable: bool) {
        self.blocking_hit = hit.is_valid_blocking_hit();
        self.walkable = self.blocking_hit && walkable;
        self.used_line_trace = false;
        self.sweep_distance = sweep_distance;
        self.line_distance = 0.0;
        self.hit = hit;
    }

    fn set_from_line_trace(&mut self, hit: HitResult, sweep_distance: f32, line_distance: f32, walkable: bool) {
        // The sweep hit is kept for diagnostics; the line hit decides
        self.blocking_hit = hit.is_valid_blocking_hit();
        self.walkable = self.blocking_hit && walkable;
        self.used_line_trace = true;
        self.sweep_distance = sweep_distance;
        self.line_distance = line_distance;
        self.hit = hit;
    }
}

/// Whether a hit is a floor the character can stand on.
///
/// Vertical and overhanging surfaces never are.
#[inline]
pub fn is_walkable(hit: &HitResult, config: &MovementConfig) -> bool {
    hit.is_valid_blocking_hit() && hit.normal.z > config.walkable_floor_z
}

/// Probe for a floor below `location`.
///
/// `sweep_distance` must be at least `line_distance`; otherwise the call is
/// a contract violation and returns an empty result.
pub fn compute_floor_dist(
    world: &dyn CollisionQuery,
    config: &MovementConfig,
    params: &QueryParams,
    shape: TraceShape,
    location: Vec3,
    line_distance: f32,
    sweep_distance: f32,
) -> FloorResult {
    let mut floor = FloorResult::default();

    if sweep_distance < line_distance {
        log::error!(
            "Floor sweep distance {} is shorter than line distance {}",
            sweep_distance,
            line_distance
        );
        return floor;
    }

    let half_width = shape.half_width();
    let half_height = shape.half_height();
    let mut sweep_started_penetrating = false;

    if sweep_distance > 0.0 && half_width > 0.0 {
        let end = location - Vec3::Z * sweep_distance;
        let mut hit = world.sweep(shape, location, end, params);

        if hit.start_penetrating {
            // Usually a wall beside us; only what is below should count
            let narrow = shape.shrunk(ShrinkExtent::horizontal(SWEEP_EDGE_REJECT_DISTANCE + KINDA_SMALL_NUMBER));
            hit = world.sweep(narrow, location, end, params);
        }

        if hit.blocking_hit {
            sweep_started_penetrating = hit.start_penetrating;
            let max_penetration_adjust = MAX_FLOOR_DIST.max(2.0 * half_width);
            let sweep_result = (hit.time * sweep_distance).max(-max_penetration_adjust);
            let walkable = is_walkable(&hit, config) && sweep_result <= sweep_distance;

            floor.set_from_sweep(hit, sweep_result, walkable);
            if walkable {
                return floor;
            }
        }
    }

    // A clean miss means there is nothing within reach; only retry with a
    // line when the sweep hit something it couldn't use
    if !floor.blocking_hit && !sweep_started_penetrating {
        floor.sweep_distance = sweep_distance;
        return floor;
    }

    if line_distance > 0.0 {
        let trace_distance = line_distance + half_height;
        let hit = world.line_trace(location, location - Vec3::Z * trace_distance, params);

        if hit.blocking_hit && hit.time > 0.0 {
            let max_penetration_adjust = MAX_FLOOR_DIST.max(half_width);
            let line_result = (hit.time * trace_distance - half_height).max(-max_penetration_adjust);

            if line_result <= line_distance && is_walkable(&hit, config) {
                let sweep_result = floor.sweep_distance;
                floor.set_from_line_trace(hit, sweep_result, line_result, true);
                return floor;
            }
        }
    }

    floor.walkable = false;
    floor.sweep_distance = sweep_distance;
    floor
}

/// Height that leaves [`MIN_FLOOR_DIST`] of clearance above a floor
/// `floor_distance` below a box centered at `z`.
///
/// With `pixel_snap` the result is rounded half up to a whole unit above the
/// floor. If rounding would push the clearance outside
/// `(0, MAX_FLOOR_DIST]` the exact height is used.
pub fn settle_height(z: f32, floor_distance: f32, pixel_snap: bool) -> f32 {
    let resting = z - floor_distance;
    let exact = resting + MIN_FLOOR_DIST;
    if !pixel_snap {
        return exact;
    }

    let snapped = (resting + 0.5).floor() + MIN_FLOOR_DIST;
    let clearance = snapped - resting;
    if clearance > 0.0 && clearance <= MAX_FLOOR_DIST {
        snapped
    } else {
        exact
    }
}

impl MoveContext<'_> {
    /// Probe for the floor with this character's shape and filter.
    pub(crate) fn compute_floor_dist(&self, location: Vec3, line_distance: f32, sweep_distance: f32) -> FloorResult {
        compute_floor_dist(
            self.world,
            self.config,
            &self.params(),
            self.shape(),
            location,
            line_distance,
            sweep_distance,
        )
    }

    /// Find the floor below `location`, reusing the cached result when allowed.
    pub(crate) fn find_floor(&mut self, location: Vec3, can_use_cache: bool) -> FloorResult {
        if !self.has_valid_data() {
            return FloorResult::default();
        }

        // Reach slightly further while walking so a height adjustment can't
        // invalidate the result
        let height_check_adjust = if self.state.is_walking() {
            MAX_FLOOR_DIST + KINDA_SMALL_NUMBER
        } else {
            -MAX_FLOOR_DIST
        };
        let sweep_distance = MAX_FLOOR_DIST.max(height_check_adjust);
        let line_distance = sweep_distance;

        if self.config.always_check_floor
            || !can_use_cache
            || self.state.force_next_floor_check
            || self.state.just_teleported
        {
            self.state.force_next_floor_check = false;
            return self.compute_floor_dist(location, line_distance, sweep_distance);
        }

        let base = self.state.based.base;
        if let Some(id) = base {
            self.state.force_next_floor_check = match self.world.surface(id) {
                Some(surface) => !surface.blocks_characters() || surface.is_dynamic(),
                None => true,
            };
        }

        if !self.state.force_next_floor_check && base.is_some() && self.state.current_floor.is_walkable_floor() {
            log::trace!("Reusing cached floor at {:?}", location);
            return self.state.current_floor.clone();
        }

        self.state.force_next_floor_check = false;
        self.compute_floor_dist(location, line_distance, sweep_distance)
    }

    /// Snap the character back to the hover height above a walkable floor.
    pub(crate) fn adjust_floor_height(&mut self) {
        let floor = &self.state.current_floor;
        if !floor.is_walkable_floor() {
            return;
        }

        let mut old_distance = floor.sweep_distance;
        if floor.used_line_trace {
            if old_distance < MIN_FLOOR_DIST && floor.line_distance >= MIN_FLOOR_DIST {
                // Would let the character climb unwalkable walls
                log::trace!(
                    "Skipping floor adjustment (line {:.2}, sweep {:.2})",
                    floor.line_distance,
                    floor.sweep_distance
                );
                return;
            }
            old_distance = floor.line_distance;
        }

        if (old_distance - MIN_FLOOR_DIST).abs() <= KINDA_SMALL_NUMBER {
            return;
        }

        let z = self.state.position.z;
        let new_z = settle_height(z, old_distance, self.config.pixel_snap);
        self.state.position.z = new_z;

        let new_distance = old_distance + (new_z - z);
        if self.state.current_floor.used_line_trace {
            self.state.current_floor.line_distance = new_distance;
        } else {
            self.state.current_floor.sweep_distance = new_distance;
        }
        log::trace!("Adjusted floor height by {:.3}", new_z - z);

        // Popping out of the floor is not real motion
        self.state.just_teleported |= old_distance < 0.0;
        self.state.force_next_floor_check = true;
    }

    /// Whether a blocking hit while falling is somewhere to land.
    ///
    /// Hits must be walkable and in the lower quarter of the box; a
    /// penetrating hit must at least push upward. A floor must then be found
    /// at `location`. Does not touch any state.
    pub(crate) fn is_valid_landing_spot(&self, location: Vec3, hit: &HitResult) -> bool {
        if !hit.blocking_hit {
            return false;
        }

        if !hit.start_penetrating {
            if !is_walkable(hit, self.config) {
                return false;
            }

            let lower_band_z = hit.location.z - self.config.half_extents.z / 2.0;
            if hit.impact_point.z >= lower_band_z {
                return false;
            }
        } else if hit.normal.z < KINDA_SMALL_NUMBER {
            // Penetration next to a vertical or overhanging wall
            return false;
        }

        self.compute_floor_dist(location, MAX_FLOOR_DIST, MAX_FLOOR_DIST)
            .is_walkable_floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollisionWorld, ContentFlags, Mobility, Surface};
    use crate::movement::events::MovementEvent;
    use crate::movement::state::{MovementMode, MovementState};
    use glam::Vec2;

    fn create_test_world() -> CollisionWorld {
        let mut world = CollisionWorld::new();

        // Floor with its top at z=0
        world.add_box(Vec3::new(0.0, 0.0, -8.0), Vec3::new(200.0, 8.0, 8.0), ContentFlags::SOLID);

        // Wall whose left face is at x=100
        world.add_box(Vec3::new(108.0, 0.0, 40.0), Vec3::new(8.0, 8.0, 40.0), ContentFlags::SOLID);

        // 45 degree ramp rising to the left of x=-100
        world.add_convex_hull(
            &[Vec2::new(-200.0, 0.0), Vec2::new(-100.0, 0.0), Vec2::new(-200.0, 100.0)],
            ContentFlags::SOLID,
        );

        world
    }

    fn probe(world: &CollisionWorld, location: Vec3) -> FloorResult {
        let config = MovementConfig::default();
        compute_floor_dist(
            world,
            &config,
            &QueryParams::default(),
            config.character_shape(),
            location,
            MAX_FLOOR_DIST,
            MAX_FLOOR_DIST,
        )
    }

    #[test]
    fn test_floor_at_hover_height() {
        let world = create_test_world();
        let floor = probe(&world, Vec3::new(0.0, 0.0, 12.0));

        assert!(floor.is_walkable_floor());
        assert!(!floor.used_line_trace);
        assert!((floor.sweep_distance - 2.0).abs() < 1e-3, "dist={}", floor.sweep_distance);
        assert!((floor.hit_normal() - Vec3::Z).length() < 1e-4);
        assert_eq!(floor.hit_surface(), Some(SurfaceId(0)));
    }

    #[test]
    fn test_no_floor_out_of_reach() {
        let world = create_test_world();
        let floor = probe(&world, Vec3::new(0.0, 0.0, 20.0));

        assert!(!floor.blocking_hit);
        assert!(!floor.walkable);
        assert!((floor.sweep_distance - MAX_FLOOR_DIST).abs() < 1e-6);
    }

    #[test]
    fn test_floor_past_ledge_is_missing() {
        let world = create_test_world();
        let floor = probe(&world, Vec3::new(250.0, 0.0, 12.0));
        assert!(!floor.blocking_hit, "Nothing under the box past the edge");
    }

    #[test]
    fn test_floor_beside_wall() {
        let world = create_test_world();
        // Box right face touching the wall
        let floor = probe(&world, Vec3::new(91.0, 0.0, 12.0));
        assert!(floor.is_walkable_floor(), "The wall beside us must not hide the floor");
        assert!((floor.sweep_distance - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_floor_on_slope() {
        let world = create_test_world();
        // The bottom-left corner at x=-159 meets the ramp at z=59; hover 2 above that
        let floor = probe(&world, Vec3::new(-150.0, 0.0, 71.0));

        assert!(floor.is_walkable_floor(), "45 degree ramps are walkable");
        assert!((floor.sweep_distance - 2.0).abs() < 1e-3, "dist={}", floor.sweep_distance);
        assert!(floor.hit_normal().z > 0.7 && floor.hit_normal().x > 0.7);
    }

    #[test]
    fn test_walkable_rejects_walls() {
        let config = MovementConfig::default();
        let mut hit = HitResult::no_hit(Vec3::ZERO, Vec3::X);
        hit.blocking_hit = true;
        hit.normal = -Vec3::X;
        assert!(!is_walkable(&hit, &config));

        hit.normal = Vec3::Z;
        assert!(is_walkable(&hit, &config));

        hit.start_penetrating = true;
        assert!(!is_walkable(&hit, &config), "Penetrating hits are never walkable");
    }

    #[test]
    fn test_contract_violation_returns_no_floor() {
        let world = create_test_world();
        let config = MovementConfig::default();
        let floor = compute_floor_dist(
            &world,
            &config,
            &QueryParams::default(),
            config.character_shape(),
            Vec3::new(0.0, 0.0, 12.0),
            5.0,
            2.0,
        );
        assert!(!floor.blocking_hit);
        assert!(!floor.walkable);
    }

    #[test]
    fn test_walkable_implies_blocking() {
        let world = create_test_world();
        for x in [-250.0, -150.0, -100.0, 0.0, 91.0, 150.0, 250.0] {
            for z in [5.0, 10.0, 12.0, 12.4, 15.0, 71.0] {
                let floor = probe(&world, Vec3::new(x, 0.0, z));
                assert!(!floor.walkable || floor.blocking_hit, "x={} z={} {:?}", x, z, floor);
            }
        }
    }

    #[test]
    fn test_settle_height_rounding() {
        // Integer floor: exact hover
        assert!((settle_height(13.0, 3.0, true) - 12.0).abs() < 1e-6);

        // Resting height 10.3 rounds down to 10
        let z = settle_height(10.3, 0.0, true);
        assert!((z - 12.0).abs() < 1e-5, "Rounds the resting height down: {}", z);

        // 10.4 rounds down too, leaving 1.6 of clearance
        let z = settle_height(10.4, 0.0, true);
        assert!((z - 12.0).abs() < 1e-5, "z={}", z);

        // Tie rounds up, which would leave 2.5 clearance, so exact height wins
        let z = settle_height(10.5, 0.0, true);
        assert!((z - 12.5).abs() < 1e-5, "z={}", z);

        // Above the tie rounds up
        let z = settle_height(10.6, 0.0, true);
        assert!((z - 13.0).abs() < 1e-5, "z={}", z);

        // Without snapping the exact height is used
        assert!((settle_height(10.3, 0.0, false) - 12.3).abs() < 1e-5);
    }

    #[test]
    fn test_find_floor_uses_cache_on_static_base() {
        let world = create_test_world();
        let config = MovementConfig::default();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 12.0), &config);
        state.mode = MovementMode::Walking;
        let mut events: Vec<MovementEvent> = Vec::new();
        let mut ctx = MoveContext::new(&config, &world, &mut state, &mut events);

        let floor = ctx.find_floor(Vec3::new(0.0, 0.0, 12.0), false);
        assert!(floor.is_walkable_floor());
        ctx.state.current_floor = floor;
        ctx.state.based.base = Some(SurfaceId(0));

        // Cached result is returned even for a location with no floor
        let cached = ctx.find_floor(Vec3::new(0.0, 0.0, 500.0), true);
        assert!(cached.is_walkable_floor(), "Static base allows reuse");

        ctx.state.force_next_floor_check = true;
        let fresh = ctx.find_floor(Vec3::new(0.0, 0.0, 500.0), true);
        assert!(!fresh.blocking_hit, "Forced check recomputes");
        assert!(!ctx.state.force_next_floor_check, "Forced check consumes the flag");
    }

    #[test]
    fn test_find_floor_never_caches_moving_base() {
        let mut world = create_test_world();
        let platform = world.add_surface(
            Surface::rect("platform", Vec3::new(0.0, 0.0, 100.0), 20.0, 4.0, ContentFlags::PLATFORM)
                .with_mobility(Mobility::Movable),
        );
        let config = MovementConfig::default();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 116.0), &config);
        state.mode = MovementMode::Walking;
        let mut events = Vec::new();
        let mut ctx = MoveContext::new(&config, &world, &mut state, &mut events);

        let floor = ctx.find_floor(Vec3::new(0.0, 0.0, 116.0), false);
        assert_eq!(floor.hit_surface(), Some(platform));
        ctx.state.current_floor = floor;
        ctx.state.based.base = Some(platform);

        let again = ctx.find_floor(Vec3::new(0.0, 0.0, 500.0), true);
        assert!(!again.blocking_hit, "Dynamic bases force a fresh probe");
    }

    #[test]
    fn test_adjust_floor_height_restores_hover() {
        let world = create_test_world();
        let config = MovementConfig::default();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 10.0), &config);
        state.mode = MovementMode::Walking;
        let mut events = Vec::new();
        let mut ctx = MoveContext::new(&config, &world, &mut state, &mut events);

        // Resting directly on the floor after landing
        ctx.state.current_floor = ctx.compute_floor_dist(Vec3::new(0.0, 0.0, 10.0), MAX_FLOOR_DIST, MAX_FLOOR_DIST);
        assert!(ctx.state.current_floor.sweep_distance.abs() < 1e-3);

        ctx.adjust_floor_height();
        assert!((ctx.state.position.z - 12.0).abs() < 1e-3, "z={}", ctx.state.position.z);
        assert!((ctx.state.current_floor.sweep_distance - 2.0).abs() < 1e-3);
        assert!(ctx.state.force_next_floor_check);
    }

    #[test]
    fn test_landing_spot() {
        let world = create_test_world();
        let config = MovementConfig::default();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 50.0), &config);
        let mut events = Vec::new();
        let ctx = MoveContext::new(&config, &world, &mut state, &mut events);

        let hit = world.sweep(config.character_shape(), Vec3::new(0.0, 0.0, 50.0), Vec3::new(0.0, 0.0, 0.0), &ctx.params());
        assert!(hit.is_valid_blocking_hit());

        let first = ctx.is_valid_landing_spot(hit.location, &hit);
        let second = ctx.is_valid_landing_spot(hit.location, &hit);
        assert!(first, "Flat floor below is a landing spot");
        assert_eq!(first, second, "Verdict must not change between calls");

        // Hitting the wall is not a landing
        let wall = world.sweep(config.character_shape(), Vec3::new(50.0, 0.0, 30.0), Vec3::new(150.0, 0.0, 30.0), &ctx.params());
        assert!(wall.blocking_hit);
        assert!(!ctx.is_valid_landing_spot(wall.location, &wall));
    }

    #[test]
    fn test_landing_spot_lower_band_edge() {
        let world = create_test_world();
        let config = MovementConfig::default();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 50.0), &config);
        let mut events = Vec::new();
        let ctx = MoveContext::new(&config, &world, &mut state, &mut events);

        // Resting 1 above the floor, well within reach of the floor
        let location = Vec3::new(0.0, 0.0, 11.0);
        let band_z = location.z - config.half_extents.z / 2.0;
        let hit_at = |impact_z: f32| HitResult {
            blocking_hit: true,
            time: 0.5,
            location,
            impact_point: Vec3::new(9.0, 0.0, impact_z),
            normal: Vec3::Z,
            surface: Some(SurfaceId(0)),
            contents: ContentFlags::SOLID,
            ..HitResult::no_hit(Vec3::new(0.0, 0.0, 21.0), Vec3::new(0.0, 0.0, 1.0))
        };

        let graze = hit_at(band_z);
        assert!(is_walkable(&graze, &config));
        assert!(!ctx.is_valid_landing_spot(location, &graze), "Impact exactly on the band is a graze");

        let below = hit_at(band_z - 0.01);
        assert!(ctx.is_valid_landing_spot(location, &below), "Impact under the band lands");
    }
}
