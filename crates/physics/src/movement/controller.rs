//! Character movement simulator.
//!
//! This is the main entry point for character movement. It takes per-tick
//! input and updates the movement state through the collision world.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collision::{CollisionQuery, QueryParams, SurfaceId};

use super::base::BaseError;
use super::config::MovementConfig;
use super::context::{MoveContext, KINDA_SMALL_NUMBER, SMALL_NUMBER};
use super::events::MovementEvent;
use super::floor::{compute_floor_dist, FloorResult, MAX_FLOOR_DIST, MIN_FLOOR_DIST};
use super::state::{MovementInput, MovementMode, MovementState};
use super::velocity::VelocitySolver;

/// How far below a spawn point the floor is looked for.
pub const SPAWN_PROBE_DISTANCE: f32 = 32.0;

/// How a radial impulse or force weakens with distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadialFalloff {
    /// Full strength everywhere inside the radius.
    #[default]
    Constant,
    /// Full strength at the origin, nothing at the radius.
    Linear,
}

/// Character movement simulator.
///
/// Handles all character movement physics including:
/// - Walking, falling and wall walking
/// - Jumps, sprint and externally applied forces
/// - Standing on moving platforms
/// - Collision response
///
/// The simulator holds only configuration; every call takes the state it
/// mutates and the world it queries.
///
/// # Example
///
/// ```ignore
/// let simulator = MovementSimulator::new(MovementConfig::default());
/// let mut state = MovementState::new(spawn_position, &simulator.config);
/// simulator.spawn_at(&mut state, spawn_position, &world);
///
/// // Each frame:
/// let events = simulator.tick(&mut state, &input, &world, delta_time);
/// ```
#[derive(Debug, Clone)]
pub struct MovementSimulator {
    /// Movement configuration.
    pub config: MovementConfig,
}

impl MovementSimulator {
    /// Create a new simulator with the given configuration.
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    /// Create a simulator with default configuration.
    pub fn with_default_config() -> Self {
        Self::new(MovementConfig::default())
    }

    /// Reset the character and place it at `spawn_pos`.
    ///
    /// Looks a short way down for a floor. If one is found the character is
    /// put at hover height above it and starts walking; otherwise it falls.
    /// The character keeps its collision body.
    pub fn spawn_at(&self, state: &mut MovementState, spawn_pos: Vec3, world: &dyn CollisionQuery) -> Vec<MovementEvent> {
        let body = state.body;
        *state = MovementState::new(spawn_pos, &self.config);
        state.body = body;

        let mut events = Vec::new();
        let mut ctx = MoveContext::new(&self.config, world, state, &mut events);
        if !ctx.has_valid_data() {
            return events;
        }

        let floor = ctx.compute_floor_dist(spawn_pos, SPAWN_PROBE_DISTANCE, SPAWN_PROBE_DISTANCE);
        if floor.is_walkable_floor() {
            ctx.state.position.z -= floor.distance() - MIN_FLOOR_DIST;
            ctx.set_movement_mode(MovementMode::Walking);
        }

        log::debug!("Spawned at {:?} ({})", ctx.state.position, ctx.state.mode);
        ctx.state.last_update_location = ctx.state.position;
        events
    }

    /// Advance the character by `delta_time` seconds.
    ///
    /// This is the main entry point that should be called each simulation
    /// tick. Returns what happened, in order.
    pub fn tick(
        &self,
        state: &mut MovementState,
        input: &MovementInput,
        world: &dyn CollisionQuery,
        delta_time: f32,
    ) -> Vec<MovementEvent> {
        let mut events = Vec::new();
        let mut ctx = MoveContext::new(&self.config, world, state, &mut events);

        if !ctx.has_valid_data() || delta_time <= 0.0 {
            return events;
        }

        if ctx.state.dead {
            ctx.state.velocity = Vec3::ZERO;
            return events;
        }

        self.apply_input_events(&mut ctx, input);
        ctx.update_based_movement();
        ctx.check_jump_input();

        let solver = VelocitySolver::new(&self.config);
        let max_acceleration = ctx.state.max_acceleration;
        let requested = ctx.constrain_direction(ctx.constrain_input_acceleration(input.acceleration));
        let acceleration = solver.scale_input_acceleration(requested, max_acceleration);
        ctx.state.acceleration = acceleration;
        ctx.state.analog_input_modifier = solver.analog_input_modifier(acceleration, max_acceleration);

        ctx.perform_movement(delta_time);
        events
    }

    fn apply_input_events(&self, ctx: &mut MoveContext<'_>, input: &MovementInput) {
        let solver = VelocitySolver::new(&self.config);
        if input.sprint_start {
            solver.start_sprint(ctx.state);
        }
        if input.sprint_stop {
            solver.stop_sprint(ctx.state);
        }

        if input.jump_pressed && self.config.jump_enabled {
            let vertical_velocity = ctx.state.velocity.z;
            ctx.state.jump.press(vertical_velocity);
        }
        if input.jump_released {
            ctx.reset_jump_state();
        }
    }

    // ========================================================================
    // Repositioning
    // ========================================================================

    /// Move the character to `position` without sweeping.
    ///
    /// The floor is probed again at the new spot: a walkable floor within
    /// reach keeps (or starts) walking, anything else makes the character
    /// fall.
    pub fn teleport(&self, state: &mut MovementState, position: Vec3, world: &dyn CollisionQuery) -> Vec<MovementEvent> {
        let mut events = Vec::new();
        let mut ctx = MoveContext::new(&self.config, world, state, &mut events);
        if !ctx.has_valid_data() {
            return events;
        }

        ctx.state.position = position;
        ctx.state.just_teleported = true;
        ctx.state.force_next_floor_check = true;

        let was_falling = ctx.state.is_falling();
        let floor = ctx.find_floor(position, false);
        let grounded =
            floor.is_walkable_floor() && floor.distance() <= MAX_FLOOR_DIST && ctx.state.velocity.z <= 0.0;

        if grounded {
            let hit = floor.hit.clone();
            ctx.state.current_floor = floor;
            if was_falling {
                ctx.process_landed(&hit, 0.0, 0);
            } else if ctx.state.is_walking() {
                ctx.adjust_floor_height();
                ctx.set_base_from_floor();
            }
        } else {
            ctx.state.current_floor.clear();
            if !was_falling && ctx.state.mode != MovementMode::None {
                ctx.set_movement_mode(MovementMode::Falling);
            }
        }

        ctx.save_base_location();
        ctx.state.last_update_location = ctx.state.position;
        log::debug!("Teleported to {:?} ({})", ctx.state.position, ctx.state.mode);
        events
    }

    // ========================================================================
    // Forces
    // ========================================================================

    /// Queue an impulse for the next tick.
    ///
    /// With `velocity_change` the impulse is a raw velocity change;
    /// otherwise it is divided by the character's mass.
    pub fn add_impulse(&self, state: &mut MovementState, impulse: Vec3, velocity_change: bool) {
        if impulse == Vec3::ZERO || !state.active {
            return;
        }

        if velocity_change {
            state.pending_impulse += impulse;
        } else if self.config.mass > SMALL_NUMBER {
            state.pending_impulse += impulse / self.config.mass;
        } else {
            log::warn!("Attempt to apply impulse {:?} to a character with zero mass", impulse);
        }
    }

    /// Queue a force to act over the next tick.
    pub fn add_force(&self, state: &mut MovementState, force: Vec3) {
        if force == Vec3::ZERO || !state.active {
            return;
        }

        if self.config.mass > SMALL_NUMBER {
            state.pending_force += force / self.config.mass;
        } else {
            log::warn!("Attempt to apply force {:?} to a character with zero mass", force);
        }
    }

    /// Impulse pushing away from `origin`, if the character is within `radius`.
    pub fn add_radial_impulse(
        &self,
        state: &mut MovementState,
        origin: Vec3,
        radius: f32,
        strength: f32,
        falloff: RadialFalloff,
        velocity_change: bool,
    ) {
        if let Some(impulse) = radial_push(state.position, origin, radius, strength, falloff) {
            self.add_impulse(state, impulse, velocity_change);
        }
    }

    /// Force pushing away from `origin`, if the character is within `radius`.
    pub fn add_radial_force(
        &self,
        state: &mut MovementState,
        origin: Vec3,
        radius: f32,
        strength: f32,
        falloff: RadialFalloff,
    ) {
        if let Some(force) = radial_push(state.position, origin, radius, strength, falloff) {
            self.add_force(state, force);
        }
    }

    /// Queue a launch. The components not overridden are added to the
    /// current velocity; the result replaces velocity next tick.
    pub fn launch(&self, state: &mut MovementState, launch_velocity: Vec3, xy_override: bool, z_override: bool) {
        if !state.active {
            return;
        }

        let mut velocity = launch_velocity;
        if !xy_override {
            velocity.x += state.velocity.x;
            velocity.y += state.velocity.y;
        }
        if !z_override {
            velocity.z += state.velocity.z;
        }
        state.pending_launch_velocity = velocity;
    }

    // ========================================================================
    // Mode control
    // ========================================================================

    pub fn sprint_start(&self, state: &mut MovementState) {
        VelocitySolver::new(&self.config).start_sprint(state);
    }

    pub fn sprint_stop(&self, state: &mut MovementState) {
        VelocitySolver::new(&self.config).stop_sprint(state);
    }

    /// Stop simulating the character until its mode is set again.
    pub fn disable_movement(&self, state: &mut MovementState, world: &dyn CollisionQuery) -> Vec<MovementEvent> {
        let mut events = Vec::new();
        let mut ctx = MoveContext::new(&self.config, world, state, &mut events);
        ctx.set_movement_mode(MovementMode::None);
        events
    }

    pub fn stop_movement_immediately(&self, state: &mut MovementState) {
        state.velocity = Vec3::ZERO;
        state.acceleration = Vec3::ZERO;
    }

    /// Stand on `base` (or nothing), refusing bases that would form a cycle.
    pub fn set_base(
        &self,
        state: &mut MovementState,
        base: Option<SurfaceId>,
        world: &dyn CollisionQuery,
    ) -> Result<Vec<MovementEvent>, BaseError> {
        let mut events = Vec::new();
        let mut ctx = MoveContext::new(&self.config, world, state, &mut events);
        ctx.set_base(base)?;
        Ok(events)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Probe for a floor below `location` without touching the cache.
    pub fn find_floor(&self, state: &MovementState, location: Vec3, world: &dyn CollisionQuery) -> FloorResult {
        let reach = if state.is_walking() {
            MAX_FLOOR_DIST + KINDA_SMALL_NUMBER
        } else {
            MAX_FLOOR_DIST
        };
        compute_floor_dist(
            world,
            &self.config,
            &QueryParams::character(state.body),
            self.config.character_shape(),
            location,
            reach,
            reach,
        )
    }

    /// Apex height of an untouched jump.
    pub fn max_jump_height(&self) -> f32 {
        let gravity = self.config.gravity();
        if gravity.abs() > KINDA_SMALL_NUMBER {
            let jump = self.config.jump_z_velocity;
            jump * jump / (-2.0 * gravity)
        } else {
            0.0
        }
    }

    /// Apex height of a jump held for the full hold time.
    pub fn max_jump_height_with_jump_time(&self) -> f32 {
        let max_height = self.max_jump_height();
        if self.config.jump_max_hold_time > 0.0 {
            self.config.jump_max_hold_time * self.config.jump_z_velocity + max_height
        } else {
            max_height
        }
    }
}

/// Push away from `origin` scaled by `falloff`, or `None` outside `radius`.
fn radial_push(position: Vec3, origin: Vec3, radius: f32, strength: f32, falloff: RadialFalloff) -> Option<Vec3> {
    let delta = position - origin;
    let distance = delta.length();
    if distance > radius {
        return None;
    }

    let mut magnitude = strength;
    if falloff == RadialFalloff::Linear && radius > 0.0 {
        magnitude *= 1.0 - distance / radius;
    }
    Some(delta.normalize_or_zero() * magnitude)
}

impl MoveContext<'_> {
    /// One tick of movement once input has been consumed.
    fn perform_movement(&mut self, dt: f32) {
        if self.state.is_walking() && self.state.position != self.state.last_update_location {
            self.state.force_next_floor_check = true;
        }

        self.apply_accumulated_forces(dt);

        let launch = self.state.pending_launch_velocity;
        if launch != Vec3::ZERO {
            self.state.velocity = launch;
            self.set_movement_mode(MovementMode::Falling);
            self.state.force_next_floor_check = true;
        }
        self.clear_accumulated_forces();

        self.state.jump.clear_input(dt, self.config);

        self.start_new_physics(dt, 0);

        self.save_base_location();
        self.state.last_update_location = self.state.position;
        self.state.last_update_rotation = self.state.rotation;
        self.state.last_update_velocity = self.state.velocity;

        log::trace!(
            "{} at {:?} moving {:?}",
            self.state.mode,
            self.state.position,
            self.state.velocity
        );
    }

    fn apply_accumulated_forces(&mut self, dt: f32) {
        let impulse = self.state.pending_impulse;
        let force = self.state.pending_force;

        // Enough upward push leaves the ground
        if self.state.is_walking()
            && impulse.z + force.z * dt + self.config.gravity() * dt > SMALL_NUMBER
        {
            self.set_movement_mode(MovementMode::Falling);
        }

        self.state.velocity += impulse + force * dt;
        self.state.pending_impulse = Vec3::ZERO;
        self.state.pending_force = Vec3::ZERO;
    }

    fn clear_accumulated_forces(&mut self) {
        self.state.pending_impulse = Vec3::ZERO;
        self.state.pending_force = Vec3::ZERO;
        self.state.pending_launch_velocity = Vec3::ZERO;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollisionWorld, ContentFlags, Mobility, Surface};

    const DT: f32 = 1.0 / 60.0;

    /// Flat floor from x=-400 to 400 with its top at z=0.
    fn create_test_world() -> (CollisionWorld, SurfaceId) {
        let mut world = CollisionWorld::new();
        let floor = world.add_box(Vec3::new(0.0, 0.0, -8.0), Vec3::new(400.0, 8.0, 8.0), ContentFlags::SOLID);
        (world, floor)
    }

    /// Floor that ends at x=0.
    fn create_ledge_world() -> CollisionWorld {
        let mut world = CollisionWorld::new();
        world.add_box(Vec3::new(-200.0, 0.0, -8.0), Vec3::new(200.0, 8.0, 8.0), ContentFlags::SOLID);
        world
    }

    fn spawned(simulator: &MovementSimulator, world: &CollisionWorld, position: Vec3) -> MovementState {
        let mut state = MovementState::new(position, &simulator.config);
        simulator.spawn_at(&mut state, position, world);
        state
    }

    #[test]
    fn test_spawn_at_finds_ground() {
        let (world, floor) = create_test_world();
        let simulator = MovementSimulator::with_default_config();

        let state = spawned(&simulator, &world, Vec3::new(0.0, 0.0, 30.0));

        assert!(state.is_walking(), "Should be walking");
        assert!((state.position.z - 12.0).abs() < 1e-3, "Should hover above the floor: {}", state.position.z);
        assert_eq!(state.base(), Some(floor));
    }

    #[test]
    fn test_spawn_at_no_ground() {
        let world = CollisionWorld::new();
        let simulator = MovementSimulator::with_default_config();

        let state = spawned(&simulator, &world, Vec3::new(0.0, 0.0, 500.0));

        assert!(state.is_falling());
        assert_eq!(state.position, Vec3::new(0.0, 0.0, 500.0));
    }

    #[test]
    fn test_gravity() {
        let world = CollisionWorld::new();
        let simulator = MovementSimulator::with_default_config();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 500.0), &simulator.config);

        simulator.tick(&mut state, &MovementInput::default(), &world, 0.1);

        assert!(state.velocity.z < 0.0, "Should be falling");
        assert!(state.position.z < 500.0);
    }

    #[test]
    fn test_rest_on_flat_floor() {
        let (world, _) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(0.0, 0.0, 12.0));
        let start = state.position;

        for _ in 0..60 {
            let events = simulator.tick(&mut state, &MovementInput::default(), &world, DT);
            assert!(events.iter().all(|e| !matches!(e, MovementEvent::ModeChanged { .. })));
        }

        assert!(state.is_walking());
        assert_eq!(state.velocity, Vec3::ZERO);
        assert!((state.position - start).length() < 1e-5, "Should not drift: {:?}", state.position);
    }

    #[test]
    fn test_walk_off_ledge() {
        let world = create_ledge_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(-20.0, 0.0, 12.0));
        state.velocity = Vec3::new(simulator.config.max_walk_speed, 0.0, 0.0);
        let input = MovementInput::lateral(1.0);

        let mut transitioned = false;
        for _ in 0..120 {
            let before = state.position;
            let events = simulator.tick(&mut state, &input, &world, DT);

            let fell = events.contains(&MovementEvent::ModeChanged {
                from: MovementMode::Walking,
                to: MovementMode::Falling,
            });
            if fell {
                transitioned = true;
                assert!(state.is_falling());
                assert!(
                    (state.velocity.x - simulator.config.max_walk_speed).abs() < 1e-3,
                    "Horizontal speed kept across the edge: {}",
                    state.velocity.x
                );

                // Walking and falling together cover the whole tick
                let moved = state.position.x - before.x;
                assert!(
                    (moved - simulator.config.max_walk_speed * DT).abs() < 1e-3,
                    "Tick time lost at the edge: moved {}",
                    moved
                );
                break;
            }
        }
        assert!(transitioned, "Never left the ledge");

        simulator.tick(&mut state, &input, &world, DT);
        assert!(state.velocity.z < 0.0, "Gravity applies once falling");
    }

    #[test]
    fn test_fast_fall_lands() {
        let (world, floor) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 300.0), &simulator.config);
        state.velocity = Vec3::new(0.0, 0.0, -1500.0);

        let mut landed = None;
        for _ in 0..60 {
            let events = simulator.tick(&mut state, &MovementInput::default(), &world, DT);
            landed = events.iter().find_map(|e| match e {
                MovementEvent::Landed { surface, .. } => Some(*surface),
                _ => None,
            });
            if landed.is_some() {
                break;
            }
        }

        assert_eq!(landed, Some(Some(floor)));
        assert!(state.is_walking());
        assert_eq!(state.velocity.z, 0.0);
        assert!(state.current_floor.is_walkable_floor());
        assert_eq!(state.current_floor.hit_surface(), Some(floor));
        assert!((state.position.z - 12.0).abs() < 1e-3, "Settled at hover height: {}", state.position.z);
    }

    #[test]
    fn test_jump_and_land() {
        let (world, _) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(0.0, 0.0, 12.0));

        let events = simulator.tick(&mut state, &MovementInput::default().with_jump_pressed(), &world, DT);
        assert!(events.contains(&MovementEvent::Jumped { count: 1 }));
        assert!(state.is_falling());

        let release = MovementInput::default().with_jump_released();
        simulator.tick(&mut state, &release, &world, DT);

        let mut peak = state.position.z;
        for _ in 0..120 {
            simulator.tick(&mut state, &MovementInput::default(), &world, DT);
            peak = peak.max(state.position.z);
            if state.is_walking() {
                break;
            }
        }

        assert!(state.is_walking(), "Should land again");
        assert!(peak > 30.0, "Jump too low: {}", peak);
        assert!(peak - 12.0 <= simulator.max_jump_height_with_jump_time() + 1.0);
    }

    #[test]
    fn test_wall_walk_budget() {
        let (world, _) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = MovementState::new(Vec3::new(-300.0, 0.0, 300.0), &simulator.config);
        state.velocity = Vec3::new(40.0, 0.0, -10.0);

        let input = MovementInput::lateral(1.0);
        let events = simulator.tick(&mut state, &input.with_jump_pressed(), &world, DT);
        assert!(events.contains(&MovementEvent::WallWalkStarted));
        assert!(state.is_wall_walking());
        let glide_height = state.position.z;

        for _ in 0..55 {
            simulator.tick(&mut state, &input, &world, DT);
        }
        assert!(state.is_wall_walking(), "Still inside the hold budget");
        assert!((state.position.z - glide_height).abs() < 1e-3, "Wall walking holds height");

        for _ in 0..8 {
            simulator.tick(&mut state, &input, &world, DT);
        }
        assert!(state.is_falling(), "Budget of 1s exhausted");
        assert!(!state.jump.wall_walk_toggle, "Only one wall walk per airtime");
    }

    #[test]
    fn test_wall_walk_release_ends_early() {
        let world = CollisionWorld::new();
        let simulator = MovementSimulator::with_default_config();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 300.0), &simulator.config);
        state.velocity = Vec3::new(40.0, 0.0, -10.0);

        let input = MovementInput::lateral(1.0);
        simulator.tick(&mut state, &input.with_jump_pressed(), &world, DT);
        assert!(state.is_wall_walking());

        simulator.tick(&mut state, &input.with_jump_released(), &world, DT);
        assert!(state.is_falling());
    }

    fn create_platform_world() -> (CollisionWorld, SurfaceId) {
        let mut world = CollisionWorld::new();
        let platform = world.add_surface(
            Surface::rect("lift", Vec3::new(0.0, 0.0, 100.0), 40.0, 4.0, ContentFlags::PLATFORM)
                .with_mobility(Mobility::Movable)
                .with_velocity(Vec3::new(30.0, 0.0, 0.0)),
        );
        (world, platform)
    }

    #[test]
    fn test_jump_off_moving_platform_keeps_its_velocity() {
        let (world, platform) = create_platform_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(0.0, 0.0, 116.0));
        assert_eq!(state.base(), Some(platform));

        simulator.tick(&mut state, &MovementInput::default().with_jump_pressed(), &world, DT);

        assert!(state.is_falling());
        assert!(state.velocity.x > 25.0, "Platform velocity imparted: {}", state.velocity.x);
        assert!(
            state.velocity.z > 350.0 && state.velocity.z <= simulator.config.jump_z_velocity,
            "Vertical velocity comes from the jump: {}",
            state.velocity.z
        );
        assert_eq!(state.base(), None);
    }

    #[test]
    fn test_jump_off_moving_platform_without_impart() {
        let (world, _) = create_platform_world();
        let mut config = MovementConfig::default();
        config.impart_base_velocity_x = false;
        config.impart_base_velocity_y = false;
        let simulator = MovementSimulator::new(config);
        let mut state = spawned(&simulator, &world, Vec3::new(0.0, 0.0, 116.0));

        simulator.tick(&mut state, &MovementInput::default().with_jump_pressed(), &world, DT);

        assert!(state.is_falling());
        assert!(state.velocity.x.abs() < 1e-3, "Nothing imparted: {}", state.velocity.x);
        assert!(state.velocity.z > 350.0);
    }

    #[test]
    fn test_velocity_cap() {
        let (world, _) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(-300.0, 0.0, 12.0));
        let input = MovementInput::lateral(1.0);

        for _ in 0..120 {
            simulator.tick(&mut state, &input, &world, DT);
            assert!(
                state.horizontal_speed() <= simulator.config.max_walk_speed + 1e-3,
                "Over the walk cap: {}",
                state.horizontal_speed()
            );
        }
        assert!((state.horizontal_speed() - simulator.config.max_walk_speed).abs() < 1e-3);

        simulator.sprint_start(&mut state);
        for _ in 0..120 {
            simulator.tick(&mut state, &input, &world, DT);
            assert!(state.horizontal_speed() <= simulator.config.sprint_max_walk_speed + 1e-3);
        }
        assert!(state.horizontal_speed() > simulator.config.max_walk_speed);
    }

    #[test]
    fn test_sprint_stop_decays() {
        let (world, _) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(-300.0, 0.0, 12.0));
        state.velocity = Vec3::new(100.0, 0.0, 0.0);
        simulator.sprint_start(&mut state);

        let stop = MovementInput {
            sprint_stop: true,
            ..MovementInput::lateral(1.0)
        };
        simulator.tick(&mut state, &stop, &world, DT);
        assert!(state.horizontal_speed() > simulator.config.max_walk_speed, "No snap to the walk cap");

        for _ in 0..240 {
            simulator.tick(&mut state, &MovementInput::lateral(1.0), &world, DT);
        }
        assert!(state.horizontal_speed() <= simulator.config.max_walk_speed + 1e-3);
        assert!(!state.sprint_stop);
    }

    #[test]
    fn test_no_cycle_basing() {
        let (mut world, floor) = create_test_world();
        let body = world.add_surface(
            Surface::rect("player", Vec3::new(0.0, 0.0, 12.0), 9.0, 10.0, ContentFlags::CHARACTER_BODY)
                .with_mobility(Mobility::Movable),
        );
        let rider = world.add_box(Vec3::new(100.0, 0.0, 50.0), Vec3::new(10.0, 8.0, 2.0), ContentFlags::PLATFORM);
        if let Some(surface) = world.surface_mut(rider) {
            surface.base = Some(body);
        }

        let simulator = MovementSimulator::with_default_config();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 12.0), &simulator.config).with_body(body);
        simulator.spawn_at(&mut state, Vec3::new(0.0, 0.0, 12.0), &world);
        assert_eq!(state.base(), Some(floor));

        let result = simulator.set_base(&mut state, Some(rider), &world);
        assert!(matches!(result, Err(BaseError::Cycle { .. })));
        assert_eq!(state.base(), Some(floor), "Rejected base leaves the old one");
    }

    #[test]
    fn test_teleport_into_air_falls() {
        let (world, _) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(0.0, 0.0, 12.0));

        let events = simulator.teleport(&mut state, Vec3::new(50.0, 0.0, 200.0), &world);

        assert!(state.is_falling());
        assert!(state.just_teleported);
        assert_eq!(state.base(), None);
        assert!(events.iter().any(|e| matches!(e, MovementEvent::ModeChanged { .. })));
    }

    #[test]
    fn test_teleport_onto_floor_lands() {
        let (world, floor) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 200.0), &simulator.config);

        let events = simulator.teleport(&mut state, Vec3::new(30.0, 0.0, 12.0), &world);

        assert!(state.is_walking());
        assert_eq!(state.base(), Some(floor));
        assert!(events.iter().any(|e| matches!(e, MovementEvent::Landed { .. })));
    }

    #[test]
    fn test_teleport_flag_clears_while_falling() {
        // Tall wall whose left face is at x=192
        let mut world = CollisionWorld::new();
        world.add_box(Vec3::new(200.0, 0.0, 300.0), Vec3::new(8.0, 8.0, 400.0), ContentFlags::SOLID);
        let simulator = MovementSimulator::with_default_config();
        let mut state = MovementState::new(Vec3::new(170.0, 0.0, 600.0), &simulator.config);

        simulator.teleport(&mut state, Vec3::new(170.0, 0.0, 600.0), &world);
        assert!(state.just_teleported);

        simulator.tick(&mut state, &MovementInput::default(), &world, DT);
        assert!(!state.just_teleported, "Only the tick after a teleport is flagged");

        for _ in 0..29 {
            simulator.tick(&mut state, &MovementInput::default(), &world, DT);
        }
        assert!(state.is_falling());
        assert!(!state.just_teleported);

        // Flying into the wall must give up the velocity pushing into it
        state.velocity.x = 600.0;
        for _ in 0..10 {
            simulator.tick(&mut state, &MovementInput::default(), &world, DT);
        }
        assert!(state.is_falling());
        assert!(state.position.x <= 192.0 - 9.0 + 0.01, "Stopped at the wall: x={}", state.position.x);
        assert!(state.velocity.x.abs() < 1.0, "Wall hit cancels vx={}", state.velocity.x);
    }

    #[test]
    fn test_teleport_wall_walker_into_air_falls() {
        let world = CollisionWorld::new();
        let simulator = MovementSimulator::with_default_config();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 300.0), &simulator.config);
        state.velocity = Vec3::new(40.0, 0.0, -10.0);

        simulator.tick(&mut state, &MovementInput::lateral(1.0).with_jump_pressed(), &world, DT);
        assert!(state.is_wall_walking());

        let events = simulator.teleport(&mut state, Vec3::new(0.0, 0.0, 900.0), &world);

        assert!(state.is_falling(), "mode after teleport: {}", state.mode);
        assert!(events.iter().any(|e| matches!(
            e,
            MovementEvent::ModeChanged { from: MovementMode::WallWalking, to: MovementMode::Falling }
        )));
    }

    #[test]
    fn test_impulse_launches_off_ground() {
        let (world, _) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(0.0, 0.0, 12.0));

        // 3000 / mass 10 = 300 units/s up
        simulator.add_impulse(&mut state, Vec3::new(0.0, 0.0, 3000.0), false);
        assert!((state.pending_impulse.z - 300.0).abs() < 1e-3);

        simulator.tick(&mut state, &MovementInput::default(), &world, DT);

        assert!(state.is_falling());
        assert!(state.velocity.z > 250.0, "vz={}", state.velocity.z);
        assert_eq!(state.pending_impulse, Vec3::ZERO);
    }

    #[test]
    fn test_weak_impulse_keeps_walking() {
        let (world, _) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(0.0, 0.0, 12.0));

        // Less than one tick of gravity
        simulator.add_impulse(&mut state, Vec3::new(0.0, 0.0, 10.0), true);
        simulator.tick(&mut state, &MovementInput::default(), &world, DT);

        assert!(state.is_walking());
    }

    #[test]
    fn test_impulse_ignored_without_mass() {
        let mut config = MovementConfig::default();
        config.mass = 0.0;
        let simulator = MovementSimulator::new(config);
        let mut state = MovementState::new(Vec3::ZERO, &simulator.config);

        simulator.add_impulse(&mut state, Vec3::new(100.0, 0.0, 0.0), false);
        simulator.add_force(&mut state, Vec3::new(100.0, 0.0, 0.0));
        assert_eq!(state.pending_impulse, Vec3::ZERO);
        assert_eq!(state.pending_force, Vec3::ZERO);

        simulator.add_impulse(&mut state, Vec3::new(100.0, 0.0, 0.0), true);
        assert_eq!(state.pending_impulse, Vec3::new(100.0, 0.0, 0.0), "Velocity changes ignore mass");
    }

    #[test]
    fn test_radial_impulse_falloff() {
        let simulator = MovementSimulator::with_default_config();
        let mut state = MovementState::new(Vec3::new(50.0, 0.0, 0.0), &simulator.config);

        simulator.add_radial_impulse(&mut state, Vec3::ZERO, 100.0, 200.0, RadialFalloff::Linear, true);
        assert!((state.pending_impulse.x - 100.0).abs() < 1e-3, "Half strength halfway out");
        assert!(state.pending_impulse.z.abs() < 1e-6);

        let mut state = MovementState::new(Vec3::new(50.0, 0.0, 0.0), &simulator.config);
        simulator.add_radial_impulse(&mut state, Vec3::ZERO, 100.0, 200.0, RadialFalloff::Constant, true);
        assert!((state.pending_impulse.x - 200.0).abs() < 1e-3);

        let mut state = MovementState::new(Vec3::new(150.0, 0.0, 0.0), &simulator.config);
        simulator.add_radial_force(&mut state, Vec3::ZERO, 100.0, 200.0, RadialFalloff::Constant);
        assert_eq!(state.pending_force, Vec3::ZERO, "Outside the radius");
    }

    #[test]
    fn test_launch() {
        let (world, _) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(0.0, 0.0, 12.0));
        state.velocity = Vec3::new(20.0, 0.0, 0.0);

        simulator.launch(&mut state, Vec3::new(0.0, 0.0, 500.0), false, true);
        assert_eq!(state.pending_launch_velocity, Vec3::new(20.0, 0.0, 500.0));

        simulator.tick(&mut state, &MovementInput::default(), &world, DT);
        assert!(state.is_falling());
        assert!(state.velocity.z > 450.0);
        assert_eq!(state.pending_launch_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_dead_character_stays_put() {
        let (world, _) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(0.0, 0.0, 12.0));
        state.dead = true;
        state.velocity = Vec3::new(30.0, 0.0, 0.0);
        let start = state.position;

        let events = simulator.tick(&mut state, &MovementInput::lateral(1.0), &world, DT);

        assert!(events.is_empty());
        assert_eq!(state.velocity, Vec3::ZERO);
        assert_eq!(state.position, start);
    }

    #[test]
    fn test_disable_movement() {
        let (world, _) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(0.0, 0.0, 12.0));

        simulator.disable_movement(&mut state, &world);
        assert_eq!(state.mode, MovementMode::None);
        assert_eq!(state.movement_name(), "None");

        let start = state.position;
        simulator.tick(&mut state, &MovementInput::lateral(1.0), &world, DT);
        assert_eq!(state.position, start);
    }

    #[test]
    fn test_stop_movement_immediately() {
        let simulator = MovementSimulator::with_default_config();
        let mut state = MovementState::new(Vec3::ZERO, &simulator.config);
        state.velocity = Vec3::new(10.0, 0.0, -5.0);
        state.acceleration = Vec3::new(150.0, 0.0, 0.0);

        simulator.stop_movement_immediately(&mut state);
        assert_eq!(state.current_velocity(), Vec3::ZERO);
        assert_eq!(state.current_acceleration(), Vec3::ZERO);
    }

    #[test]
    fn test_max_jump_height() {
        let simulator = MovementSimulator::with_default_config();

        // 400² / (2 · 1470)
        let expected = 160_000.0 / 2940.0;
        assert!((simulator.max_jump_height() - expected).abs() < 1e-3);
        assert!((simulator.max_jump_height_with_jump_time() - (expected + 80.0)).abs() < 1e-3);

        let mut config = MovementConfig::default();
        config.gravity_scale = 0.0;
        assert_eq!(MovementSimulator::new(config).max_jump_height(), 0.0);
    }

    #[test]
    fn test_find_floor_query() {
        let (world, floor) = create_test_world();
        let simulator = MovementSimulator::with_default_config();
        let state = MovementState::new(Vec3::ZERO, &simulator.config);

        let result = simulator.find_floor(&state, Vec3::new(0.0, 0.0, 12.0), &world);
        assert!(result.is_walkable_floor());
        assert_eq!(result.hit_surface(), Some(floor));
        assert!((result.distance() - MIN_FLOOR_DIST).abs() < 1e-3);

        let result = simulator.find_floor(&state, Vec3::new(0.0, 0.0, 40.0), &world);
        assert!(!result.blocking_hit);
    }

    #[test]
    fn test_mode_is_always_defined() {
        let world = create_ledge_world();
        let simulator = MovementSimulator::with_default_config();
        let mut state = spawned(&simulator, &world, Vec3::new(-100.0, 0.0, 12.0));

        let script = [
            MovementInput::lateral(1.0),
            MovementInput::lateral(1.0).with_jump_pressed(),
            MovementInput::lateral(-1.0),
            MovementInput::lateral(1.0).with_jump_released(),
        ];
        for i in 0..600 {
            simulator.tick(&mut state, &script[(i / 15) % script.len()], &world, DT);
            assert!(matches!(
                state.mode,
                MovementMode::Walking | MovementMode::Falling | MovementMode::WallWalking | MovementMode::None
            ));
            assert!(!state.current_floor.walkable || state.current_floor.blocking_hit);
            assert!(state.position.is_finite());
        }
    }
}
