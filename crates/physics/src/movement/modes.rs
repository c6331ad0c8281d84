//! Per-mode physics and mode transitions.
//!
//! Every mode runs the same sub-stepped loop: split the remaining time with
//! [`simulation_time_step`](super::context::simulation_time_step), update
//! velocity, sweep, then react to what was hit. A mode change in the middle
//! of a loop hands the unused time to the new mode through
//! [`start_new_physics`](MoveContext::start_new_physics), so a tick never
//! loses time to a transition.

use glam::Vec3;

use crate::collision::{ContentFlags, HitResult};

use super::context::{MoveContext, KINDA_SMALL_NUMBER, MIN_TICK_TIME};
use super::events::MovementEvent;
use super::floor::{is_walkable, MIN_FLOOR_DIST};
use super::slide_move::{ground_movement_delta, two_wall_adjust};
use super::state::MovementMode;

/// How far below the hover plane the hazard probe runs.
pub const HAZARD_PROBE_SINK: f32 = 1.0e-3;

/// Horizontal speeds below this (squared) stop dead while falling.
const FALLING_STOP_SPEED_SQUARED: f32 = KINDA_SMALL_NUMBER * 10.0;

/// Part of a sub-step a move did not use, given how far it wanted to go and
/// how far it got.
pub fn unused_step_time(tick: f32, desired_distance: f32, actual_distance: f32) -> f32 {
    if desired_distance <= KINDA_SMALL_NUMBER {
        return 0.0;
    }
    tick * (1.0 - (actual_distance / desired_distance).min(1.0))
}

#[inline]
fn horizontal_size(v: Vec3) -> f32 {
    Vec3::new(v.x, v.y, 0.0).length()
}

#[inline]
fn is_nearly_zero(v: Vec3) -> bool {
    v.abs().max_element() <= KINDA_SMALL_NUMBER
}

impl MoveContext<'_> {
    /// Run the physics of the current mode for `dt` seconds.
    pub(crate) fn start_new_physics(&mut self, dt: f32, iterations: u32) {
        if dt < MIN_TICK_TIME || iterations >= self.config.max_simulation_iterations || !self.has_valid_data() {
            return;
        }

        match self.state.mode {
            MovementMode::None => {}
            MovementMode::Walking => self.phys_walking(dt, iterations),
            MovementMode::Falling => self.phys_falling(dt, iterations),
            MovementMode::WallWalking => self.phys_wall_walking(dt, iterations),
        }
    }

    fn phys_walking(&mut self, dt: f32, mut iterations: u32) {
        if dt < MIN_TICK_TIME {
            return;
        }

        self.state.just_teleported = false;
        let mut remaining = dt;

        while remaining >= MIN_TICK_TIME && iterations < self.config.max_simulation_iterations && self.has_valid_data() {
            iterations += 1;
            self.state.just_teleported = false;
            let tick = self.time_step(remaining, iterations);
            remaining -= tick;

            let old_location = self.state.position;

            self.maintain_horizontal_ground_velocity();
            self.state.acceleration.z = 0.0;
            self.calc_velocity(tick, self.config.ground_friction, self.max_braking_deceleration());

            let move_velocity = self.state.velocity;
            let delta = move_velocity * tick;
            let zero_delta = is_nearly_zero(delta);

            if zero_delta {
                remaining = 0.0;
            } else {
                if self.check_hazard() {
                    return;
                }

                self.move_horizontal(move_velocity, tick, true);

                if !self.state.is_walking() {
                    let actual = horizontal_size(self.state.position - old_location);
                    remaining += unused_step_time(tick, delta.length(), actual);
                    self.start_new_physics(remaining, iterations);
                    return;
                }
            }

            let floor = self.find_floor(self.state.position, zero_delta);
            self.state.current_floor = floor;

            let walkable = self.state.current_floor.is_walkable_floor();
            let floor_hit = self.state.current_floor.hit.clone();

            if walkable {
                self.adjust_floor_height();
                self.set_base_from_floor();

                // Refused bases push the character off
                if !self.state.is_walking() {
                    self.start_new_physics(remaining, iterations);
                    return;
                }
            } else if floor_hit.start_penetrating && remaining <= 0.0 {
                let adjustment = self.penetration_adjustment(&floor_hit);
                self.resolve_penetration(adjustment, &floor_hit);
                self.state.force_next_floor_check = true;
            }

            if !walkable && !floor_hit.start_penetrating {
                self.start_falling(iterations, remaining, tick, delta, old_location);
                return;
            }

            if self.state.position == old_location {
                break;
            }
        }

        if self.state.is_walking() {
            self.maintain_horizontal_ground_velocity();
        }
    }

    fn phys_falling(&mut self, dt: f32, mut iterations: u32) {
        if dt < MIN_TICK_TIME {
            return;
        }

        let acceleration = self.state.acceleration;
        let fall_acceleration = Vec3::new(acceleration.x, acceleration.y, 0.0);
        let gravity = self.config.gravity();
        let mut remaining = dt;

        while remaining >= MIN_TICK_TIME && iterations < self.config.max_simulation_iterations {
            iterations += 1;
            self.state.just_teleported = false;
            let tick = self.time_step(remaining, iterations);
            remaining -= tick;

            let old_velocity = self.state.velocity;
            let friction = self.config.falling_lateral_friction;
            let braking = self.max_braking_deceleration();

            // Lateral velocity without input, used to slide out of corners
            let sprint_stop = self.state.sprint_stop;
            self.state.velocity.z = 0.0;
            self.calc_velocity_with(Vec3::ZERO, tick, friction, braking);
            let mut no_air_control = Vec3::new(self.state.velocity.x, self.state.velocity.y, old_velocity.z);
            self.state.sprint_stop = sprint_stop;

            self.state.velocity = Vec3::new(old_velocity.x, old_velocity.y, 0.0);
            self.calc_velocity_with(fall_acceleration, tick, friction, braking);
            self.state.velocity.z = old_velocity.z;

            if self.state.jump.is_providing_force() {
                let jump = &mut self.state.jump;
                jump.jump_force_time_remaining -= jump.jump_force_time_remaining.min(tick);
                if jump.jump_force_time_remaining <= 0.0 {
                    self.reset_jump_state();
                }
            }

            self.state.velocity.z += gravity * tick;
            no_air_control.z += gravity * tick;

            let mut adjusted = (old_velocity + self.state.velocity) * 0.5 * tick;
            let hit = self.safe_move(adjusted);

            if !self.has_valid_data() {
                return;
            }

            let mut sub_remaining = tick * (1.0 - hit.time);

            if hit.blocking_hit {
                if self.is_valid_landing_spot(self.state.position, &hit) {
                    remaining += sub_remaining;
                    self.process_landed(&hit, remaining, iterations);
                    return;
                }

                adjusted = self.state.velocity * tick;

                // Ceilings end the jump
                if hit.normal.z < 0.0 {
                    self.reset_jump_state();
                }

                let old_hit_normal = hit.normal;
                let mut delta = self.slide_vector(adjusted, 1.0 - hit.time, old_hit_normal);

                if sub_remaining > KINDA_SMALL_NUMBER && !self.state.just_teleported {
                    self.state.velocity = delta / sub_remaining;
                }

                if sub_remaining > KINDA_SMALL_NUMBER && delta.dot(adjusted) > 0.0 {
                    let hit = self.safe_move(delta);

                    if hit.blocking_hit {
                        let last_move_time_slice = sub_remaining;
                        sub_remaining *= 1.0 - hit.time;

                        if self.is_valid_landing_spot(self.state.position, &hit) {
                            remaining += sub_remaining;
                            self.process_landed(&hit, remaining, iterations);
                            return;
                        }

                        // Second wall: slide along the crease
                        let last_move_no_air_control = no_air_control * last_move_time_slice;
                        delta = self.slide_vector(last_move_no_air_control, 1.0, old_hit_normal);
                        delta = self.constrain_direction(two_wall_adjust(delta, hit.normal, old_hit_normal, hit.time));

                        if sub_remaining > KINDA_SMALL_NUMBER && !self.state.just_teleported {
                            self.state.velocity = delta / sub_remaining;
                        }

                        self.safe_move(delta);
                    }
                }
            }

            let velocity = self.state.velocity;
            if velocity.x * velocity.x + velocity.y * velocity.y <= FALLING_STOP_SPEED_SQUARED {
                self.state.velocity.x = 0.0;
                self.state.velocity.y = 0.0;
            }
        }
    }

    fn phys_wall_walking(&mut self, dt: f32, mut iterations: u32) {
        if dt < MIN_TICK_TIME {
            return;
        }

        let mut remaining = dt;

        while remaining >= MIN_TICK_TIME && iterations < self.config.max_simulation_iterations && self.has_valid_data() {
            iterations += 1;
            self.state.just_teleported = false;
            let tick = self.time_step(remaining, iterations);
            remaining -= tick;

            let jump = &mut self.state.jump;
            jump.wall_walk_hold_time += tick;
            if jump.wall_walk_hold_time > self.config.wall_walk_max_hold_time || !jump.is_pressing_jump {
                self.end_wall_walk(remaining + tick, iterations);
                return;
            }

            // Letting go of the stick or stopping ends the glide
            if self.state.acceleration.x == 0.0 || self.state.velocity.x == 0.0 {
                self.end_wall_walk(remaining + tick, iterations);
                return;
            }

            self.state.velocity.z = 0.0;
            self.state.acceleration.z = 0.0;
            self.calc_velocity(tick, self.config.ground_friction, self.max_braking_deceleration());

            // Speed may only drop during a wall walk
            let speed = self.state.velocity.x.abs().min(self.state.last_speed);
            self.state.velocity.x = self.state.velocity.x.signum() * speed;
            self.state.last_speed = speed;

            let move_velocity = self.state.velocity;
            if is_nearly_zero(move_velocity * tick) {
                remaining = 0.0;
            } else {
                self.move_horizontal(move_velocity, tick, false);
            }
        }
    }

    fn end_wall_walk(&mut self, remaining: f32, iterations: u32) {
        log::debug!("Wall walk over after {:.2}s", self.state.jump.wall_walk_hold_time);
        self.reset_jump_state();
        self.set_movement_mode(MovementMode::Falling);
        self.start_new_physics(remaining, iterations);
    }

    /// Move sideways by `velocity * dt`.
    ///
    /// With `along_floor` the move follows the current floor and climbs
    /// walkable ramps it runs into. Hitting a wall stops horizontal velocity.
    pub(crate) fn move_horizontal(&mut self, velocity: Vec3, dt: f32, along_floor: bool) {
        if along_floor && !self.state.current_floor.is_walkable_floor() {
            return;
        }

        let flat_delta = Vec3::new(velocity.x, velocity.y, 0.0) * dt;
        let delta = if along_floor {
            let floor = &self.state.current_floor;
            ground_movement_delta(flat_delta, &floor.hit, floor.used_line_trace, self.config)
        } else {
            flat_delta
        };

        let mut hit = self.safe_move(delta);

        if along_floor
            && hit.is_valid_blocking_hit()
            && hit.time < 1.0
            && hit.normal.z < 1.0 - KINDA_SMALL_NUMBER
            && is_walkable(&hit, self.config)
        {
            let rest = flat_delta * (1.0 - hit.time);
            let ramp_delta = ground_movement_delta(rest, &hit, false, self.config);
            hit = self.safe_move(ramp_delta);
        }

        if hit.is_valid_blocking_hit() && !is_walkable(&hit, self.config) {
            self.state.velocity.x = 0.0;
        }

        if hit.start_penetrating {
            self.slide_along_surface(delta, 1.0, hit.normal, &mut hit);
            if hit.start_penetrating {
                self.on_stuck(&hit);
            }
        }
    }

    /// Look for a hazard under the leading edge of a walking character.
    ///
    /// The probe is a short horizontal line just below the hover plane,
    /// running back from the leading edge. If the nearest thing it meets is a
    /// hazard, the character dies: velocity is zeroed and `Died` is emitted.
    pub(crate) fn check_hazard(&mut self) -> bool {
        let vx = self.state.velocity.x;
        if vx == 0.0 {
            return false;
        }

        let side = vx.signum();
        let half = self.config.half_extents;
        let start = self.state.position
            + Vec3::new(side * half.x, 0.0, -(half.z + MIN_FLOOR_DIST + HAZARD_PROBE_SINK));
        let end = start - Vec3::new(side * self.config.hazard_probe_length, 0.0, 0.0);

        let params = self.params().with_mask(ContentFlags::MASK_HAZARD_PROBE);
        let hits = self.world.line_trace_multi(start, end, &params);
        let Some(nearest) = hits.first() else {
            return false;
        };
        if !nearest.contents.contains(ContentFlags::HAZARD) {
            return false;
        }

        let hazard = nearest.surface;
        log::debug!("Hazard {:?} under leading edge at {:?}", hazard, start);
        self.state.dead = true;
        self.state.velocity = Vec3::ZERO;
        self.emit(MovementEvent::Died { hazard });
        true
    }

    /// Switch modes, running the enter and exit bookkeeping.
    pub(crate) fn set_movement_mode(&mut self, mode: MovementMode) {
        let previous = self.state.mode;
        if previous == mode {
            return;
        }

        self.state.mode = mode;
        log::debug!("Movement mode {} -> {}", previous, mode);
        self.emit(MovementEvent::ModeChanged { from: previous, to: mode });
        self.on_movement_mode_changed(previous);
    }

    fn on_movement_mode_changed(&mut self, previous: MovementMode) {
        if self.state.is_walking() {
            self.state.velocity.z = 0.0;

            let floor = self.find_floor(self.state.position, false);
            self.state.current_floor = floor;
            self.adjust_floor_height();
            self.set_base_from_floor();

            let falling = self.state.is_falling();
            self.state.jump.reset(falling);
            self.state.jump.wall_walk_toggle = true;
            self.state.last_speed = self.config.sprint_max_walk_speed;
        } else {
            self.state.current_floor.clear();

            if self.state.is_falling() && previous == MovementMode::Walking {
                self.state.velocity += self.imparted_base_velocity();
            }

            // Clearing can't form a cycle
            let _ = self.set_base(None);

            if self.state.is_wall_walking() {
                self.state.jump.wall_walk_toggle = false;
            }
        }
    }

    /// Land on `hit` and keep simulating the rest of the tick.
    pub(crate) fn process_landed(&mut self, hit: &HitResult, remaining: f32, iterations: u32) {
        if self.state.is_falling() {
            self.emit(MovementEvent::Landed {
                surface: hit.surface,
                velocity: self.state.velocity,
            });
            self.set_movement_mode(MovementMode::Walking);
        }

        self.start_new_physics(remaining, iterations);
    }

    /// Walked off the floor: fall for whatever part of the step was unused.
    fn start_falling(&mut self, iterations: u32, remaining: f32, tick: f32, delta: Vec3, old_location: Vec3) {
        let desired = delta.length();
        let remaining = if desired < KINDA_SMALL_NUMBER {
            0.0
        } else {
            let actual = horizontal_size(self.state.position - old_location);
            remaining + unused_step_time(tick, desired, actual)
        };

        if self.state.is_walking() {
            self.set_movement_mode(MovementMode::Falling);
        }
        self.start_new_physics(remaining, iterations);
    }

    pub(crate) fn reset_jump_state(&mut self) {
        let falling = self.state.is_falling();
        self.state.jump.reset(falling);
    }

    /// Consume the queued jump and wall-walk requests.
    pub(crate) fn check_jump_input(&mut self) {
        if self.state.jump.want_jump {
            let jump = &mut self.state.jump;
            if !jump.is_pressing_jump {
                jump.want_jump = false;
            }

            // Jumping while already in the air spends the ground jump
            if jump.jump_current_count == 0 && self.state.mode == MovementMode::Falling {
                jump.jump_current_count += 1;
            }

            let did_jump = self.do_jump();
            if did_jump && !self.state.jump.was_jumping {
                let jump = &mut self.state.jump;
                jump.jump_current_count += 1;
                jump.jump_force_time_remaining = self.config.jump_max_hold_time;
                let count = jump.jump_current_count;
                log::debug!("Jump {} at {:?}", count, self.state.position);
                self.emit(MovementEvent::Jumped { count });
            }
            self.state.jump.was_jumping = did_jump;
        }

        if self.state.jump.want_wall_walk {
            let did_wall_walk = self.do_wall_walk();
            if did_wall_walk && !self.state.jump.was_wall_walking {
                self.state.jump.wall_walk_hold_time = 0.0;
            }
            self.state.jump.was_wall_walking = did_wall_walk;
        }
    }

    /// Start or sustain a jump. The boost fades with how long it has been held.
    pub(crate) fn do_jump(&mut self) -> bool {
        if !self.config.jump_enabled || !self.state.jump.can_jump(self.state.mode, self.config) {
            return false;
        }
        if self.vertical_motion_blocked() {
            return false;
        }

        let hold_factor = self.state.jump.hold_factor(self.config);
        let jump_velocity = self.config.jump_z_velocity * (1.0 - hold_factor);
        self.state.velocity.z = self.state.velocity.z.max(jump_velocity);
        self.set_movement_mode(MovementMode::Falling);
        true
    }

    pub(crate) fn do_wall_walk(&mut self) -> bool {
        if !self.state.jump.can_wall_walk(self.state.mode, self.config) {
            return false;
        }
        if self.vertical_motion_blocked() {
            return false;
        }

        self.set_movement_mode(MovementMode::WallWalking);
        self.emit(MovementEvent::WallWalkStarted);
        true
    }
}
