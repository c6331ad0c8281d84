//! Velocity solver: acceleration, friction, braking and speed caps.
//!
//! The solver itself is pure. [`MoveContext`] wraps it with the state
//! lookups the per-mode physics need.

use glam::Vec3;

use super::config::MovementConfig;
use super::context::{MoveContext, MIN_TICK_TIME, SMALL_NUMBER};
use super::state::MovementState;

/// Below this speed braking snaps velocity to zero.
pub const BRAKE_TO_STOP_VELOCITY: f32 = 10.0;

/// Inputs to one velocity update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityStep {
    pub velocity: Vec3,

    /// Scaled input acceleration.
    pub acceleration: Vec3,

    pub dt: f32,

    /// Friction for this mode. Also rate-limits direction changes.
    pub friction: f32,

    /// Constant deceleration applied while braking.
    pub braking_deceleration: f32,

    /// Speed cap before analog scaling.
    pub max_speed: f32,

    pub max_acceleration: f32,

    /// Input magnitude from 0 to 1.
    pub analog_modifier: f32,

    /// Facing, used when forcing full acceleration with no input or velocity.
    pub forward: Vec3,
}

/// Whether `velocity` is over `max_speed`, with a 1% tolerance.
#[inline]
pub fn is_exceeding_max_speed(velocity: Vec3, max_speed: f32) -> bool {
    let max_speed = max_speed.max(0.0);
    velocity.length_squared() > max_speed * max_speed * 1.01
}

/// Computes new velocities from acceleration and friction.
#[derive(Debug, Clone, Copy)]
pub struct VelocitySolver<'a> {
    config: &'a MovementConfig,
}

impl<'a> VelocitySolver<'a> {
    pub fn new(config: &'a MovementConfig) -> Self {
        Self { config }
    }

    /// Advance velocity by one step.
    ///
    /// With no input, or when over the cap, velocity brakes. Otherwise it
    /// turns toward the input at a rate set by friction, accelerates, and is
    /// clamped to the cap unless `sprint_stop` is raised. `sprint_stop` is
    /// cleared once speed has decayed under the cap.
    pub fn calc_velocity(&self, step: &VelocityStep, sprint_stop: &mut bool) -> Vec3 {
        let mut velocity = step.velocity;
        if step.dt < MIN_TICK_TIME {
            return velocity;
        }

        let friction = step.friction.max(0.0);
        let mut acceleration = step.acceleration;
        let mut analog_modifier = step.analog_modifier;

        if self.config.force_max_acceleration {
            // Direction preference: input, then velocity, then facing
            acceleration = if acceleration.length_squared() > SMALL_NUMBER {
                acceleration.normalize() * step.max_acceleration
            } else if velocity.length_squared() < SMALL_NUMBER {
                step.forward * step.max_acceleration
            } else {
                velocity.normalize() * step.max_acceleration
            };
            analog_modifier = 1.0;
        }

        let max_speed = (step.max_speed * analog_modifier).max(self.config.min_analog_walk_speed);

        let zero_acceleration = acceleration == Vec3::ZERO;
        let over_max = is_exceeding_max_speed(velocity, max_speed);

        if zero_acceleration || over_max {
            let braking_friction = if self.config.use_separate_braking_friction {
                self.config.braking_friction
            } else {
                friction
            };
            velocity = self.apply_braking(velocity, step.dt, braking_friction, step.braking_deceleration);
        } else {
            let accel_dir = acceleration.normalize_or_zero();
            let speed = velocity.length();
            velocity -= (velocity - accel_dir * speed) * (step.dt * friction).min(1.0);
        }

        if !zero_acceleration {
            velocity += acceleration * step.dt;

            if *sprint_stop && Vec3::new(velocity.x, velocity.y, 0.0).length() <= max_speed {
                *sprint_stop = false;
            }
            if !*sprint_stop {
                velocity = velocity.clamp_length_max(max_speed);
            }
        }

        velocity
    }

    /// Slow `velocity` with friction and constant deceleration.
    ///
    /// Runs in sub-steps of at most [`MovementConfig::braking_sub_step`].
    /// Velocity never reverses; it stops at zero instead.
    pub fn apply_braking(&self, velocity: Vec3, dt: f32, friction: f32, braking_deceleration: f32) -> Vec3 {
        if velocity == Vec3::ZERO || dt < MIN_TICK_TIME {
            return velocity;
        }

        let friction = (friction * self.config.braking_friction_factor.max(0.0)).max(0.0);
        let braking = braking_deceleration.max(0.0);
        let zero_friction = friction == 0.0;
        let zero_braking = braking == 0.0;

        if zero_friction && zero_braking {
            return velocity;
        }

        let old_velocity = velocity;
        let mut velocity = velocity;
        let max_step = self.config.braking_sub_step();
        let reverse_accel = if zero_braking {
            Vec3::ZERO
        } else {
            -braking * velocity.normalize_or_zero()
        };

        let mut remaining = dt;
        while remaining >= MIN_TICK_TIME {
            // Constant deceleration alone needs no sub-stepping
            let step = if remaining > max_step && !zero_friction {
                max_step.min(remaining * 0.5)
            } else {
                remaining
            };
            remaining -= step;

            velocity += (-friction * velocity + reverse_accel) * step;

            if velocity.dot(old_velocity) <= 0.0 {
                return Vec3::ZERO;
            }
        }

        let speed_sq = velocity.length_squared();
        if speed_sq <= 1.0e-4 || (!zero_braking && speed_sq <= BRAKE_TO_STOP_VELOCITY * BRAKE_TO_STOP_VELOCITY) {
            return Vec3::ZERO;
        }
        velocity
    }

    /// Switch to sprint speeds, if running is enabled.
    pub fn start_sprint(&self, state: &mut MovementState) {
        if self.config.run_enabled {
            state.sprinting = true;
            state.max_acceleration = self.config.sprint_max_acceleration;
            state.max_walk_speed = self.config.sprint_max_walk_speed;
        }
    }

    /// Restore normal speeds. Speed above the normal cap decays instead of
    /// snapping down.
    pub fn stop_sprint(&self, state: &mut MovementState) {
        state.sprinting = false;
        state.max_acceleration = self.config.max_acceleration;
        state.max_walk_speed = self.config.max_walk_speed;
        state.sprint_stop = true;
    }

    /// Scale unit input to an acceleration.
    pub fn scale_input_acceleration(&self, input: Vec3, max_acceleration: f32) -> Vec3 {
        input.clamp_length_max(1.0) * max_acceleration
    }

    /// Input magnitude relative to the acceleration cap, from 0 to 1.
    pub fn analog_input_modifier(&self, acceleration: Vec3, max_acceleration: f32) -> f32 {
        if acceleration.length_squared() > 0.0 && max_acceleration > SMALL_NUMBER {
            (acceleration.length() / max_acceleration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl MoveContext<'_> {
    /// Run the velocity solver on the state's velocity and acceleration.
    pub(crate) fn calc_velocity(&mut self, dt: f32, friction: f32, braking_deceleration: f32) {
        self.calc_velocity_with(self.state.acceleration, dt, friction, braking_deceleration);
    }

    /// Same as [`calc_velocity`](Self::calc_velocity) with an explicit acceleration.
    pub(crate) fn calc_velocity_with(&mut self, acceleration: Vec3, dt: f32, friction: f32, braking_deceleration: f32) {
        if !self.has_valid_data() {
            return;
        }

        let step = VelocityStep {
            velocity: self.state.velocity,
            acceleration,
            dt,
            friction,
            braking_deceleration,
            max_speed: self.state.max_walk_speed,
            max_acceleration: self.state.max_acceleration,
            analog_modifier: self.state.analog_input_modifier,
            forward: self.state.rotation * Vec3::X,
        };
        let velocity = VelocitySolver::new(self.config).calc_velocity(&step, &mut self.state.sprint_stop);
        self.state.velocity = velocity;
    }

    /// Braking deceleration for the current mode.
    #[inline]
    pub(crate) fn max_braking_deceleration(&self) -> f32 {
        self.config.max_braking_deceleration(self.state.mode)
    }

    /// Walking and falling ignore vertical input.
    pub(crate) fn constrain_input_acceleration(&self, input: Vec3) -> Vec3 {
        if input.z != 0.0 && (self.state.is_walking() || self.state.is_falling()) {
            Vec3::new(input.x, input.y, 0.0)
        } else {
            input
        }
    }

    /// Rescale velocity to horizontal while keeping its magnitude.
    pub(crate) fn maintain_horizontal_ground_velocity(&mut self) {
        let velocity = self.state.velocity;
        if velocity.z != 0.0 {
            self.state.velocity = Vec3::new(velocity.x, velocity.y, 0.0).normalize_or_zero() * velocity.length();
        }
    }
}
