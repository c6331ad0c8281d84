//! Movement configuration constants.
//!
//! All movement parameters are grouped here for easy tuning. Units are world
//! units (one unit per pixel) and seconds.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collision::TraceShape;

use super::state::MovementMode;

/// Error returned by [`MovementConfig::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("walkable floor threshold must be in (0, 1), got {0}")]
    WalkableThreshold(f32),

    #[error("max simulation iterations must be at least 1")]
    NoIterations,

    #[error("plane constraint normal must be non-zero")]
    ZeroPlaneNormal,
}

/// Configuration for character movement physics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    // ========================================================================
    // Character Dimensions
    // ========================================================================
    /// Half-size of the collision box (x = side-scrolling axis, z = up).
    pub half_extents: Vec3,

    // ========================================================================
    // Movement Speeds
    // ========================================================================
    /// Ground speed cap when not sprinting.
    pub max_walk_speed: f32,

    /// Ground speed cap while sprinting.
    pub sprint_max_walk_speed: f32,

    /// Acceleration for full-magnitude input when not sprinting.
    pub max_acceleration: f32,

    /// Acceleration for full-magnitude input while sprinting.
    pub sprint_max_acceleration: f32,

    /// Floor for the analog-scaled speed cap.
    pub min_analog_walk_speed: f32,

    /// Always accelerate at full rate regardless of input magnitude.
    pub force_max_acceleration: bool,

    // ========================================================================
    // Friction and Braking
    // ========================================================================
    /// Friction while walking. Also controls how fast direction changes.
    pub ground_friction: f32,

    /// Friction applied while braking, when `use_separate_braking_friction`.
    pub braking_friction: f32,

    pub use_separate_braking_friction: bool,

    /// Multiplier on whichever friction is used for braking.
    pub braking_friction_factor: f32,

    /// Constant deceleration when walking without input.
    pub braking_deceleration_walking: f32,

    /// Constant deceleration when falling without input.
    pub braking_deceleration_falling: f32,

    /// Lateral friction while falling.
    pub falling_lateral_friction: f32,

    /// Largest braking sub-step. Clamped to [1/75, 1/20].
    pub braking_sub_step_time: f32,

    // ========================================================================
    // Gravity and Jumping
    // ========================================================================
    /// Base gravity (units/second², negative is down).
    pub gravity_z: f32,

    pub gravity_scale: f32,

    /// Initial upward velocity of a jump.
    pub jump_z_velocity: f32,

    /// Fraction of jump velocity used when pushed off an invalid base.
    pub jump_off_jump_z_factor: f32,

    /// How long holding jump keeps extending it (seconds).
    pub jump_max_hold_time: f32,

    /// Exponent shaping how fast a held jump loses its boost.
    pub jump_hold_force_factor: f32,

    /// Jumps allowed before landing.
    pub jump_max_count: u32,

    /// How long a wall walk can last (seconds).
    pub wall_walk_max_hold_time: f32,

    /// Used to convert forces and impulses into velocity.
    pub mass: f32,

    // ========================================================================
    // Abilities
    // ========================================================================
    pub run_enabled: bool,
    pub jump_enabled: bool,
    pub long_jump_enabled: bool,
    pub wall_walk_enabled: bool,

    // ========================================================================
    // Moving Bases
    // ========================================================================
    pub impart_base_velocity_x: bool,
    pub impart_base_velocity_y: bool,
    pub impart_base_velocity_z: bool,

    /// Add the tangential velocity of a spinning base when leaving it.
    pub impart_base_angular_velocity: bool,

    /// Don't rotate the character with its base.
    pub ignore_base_rotation: bool,

    // ========================================================================
    // Floor
    // ========================================================================
    /// Minimum floor normal Z to count as walkable.
    pub walkable_floor_z: f32,

    /// Never reuse the cached floor.
    pub always_check_floor: bool,

    /// Snap the character to whole units when settling on the floor.
    pub pixel_snap: bool,

    /// Largest correction applied when resolving penetration.
    pub max_depenetration: f32,

    /// Length of the hazard probe under the leading edge.
    pub hazard_probe_length: f32,

    // ========================================================================
    // Simulation
    // ========================================================================
    /// Largest physics sub-step (seconds).
    pub max_simulation_time_step: f32,

    /// Most sub-steps per tick.
    pub max_simulation_iterations: u32,

    /// Keep motion out of the lateral plane.
    pub constrain_to_plane: bool,

    pub plane_constraint_normal: Vec3,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            half_extents: Vec3::new(9.0, 8.0, 10.0),

            max_walk_speed: 50.0,
            sprint_max_walk_speed: 100.0,
            max_acceleration: 150.0,
            sprint_max_acceleration: 300.0,
            min_analog_walk_speed: 0.0,
            force_max_acceleration: false,

            ground_friction: 6.0,
            braking_friction: 4.0,
            use_separate_braking_friction: true,
            braking_friction_factor: 1.0,
            braking_deceleration_walking: 1.0,
            braking_deceleration_falling: 0.0,
            falling_lateral_friction: 0.0,
            braking_sub_step_time: 1.0 / 33.0,

            gravity_z: -980.0,
            gravity_scale: 1.5,
            jump_z_velocity: 400.0,
            jump_off_jump_z_factor: 0.5,
            jump_max_hold_time: 0.2,
            jump_hold_force_factor: 7.0,
            jump_max_count: 1,
            wall_walk_max_hold_time: 1.0,
            mass: 10.0,

            run_enabled: true,
            jump_enabled: true,
            long_jump_enabled: true,
            wall_walk_enabled: true,

            impart_base_velocity_x: true,
            impart_base_velocity_y: true,
            impart_base_velocity_z: true,
            impart_base_angular_velocity: true,
            ignore_base_rotation: false,

            walkable_floor_z: 1.0e-4,
            always_check_floor: false,
            pixel_snap: true,
            max_depenetration: 100.0,
            hazard_probe_length: 4.0,

            max_simulation_time_step: 0.05,
            max_simulation_iterations: 8,
            constrain_to_plane: true,
            plane_constraint_normal: Vec3::Y,
        }
    }
}

impl MovementConfig {
    /// Low gravity, long held jumps and a double jump.
    pub fn floaty() -> Self {
        Self {
            gravity_scale: 1.0,
            jump_z_velocity: 350.0,
            jump_max_hold_time: 0.35,
            jump_max_count: 2,
            wall_walk_max_hold_time: 1.5,
            ..Default::default()
        }
    }

    /// Heavy, responsive movement with short jumps.
    pub fn tight() -> Self {
        Self {
            ground_friction: 10.0,
            braking_friction: 8.0,
            max_acceleration: 300.0,
            gravity_scale: 2.0,
            jump_z_velocity: 480.0,
            jump_max_hold_time: 0.1,
            wall_walk_max_hold_time: 0.5,
            ..Default::default()
        }
    }

    /// Effective gravity (units/second²).
    #[inline]
    pub fn gravity(&self) -> f32 {
        self.gravity_z * self.gravity_scale
    }

    /// Collision shape of the character.
    #[inline]
    pub fn character_shape(&self) -> TraceShape {
        TraceShape::from_half_extents(self.half_extents)
    }

    /// Braking deceleration for the given mode.
    pub fn max_braking_deceleration(&self, mode: MovementMode) -> f32 {
        match mode {
            MovementMode::Walking | MovementMode::WallWalking => self.braking_deceleration_walking,
            MovementMode::Falling => self.braking_deceleration_falling,
            MovementMode::None => 0.0,
        }
    }

    /// Braking sub-step length after clamping.
    #[inline]
    pub fn braking_sub_step(&self) -> f32 {
        self.braking_sub_step_time.clamp(1.0 / 75.0, 1.0 / 20.0)
    }

    /// Check that every tunable is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("half_extents.x", self.half_extents.x),
            ("half_extents.y", self.half_extents.y),
            ("half_extents.z", self.half_extents.z),
            ("max_simulation_time_step", self.max_simulation_time_step),
            ("braking_sub_step_time", self.braking_sub_step_time),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        let non_negative = [
            ("max_walk_speed", self.max_walk_speed),
            ("sprint_max_walk_speed", self.sprint_max_walk_speed),
            ("max_acceleration", self.max_acceleration),
            ("sprint_max_acceleration", self.sprint_max_acceleration),
            ("min_analog_walk_speed", self.min_analog_walk_speed),
            ("ground_friction", self.ground_friction),
            ("braking_friction", self.braking_friction),
            ("braking_friction_factor", self.braking_friction_factor),
            ("braking_deceleration_walking", self.braking_deceleration_walking),
            ("braking_deceleration_falling", self.braking_deceleration_falling),
            ("falling_lateral_friction", self.falling_lateral_friction),
            ("jump_max_hold_time", self.jump_max_hold_time),
            ("wall_walk_max_hold_time", self.wall_walk_max_hold_time),
            ("mass", self.mass),
            ("max_depenetration", self.max_depenetration),
            ("hazard_probe_length", self.hazard_probe_length),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative { field, value });
            }
        }

        if !(self.walkable_floor_z > 0.0 && self.walkable_floor_z < 1.0) {
            return Err(ConfigError::WalkableThreshold(self.walkable_floor_z));
        }
        if self.max_simulation_iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        if self.constrain_to_plane && self.plane_constraint_normal.length_squared() < 1.0e-8 {
            return Err(ConfigError::ZeroPlaneNormal);
        }

        Ok(())
    }
}
