//! Character movement physics.
//!
//! This module implements kinematic side-view platformer movement with:
//!
//! - Walking, falling and wall walking, each with its own sub-stepped physics
//! - Friction, braking and analog-scaled acceleration
//! - Held jumps, multi-jumps and sprint
//! - Floor finding with a hover gap and edge tolerance
//! - Standing on moving platforms and inheriting their velocity
//! - Sliding along walls and out of corners
//!
//! # Design
//!
//! Movement is driven by the [`MovementSimulator`], which takes per-tick
//! [`MovementInput`] and updates a character's [`MovementState`] through a
//! [`CollisionQuery`](crate::collision::CollisionQuery). Each tick returns the
//! [`MovementEvent`]s it produced.
//!
//! All movement is deterministic: the same inputs always produce the same
//! outputs.

mod base;
mod config;
mod context;
mod controller;
mod events;
mod floor;
mod jump;
mod modes;
mod slide_move;
mod state;
mod velocity;

pub use base::{check_base_chain, imparted_velocity, BaseError};
pub use config::{ConfigError, MovementConfig};
pub use context::{simulation_time_step, MIN_TICK_TIME};
pub use controller::{MovementSimulator, RadialFalloff, SPAWN_PROBE_DISTANCE};
pub use events::MovementEvent;
pub use floor::{compute_floor_dist, is_walkable, settle_height, FloorResult, MAX_FLOOR_DIST, MIN_FLOOR_DIST};
pub use jump::JumpState;
pub use modes::unused_step_time;
pub use slide_move::{compute_slide_vector, ground_movement_delta, two_wall_adjust};
pub use state::{BasedMovement, MovementInput, MovementMode, MovementState};
pub use velocity::{is_exceeding_max_speed, VelocitySolver, VelocityStep, BRAKE_TO_STOP_VELOCITY};
