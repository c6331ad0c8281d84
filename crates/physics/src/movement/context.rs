//! State threaded through one movement tick.

use glam::Vec3;

use crate::collision::{CollisionQuery, QueryParams, TraceShape};

use super::config::MovementConfig;
use super::events::MovementEvent;
use super::state::MovementState;

/// Shortest time step worth simulating.
pub const MIN_TICK_TIME: f32 = 1.0e-6;

pub const KINDA_SMALL_NUMBER: f32 = 1.0e-4;

pub const SMALL_NUMBER: f32 = 1.0e-8;

/// Length of the next physics sub-step.
///
/// Steps longer than `max_simulation_time_step` are halved (down to the
/// bound) while iterations remain; the last iteration takes all remaining
/// time.
pub fn simulation_time_step(remaining: f32, iterations: u32, config: &MovementConfig) -> f32 {
    let mut step = remaining;
    if remaining > config.max_simulation_time_step && iterations < config.max_simulation_iterations {
        step = config.max_simulation_time_step.min(remaining * 0.5);
    }
    step.max(MIN_TICK_TIME)
}

/// Borrowed pieces of one character's tick.
///
/// The physics routines are split across modules as `impl MoveContext`
/// blocks: floor finding, base tracking, sliding, velocity and the per-mode
/// loops all read and write through it.
pub(crate) struct MoveContext<'a> {
    pub config: &'a MovementConfig,
    pub world: &'a dyn CollisionQuery,
    pub state: &'a mut MovementState,
    pub events: &'a mut Vec<MovementEvent>,
}

impl<'a> MoveContext<'a> {
    pub fn new(
        config: &'a MovementConfig,
        world: &'a dyn CollisionQuery,
        state: &'a mut MovementState,
        events: &'a mut Vec<MovementEvent>,
    ) -> Self {
        Self {
            config,
            world,
            state,
            events,
        }
    }

    /// A character can be simulated when it is active and has a real shape.
    #[inline]
    pub fn has_valid_data(&self) -> bool {
        self.state.active && self.config.half_extents.min_element() > 0.0
    }

    #[inline]
    pub fn shape(&self) -> TraceShape {
        self.config.character_shape()
    }

    #[inline]
    pub fn params(&self) -> QueryParams {
        QueryParams::character(self.state.body)
    }

    #[inline]
    pub fn emit(&mut self, event: MovementEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn time_step(&self, remaining: f32, iterations: u32) -> f32 {
        simulation_time_step(remaining, iterations, self.config)
    }

    /// Remove the component along the plane constraint normal.
    pub fn constrain_direction(&self, direction: Vec3) -> Vec3 {
        if !self.config.constrain_to_plane {
            return direction;
        }
        let normal = self.config.plane_constraint_normal.normalize_or_zero();
        direction - normal * direction.dot(normal)
    }

    /// Constrained and renormalized surface normal.
    pub fn constrain_normal(&self, normal: Vec3) -> Vec3 {
        self.constrain_direction(normal).normalize_or_zero()
    }

    /// Whether the plane constraint forbids vertical motion.
    pub fn vertical_motion_blocked(&self) -> bool {
        self.config.constrain_to_plane && self.config.plane_constraint_normal.normalize_or_zero().z.abs() == 1.0
    }
}
