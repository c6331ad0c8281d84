//! Player input handling.
//!
//! This module converts raw input (keys or an analog stick) into the
//! per-tick [`MovementInput`] the simulator consumes, with button edges
//! detected against the previous frame.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tilerunner_physics::MovementInput;

/// Smallest lateral input while sprinting.
pub const SPRINT_MIN_AXIS: f32 = 0.5;

/// Raw player input for a single frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub sprint: bool,

    /// Analog stick, -1 to 1. Overrides the keys when non-zero.
    pub stick_x: f32,
}

impl PlayerInput {
    pub fn right() -> Self {
        Self {
            right: true,
            ..Default::default()
        }
    }

    pub fn left() -> Self {
        Self {
            left: true,
            ..Default::default()
        }
    }

    pub fn with_jump(mut self) -> Self {
        self.jump = true;
        self
    }

    pub fn with_sprint(mut self) -> Self {
        self.sprint = true;
        self
    }

    /// Lateral axis from the stick or the keys.
    pub fn axis(&self) -> f32 {
        if self.stick_x != 0.0 {
            return self.stick_x.clamp(-1.0, 1.0);
        }

        let mut axis = 0.0;
        if self.right {
            axis += 1.0;
        }
        if self.left {
            axis -= 1.0;
        }
        axis
    }
}

/// Sprinting remaps `(0, 1]` onto `(0.5, 1]` so a light push still runs.
pub fn sprint_axis(axis: f32) -> f32 {
    if axis == 0.0 {
        return 0.0;
    }
    let magnitude = SPRINT_MIN_AXIS + (1.0 - SPRINT_MIN_AXIS) * axis.abs().min(1.0);
    magnitude.copysign(axis)
}

/// Tracks the previous frame to turn held buttons into press and release
/// events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputTracker {
    previous: PlayerInput,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert this frame's raw input.
    pub fn to_movement_input(&mut self, input: &PlayerInput) -> MovementInput {
        let previous = std::mem::replace(&mut self.previous, *input);

        let mut axis = input.axis();
        if input.sprint {
            axis = sprint_axis(axis);
        }

        MovementInput {
            acceleration: Vec3::new(axis, 0.0, 0.0),
            jump_pressed: input.jump && !previous.jump,
            jump_released: !input.jump && previous.jump,
            sprint_start: input.sprint && !previous.sprint,
            sprint_stop: !input.sprint && previous.sprint,
        }
    }

    /// Forget held buttons, e.g. after a respawn.
    pub fn reset(&mut self) {
        self.previous = PlayerInput::default();
    }
}
