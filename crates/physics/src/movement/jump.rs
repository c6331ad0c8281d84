//! Jump and wall-walk input bookkeeping.
//!
//! A jump press either queues a jump (when the character is not moving
//! vertically) or requests a wall walk. Holding jump extends the jump for up
//! to `jump_max_hold_time`, and the same hold feeds the wall-walk budget.

use serde::{Deserialize, Serialize};

use super::config::MovementConfig;
use super::state::MovementMode;

/// Jump state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpState {
    /// Jump is physically held.
    pub is_pressing_jump: bool,

    /// A jump is requested and still within its hold window.
    pub want_jump: bool,

    /// A wall walk is requested.
    pub want_wall_walk: bool,

    /// The last tick performed a jump (start or sustain).
    pub was_jumping: bool,

    /// The last tick performed a wall walk.
    pub was_wall_walking: bool,

    /// One wall walk per airtime. Re-armed on landing.
    pub wall_walk_toggle: bool,

    /// How long the current jump request has been held.
    pub jump_key_hold_time: f32,

    /// Remaining time the held jump keeps pushing.
    pub jump_force_time_remaining: f32,

    /// Jumps performed since the last landing.
    pub jump_current_count: u32,

    /// How long the current wall walk has lasted.
    pub wall_walk_hold_time: f32,
}

impl Default for JumpState {
    fn default() -> Self {
        Self {
            is_pressing_jump: false,
            want_jump: false,
            want_wall_walk: false,
            was_jumping: false,
            was_wall_walking: false,
            wall_walk_toggle: true,
            jump_key_hold_time: 0.0,
            jump_force_time_remaining: 0.0,
            jump_current_count: 0,
            wall_walk_hold_time: 0.0,
        }
    }
}

impl JumpState {
    /// Create a new jump state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the jump button going down.
    ///
    /// A press while not moving vertically asks for a jump; any other press
    /// asks for a wall walk.
    pub fn press(&mut self, vertical_velocity: f32) {
        self.is_pressing_jump = true;

        if !self.want_jump && !self.want_wall_walk && vertical_velocity == 0.0 {
            self.want_jump = true;
        } else if !self.want_jump {
            self.want_wall_walk = true;
        }

        self.jump_key_hold_time = 0.0;
        self.wall_walk_hold_time = 0.0;
    }

    /// Clear every request and timer. The jump count survives while falling
    /// so that releasing mid-air does not grant another jump.
    pub fn reset(&mut self, falling: bool) {
        self.is_pressing_jump = false;
        self.want_wall_walk = false;
        self.want_jump = false;
        self.was_jumping = false;
        self.jump_key_hold_time = 0.0;
        self.jump_force_time_remaining = 0.0;
        self.wall_walk_hold_time = 0.0;

        if !falling {
            self.jump_current_count = 0;
        }
    }

    /// Whether the held jump is still pushing upward.
    #[inline]
    pub fn is_providing_force(&self) -> bool {
        self.jump_force_time_remaining > 0.0
    }

    /// How much of a sustained jump's boost has been used up, from 0 to 1.
    pub fn hold_factor(&self, config: &MovementConfig) -> f32 {
        if self.was_jumping && config.jump_max_hold_time > 0.0 {
            (1.0 - self.jump_force_time_remaining / config.jump_max_hold_time).powf(config.jump_hold_force_factor)
        } else {
            0.0
        }
    }

    /// Whether a jump may start (or continue) in `mode`.
    pub fn can_jump(&self, mode: MovementMode, config: &MovementConfig) -> bool {
        if !matches!(mode, MovementMode::Walking | MovementMode::Falling) {
            return false;
        }

        let max_count = config.jump_max_count;
        if !self.was_jumping || config.jump_max_hold_time <= 0.0 {
            if self.jump_current_count == 0 && mode == MovementMode::Falling {
                self.jump_current_count + 1 < max_count
            } else {
                self.jump_current_count < max_count
            }
        } else {
            // Sustaining: only while the key is held within its window
            let key_held = self.want_jump && self.jump_key_hold_time < config.jump_max_hold_time;
            config.long_jump_enabled
                && key_held
                && (self.jump_current_count < max_count
                    || (self.was_jumping && self.jump_current_count == max_count))
        }
    }

    /// Whether a wall walk may start in `mode`.
    pub fn can_wall_walk(&self, mode: MovementMode, config: &MovementConfig) -> bool {
        mode == MovementMode::Falling
            && config.wall_walk_enabled
            && self.want_wall_walk
            && self.wall_walk_toggle
            && !self.can_jump(mode, config)
            && self.wall_walk_hold_time < config.wall_walk_max_hold_time
    }

    /// Age the jump request after input has been consumed for this tick.
    pub fn clear_input(&mut self, dt: f32, config: &MovementConfig) {
        if self.want_jump {
            self.jump_key_hold_time += dt;

            // Keep the request while held; force time may still have a step to run
            if self.jump_key_hold_time >= config.jump_max_hold_time {
                self.want_jump = false;
            }
        } else {
            self.jump_force_time_remaining = 0.0;
            self.was_jumping = false;
        }
    }
}
