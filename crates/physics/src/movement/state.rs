//! Movement state and input structures.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::collision::SurfaceId;

use super::config::MovementConfig;
use super::floor::FloorResult;
use super::jump::JumpState;

/// Which physics routine drives the character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementMode {
    /// Movement disabled.
    None,

    /// On a walkable floor.
    Walking,

    /// Airborne under gravity.
    #[default]
    Falling,

    /// Gliding horizontally in the air while jump is held.
    WallWalking,
}

impl MovementMode {
    /// Display name used for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Walking => "Walking",
            Self::Falling => "Falling",
            Self::WallWalking => "Wall Walking",
        }
    }
}

impl std::fmt::Display for MovementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the character stands relative to its base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasedMovement {
    /// Surface the character stands on.
    pub base: Option<SurfaceId>,

    /// Position relative to the base location.
    pub location: Vec3,

    /// Rotation relative to the base when `has_relative_rotation`, absolute otherwise.
    pub rotation: Quat,

    pub has_relative_rotation: bool,
}

impl Default for BasedMovement {
    fn default() -> Self {
        Self {
            base: None,
            location: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            has_relative_rotation: false,
        }
    }
}

/// Complete movement state for a character.
///
/// Owned by the character and mutated only by the
/// [`MovementSimulator`](super::MovementSimulator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementState {
    /// Center of the collision box in world space.
    pub position: Vec3,

    pub rotation: Quat,

    /// Velocity in world space (units/second).
    pub velocity: Vec3,

    /// Input acceleration from the last tick, after scaling.
    pub acceleration: Vec3,

    pub mode: MovementMode,

    /// Last floor probe. Cleared whenever the character leaves the ground.
    pub current_floor: FloorResult,

    pub based: BasedMovement,

    /// Base transform at the last save, used to carry the character.
    pub old_base_location: Vec3,
    pub old_base_rotation: Quat,

    pub jump: JumpState,

    /// Velocity change applied at the start of the next tick.
    pub pending_impulse: Vec3,

    /// Acceleration applied over the next tick.
    pub pending_force: Vec3,

    /// Velocity that replaces the current one next tick (zero = none).
    pub pending_launch_velocity: Vec3,

    /// Current acceleration cap (normal or sprint).
    pub max_acceleration: f32,

    /// Current ground speed cap (normal or sprint).
    pub max_walk_speed: f32,

    pub sprinting: bool,

    /// Grace flag after sprint ends: speed decays instead of snapping to the cap.
    pub sprint_stop: bool,

    /// Wall-walk speed ceiling. Only ever decreases while wall walking.
    pub last_speed: f32,

    /// Input magnitude from 0 to 1, scales the speed cap.
    pub analog_input_modifier: f32,

    /// Position changed without real motion this step (penetration fix, teleport).
    pub just_teleported: bool,

    /// Bypass the floor cache on the next probe.
    pub force_next_floor_check: bool,

    pub last_update_location: Vec3,
    pub last_update_rotation: Quat,
    pub last_update_velocity: Vec3,

    /// The character's own collision body, skipped by its queries.
    pub body: Option<SurfaceId>,

    /// Inactive characters are skipped entirely.
    pub active: bool,

    /// Dead characters keep zero velocity until respawned.
    pub dead: bool,
}

impl Default for MovementState {
    fn default() -> Self {
        Self::new(Vec3::ZERO, &MovementConfig::default())
    }
}

impl MovementState {
    /// Create a new movement state at the given position.
    pub fn new(position: Vec3, config: &MovementConfig) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            mode: MovementMode::Falling,
            current_floor: FloorResult::default(),
            based: BasedMovement::default(),
            old_base_location: Vec3::ZERO,
            old_base_rotation: Quat::IDENTITY,
            jump: JumpState::default(),
            pending_impulse: Vec3::ZERO,
            pending_force: Vec3::ZERO,
            pending_launch_velocity: Vec3::ZERO,
            max_acceleration: config.max_acceleration,
            max_walk_speed: config.max_walk_speed,
            sprinting: false,
            sprint_stop: false,
            last_speed: config.sprint_max_walk_speed,
            analog_input_modifier: 0.0,
            just_teleported: false,
            force_next_floor_check: false,
            last_update_location: position,
            last_update_rotation: Quat::IDENTITY,
            last_update_velocity: Vec3::ZERO,
            body: None,
            active: true,
            dead: false,
        }
    }

    /// Attach the character's own collision body so queries skip it.
    pub fn with_body(mut self, body: SurfaceId) -> Self {
        self.body = Some(body);
        self
    }

    #[inline]
    pub fn is_walking(&self) -> bool {
        self.mode == MovementMode::Walking
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        self.mode == MovementMode::Falling
    }

    #[inline]
    pub fn is_wall_walking(&self) -> bool {
        self.mode == MovementMode::WallWalking
    }

    /// Same as [`is_walking`](Self::is_walking); kept for owners that ask about ground contact.
    #[inline]
    pub fn is_moving_on_ground(&self) -> bool {
        self.is_walking()
    }

    /// There is no flying mode.
    #[inline]
    pub fn is_flying(&self) -> bool {
        false
    }

    pub fn current_velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn current_acceleration(&self) -> Vec3 {
        self.acceleration
    }

    /// Mode name for HUDs and logs.
    pub fn movement_name(&self) -> &'static str {
        self.mode.name()
    }

    /// Surface the character currently stands on.
    pub fn base(&self) -> Option<SurfaceId> {
        self.based.base
    }

    /// Get current horizontal speed.
    pub fn horizontal_speed(&self) -> f32 {
        Vec3::new(self.velocity.x, self.velocity.y, 0.0).length()
    }

    /// Check if moving (has significant velocity).
    pub fn is_moving(&self) -> bool {
        self.velocity.length_squared() > 0.01
    }

    /// Bottom center of the collision box.
    pub fn feet_position(&self, config: &MovementConfig) -> Vec3 {
        self.position - Vec3::new(0.0, 0.0, config.half_extents.z)
    }
}

/// Per-tick input for the simulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementInput {
    /// Requested movement direction, magnitude up to 1.
    pub acceleration: Vec3,

    /// Jump went down this tick.
    pub jump_pressed: bool,

    /// Jump went up this tick.
    pub jump_released: bool,

    pub sprint_start: bool,
    pub sprint_stop: bool,
}

impl MovementInput {
    /// Input that only pushes sideways.
    pub fn lateral(x: f32) -> Self {
        Self {
            acceleration: Vec3::new(x, 0.0, 0.0),
            ..Default::default()
        }
    }

    pub fn with_jump_pressed(mut self) -> Self {
        self.jump_pressed = true;
        self
    }

    pub fn with_jump_released(mut self) -> Self {
        self.jump_released = true;
        self
    }

    /// Check if any movement input is active.
    #[inline]
    pub fn has_movement_input(&self) -> bool {
        self.acceleration.length_squared() > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_uses_config_speeds() {
        let config = MovementConfig::default();
        let state = MovementState::new(Vec3::new(0.0, 0.0, 12.0), &config);

        assert_eq!(state.max_walk_speed, 50.0);
        assert_eq!(state.max_acceleration, 150.0);
        assert_eq!(state.last_speed, 100.0);
        assert_eq!(state.mode, MovementMode::Falling);
        assert!(state.active);
        assert!(!state.current_floor.blocking_hit);
    }

    #[test]
    fn test_mode_queries_are_exclusive() {
        let mut state = MovementState::default();
        for mode in [
            MovementMode::None,
            MovementMode::Walking,
            MovementMode::Falling,
            MovementMode::WallWalking,
        ] {
            state.mode = mode;
            let set = [state.is_walking(), state.is_falling(), state.is_wall_walking()]
                .iter()
                .filter(|b| **b)
                .count();
            assert_eq!(set, usize::from(mode != MovementMode::None), "mode {:?}", mode);
            assert!(!state.is_flying());
        }
    }

    #[test]
    fn test_movement_names() {
        assert_eq!(MovementMode::Walking.name(), "Walking");
        assert_eq!(MovementMode::Falling.name(), "Falling");
        assert_eq!(MovementMode::WallWalking.to_string(), "Wall Walking");
        assert_eq!(MovementMode::None.name(), "None");
    }

    #[test]
    fn test_horizontal_speed_ignores_z() {
        let mut state = MovementState::default();
        state.velocity = Vec3::new(3.0, 0.0, -400.0);
        assert!((state.horizontal_speed() - 3.0).abs() < 1e-6);

        let config = MovementConfig::default();
        state.position = Vec3::new(0.0, 0.0, 12.0);
        assert_eq!(state.feet_position(&config), Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_input_helpers() {
        let input = MovementInput::lateral(1.0).with_jump_pressed();
        assert!(input.has_movement_input());
        assert!(input.jump_pressed);
        assert!(!MovementInput::default().has_movement_input());
    }
}
