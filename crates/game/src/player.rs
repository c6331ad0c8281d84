//! Player entity and state.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tilerunner_physics::collision::Mobility;
use tilerunner_physics::{
    CollisionQuery, CollisionWorld, ContentFlags, MovementConfig, MovementEvent, MovementInput,
    MovementSimulator, MovementState, Surface, SurfaceId,
};

use crate::input::{InputTracker, PlayerInput};

/// Unique identifier for entities.
pub type EntityId = u32;

/// A player in the game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: EntityId,

    /// Player name/handle.
    pub name: String,

    /// Movement physics state.
    pub movement: MovementState,

    /// The player's collision body in the level.
    pub body: SurfaceId,

    /// Which level spawn point this player uses.
    pub spawn_index: usize,

    pub alive: bool,

    /// Deaths this session.
    pub deaths: u32,

    /// Seconds until a dead player respawns.
    pub respawn_timer: f32,

    input: InputTracker,
}

impl Player {
    pub fn new(id: EntityId, name: String, body: SurfaceId, spawn_position: Vec3, config: &MovementConfig) -> Self {
        Self {
            id,
            name,
            movement: MovementState::new(spawn_position, config).with_body(body),
            body,
            spawn_index: 0,
            alive: true,
            deaths: 0,
            respawn_timer: 0.0,
            input: InputTracker::new(),
        }
    }

    /// The collision body other characters see for a player with `config`.
    pub fn body_surface(name: &str, position: Vec3, config: &MovementConfig) -> Surface {
        let half = config.half_extents;
        Surface::rect(name, position, half.x, half.z, ContentFlags::CHARACTER_BODY).with_mobility(Mobility::Movable)
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.movement.position
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    #[inline]
    pub fn on_ground(&self) -> bool {
        self.movement.is_moving_on_ground()
    }

    /// Turn this frame's raw input into movement input.
    pub fn movement_input(&mut self, input: &PlayerInput) -> MovementInput {
        self.input.to_movement_input(input)
    }

    /// Whether these events should kill the player.
    pub fn is_lethal(events: &[MovementEvent]) -> bool {
        events
            .iter()
            .any(|event| matches!(event, MovementEvent::Died { .. }) || event.is_hazard_impact())
    }

    /// Kill the player and start the respawn countdown.
    ///
    /// Returns false if the player was already dead.
    pub fn kill(&mut self, respawn_delay: f32) -> bool {
        if !self.alive {
            return false;
        }

        self.alive = false;
        self.deaths += 1;
        self.respawn_timer = respawn_delay;
        self.movement.dead = true;
        self.movement.velocity = Vec3::ZERO;
        self.movement.acceleration = Vec3::ZERO;
        true
    }

    /// Count down the respawn timer. Returns true once the player should
    /// respawn.
    pub fn update_respawn_timer(&mut self, delta_time: f32) -> bool {
        if self.alive {
            return false;
        }
        self.respawn_timer -= delta_time;
        self.respawn_timer <= 0.0
    }

    /// Bring the player back at `position`.
    pub fn respawn(
        &mut self,
        simulator: &MovementSimulator,
        position: Vec3,
        world: &dyn CollisionQuery,
    ) -> Vec<MovementEvent> {
        self.alive = true;
        self.respawn_timer = 0.0;
        self.input.reset();
        simulator.spawn_at(&mut self.movement, position, world)
    }

    /// Copy the player's position, velocity and base onto its body surface.
    pub fn sync_body(&self, world: &mut CollisionWorld) {
        world.set_transform(self.body, self.movement.position, Quat::IDENTITY);
        if let Some(surface) = world.surface_mut(self.body) {
            surface.velocity = self.movement.velocity;
            surface.base = self.movement.base();
            surface.collision_enabled = self.alive;
        }
    }
}
