//! Game simulation - the main game loop.
//!
//! The simulation is deterministic: the same level, config and input
//! sequence always produce the same state, tick for tick.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tilerunner_physics::{ConfigError, MovementConfig, MovementEvent, MovementSimulator};

use crate::input::PlayerInput;
use crate::level::{Level, LevelError, LevelSettings};
use crate::player::{EntityId, Player};

/// Errors from setting up or loading a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid movement config: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid level: {0}")]
    Level(#[from] LevelError),

    #[error("tick rate must be at least 1")]
    TickRate,

    #[error("respawn delay must not be negative, got {0}")]
    RespawnDelay(f32),
}

/// Game simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulation tick rate (ticks per second).
    pub tick_rate: u32,

    /// Movement physics configuration.
    pub movement: MovementConfig,

    /// Seconds a dead player waits before respawning.
    pub respawn_delay: f32,

    pub level: LevelSettings,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            movement: MovementConfig::default(),
            respawn_delay: 0.5,
            level: LevelSettings::default(),
        }
    }
}

impl SimulationConfig {
    /// Read a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.tick_rate == 0 {
            return Err(SimulationError::TickRate);
        }
        if self.respawn_delay < 0.0 {
            return Err(SimulationError::RespawnDelay(self.respawn_delay));
        }
        self.movement.validate()?;
        Ok(())
    }

    /// Get the time step per tick in seconds.
    pub fn delta_time(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}

/// The main game simulation.
#[derive(Debug)]
pub struct Simulation {
    /// Current frame/tick number.
    pub frame: u64,

    pub config: SimulationConfig,

    pub level: Level,

    /// All players in the game.
    pub players: Vec<Player>,

    simulator: MovementSimulator,

    /// Next entity ID to assign.
    next_entity_id: EntityId,
}

impl Simulation {
    pub fn new(config: SimulationConfig, level: Level) -> Result<Self, SimulationError> {
        config.validate()?;
        let simulator = MovementSimulator::new(config.movement.clone());

        Ok(Self {
            frame: 0,
            config,
            level,
            players: Vec::new(),
            simulator,
            next_entity_id: 1,
        })
    }

    /// Simulation of the built-in demo level.
    pub fn demo(config: SimulationConfig) -> Result<Self, SimulationError> {
        let level = Level::demo(&config.level)?;
        Self::new(config, level)
    }

    pub fn simulator(&self) -> &MovementSimulator {
        &self.simulator
    }

    /// Seconds of simulated time so far.
    pub fn time(&self) -> f32 {
        self.frame as f32 * self.config.delta_time()
    }

    /// Add a player at the next spawn point. Returns the player's ID.
    pub fn add_player(&mut self, name: &str) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;

        let spawn_index = self.players.len();
        let position = self.level.spawn_point(spawn_index).unwrap_or_default();

        let body = self
            .level
            .collision
            .add_surface(Player::body_surface(name, position, &self.config.movement));
        let mut player = Player::new(id, name.to_string(), body, position, &self.config.movement);
        player.spawn_index = spawn_index;
        player.respawn(&self.simulator, position, &self.level.collision);
        player.sync_body(&mut self.level.collision);

        log::info!("Player {} ({}) joined at {:?}", id, name, player.position());
        self.players.push(player);
        id
    }

    /// Remove a player and its body from the simulation.
    pub fn remove_player(&mut self, player_id: EntityId) {
        if let Some(index) = self.players.iter().position(|p| p.id == player_id) {
            let player = self.players.remove(index);
            self.level.collision.remove_surface(player.body);
        }
    }

    pub fn get_player(&self, player_id: EntityId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn get_player_mut(&mut self, player_id: EntityId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    /// Advance the simulation by one tick.
    ///
    /// `inputs` are indexed by player position in `players`; missing inputs
    /// count as no buttons held. Returns every movement event of the tick,
    /// tagged with the player it happened to.
    pub fn tick(&mut self, inputs: &[PlayerInput]) -> Vec<(EntityId, MovementEvent)> {
        let delta_time = self.config.delta_time();
        self.frame += 1;
        self.level.advance_platforms(self.time());

        let mut tick_events = Vec::new();
        for (i, player) in self.players.iter_mut().enumerate() {
            if !player.is_alive() {
                if player.update_respawn_timer(delta_time) {
                    let position = self.level.spawn_point(player.spawn_index).unwrap_or_default();
                    let events = player.respawn(&self.simulator, position, &self.level.collision);
                    log::info!("Player {} respawned at {:?}", player.id, player.position());
                    tick_events.extend(events.into_iter().map(|event| (player.id, event)));
                    player.sync_body(&mut self.level.collision);
                }
                continue;
            }

            let input = player.movement_input(&inputs.get(i).copied().unwrap_or_default());
            let events = self
                .simulator
                .tick(&mut player.movement, &input, &self.level.collision, delta_time);

            if Player::is_lethal(&events) && player.kill(self.config.respawn_delay) {
                log::info!(
                    "Player {} died at {:?} (deaths: {})",
                    player.id,
                    player.position(),
                    player.deaths
                );
            }

            player.sync_body(&mut self.level.collision);
            tick_events.extend(events.into_iter().map(|event| (player.id, event)));
        }

        tick_events
    }

    /// Serialized player state, for comparing runs.
    pub fn snapshot(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string(&self.players)?)
    }

    pub fn delta_time(&self) -> f32 {
        self.config.delta_time()
    }
}

// ============================================================================
// Tests
// ============================================================================
