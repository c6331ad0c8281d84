//! Tilerunner Game Logic
//!
//! This crate drives the movement core from the owner's side:
//!
//! - Player input handling
//! - ASCII tile levels with slopes, spikes and moving platforms
//! - Player entities that die on hazards and respawn
//! - A fixed-rate simulation loop
//!
//! # Architecture
//!
//! The simulation is deterministic. All state updates are driven by player
//! input and a fixed timestep.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      Game Simulation                       │
//! │  ┌─────────┐    ┌───────────┐    ┌──────────────────────┐  │
//! │  │ Player  │───►│ Movement  │───►│ Events               │  │
//! │  │ Input   │    │ Simulator │    │ (deaths, landings,   │  │
//! │  └─────────┘    └───────────┘    │  respawns)           │  │
//! │       platforms move first ──►   └──────────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod input;
pub mod level;
pub mod player;
pub mod simulation;

// Re-export main types
pub use input::{InputTracker, PlayerInput};
pub use level::{Level, LevelError, LevelSettings, MovingPlatform};
pub use player::{EntityId, Player};
pub use simulation::{Simulation, SimulationConfig, SimulationError};

// Re-export physics types for convenience
pub use tilerunner_physics::{
    CollisionWorld, ContentFlags, MovementConfig, MovementEvent, MovementMode, MovementSimulator, MovementState,
};
