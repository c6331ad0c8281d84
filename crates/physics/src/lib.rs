//! Tilerunner Physics
//!
//! A deterministic kinematic movement core for a side-view platformer
//! character, frame-stepped with bounded sub-steps.
//!
//! # Architecture
//!
//! The physics is split into two main systems:
//!
//! - **Collision**: Sweeps the character box through 2D surfaces, returns hit information
//! - **Movement**: Uses collision sweeps to implement walking, falling and wall walking
//!
//! # Design Principles
//!
//! 1. **Determinism**: Same inputs always produce same outputs
//! 2. **Explicit state**: The simulator owns no character; callers pass state in
//! 3. **Graceful failure**: Nothing inside a tick errors; bad cases degrade to not moving or falling

pub mod collision;
pub mod movement;

// Re-export commonly used types
pub use collision::{CollisionQuery, CollisionWorld, ContentFlags, HitResult, Surface, SurfaceId, TraceShape};
pub use movement::{
    ConfigError, MovementConfig, MovementEvent, MovementInput, MovementMode, MovementSimulator, MovementState,
};
