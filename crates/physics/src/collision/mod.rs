//! Collision detection for a side-view world.
//!
//! This module provides the geometry the movement code sweeps against:
//! convex surfaces in the XZ plane, tested against an axis-aligned
//! character box.
//!
//! # Key Types
//!
//! - [`CollisionWorld`]: registry of all surfaces, implements [`CollisionQuery`]
//! - [`HitResult`]: output from a sweep or line trace
//! - [`TraceShape`]: shape used for tracing (box or point)
//! - [`Surface`] / [`SurfaceId`]: geometry and the handles that refer to it
//!
//! # Tracing Algorithm
//!
//! Sweeps move a shape through the world and return:
//! - How far the shape traveled (time 0.0-1.0)
//! - The shape position and contact point at impact
//! - Surface normal at impact
//! - Which surface was hit, and whether the shape started inside it

mod flags;
mod query;
mod surface;
mod sweep;
mod trace;
mod world;

pub use flags::ContentFlags;
pub use query::CollisionQuery;
pub use surface::{Mobility, Surface, SurfaceId};
pub use sweep::CONTACT_EPSILON;
pub use trace::{HitResult, QueryParams, ShrinkExtent, TraceShape};
pub use world::CollisionWorld;
