//! Events produced by a movement tick.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collision::{ContentFlags, SurfaceId};

use super::state::MovementMode;

/// Something the owner of a character may want to react to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MovementEvent {
    ModeChanged { from: MovementMode, to: MovementMode },

    /// The character landed on `surface` while moving at `velocity`.
    Landed { surface: Option<SurfaceId>, velocity: Vec3 },

    /// A jump started. `count` is the number of jumps since the last landing.
    Jumped { count: u32 },

    WallWalkStarted,

    /// A sweep was blocked.
    Impact {
        surface: Option<SurfaceId>,
        normal: Vec3,
        contents: ContentFlags,
    },

    BaseChanged { base: Option<SurfaceId> },

    /// The hazard probe found something lethal.
    Died { hazard: Option<SurfaceId> },
}

impl MovementEvent {
    /// Whether this is an impact against a hazard surface.
    pub fn is_hazard_impact(&self) -> bool {
        matches!(self, Self::Impact { contents, .. } if contents.contains(ContentFlags::HAZARD))
    }
}
