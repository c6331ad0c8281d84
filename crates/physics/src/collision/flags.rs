//! Content flags for collision filtering.
//!
//! Every surface in the world carries a set of content flags. Queries pass a
//! mask and only surfaces whose contents intersect the mask are considered.

use serde::{Deserialize, Serialize};

/// Content flags describe what type of volume a surface is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ContentFlags(pub u32);

impl ContentFlags {
    /// Empty space - nothing here.
    pub const EMPTY: Self = Self(0);

    /// Static tile geometry - ground, walls, slopes.
    pub const SOLID: Self = Self(1 << 0);

    /// Moving platform. Blocks like solid but is expected to move.
    pub const PLATFORM: Self = Self(1 << 1);

    /// Lethal hazard (spikes). Blocks movement; touching it kills.
    pub const HAZARD: Self = Self(1 << 2);

    /// Character clip - blocks characters only.
    pub const CHARACTER_CLIP: Self = Self(1 << 3);

    /// Trigger volume - never blocks, only reported to the owner.
    pub const TRIGGER: Self = Self(1 << 4);

    /// Character body - another simulated character.
    pub const CHARACTER_BODY: Self = Self(1 << 5);

    /// Everything a walking character collides with.
    pub const MASK_CHARACTER_SOLID: Self = Self(
        Self::SOLID.0 | Self::PLATFORM.0 | Self::HAZARD.0 | Self::CHARACTER_CLIP.0 | Self::CHARACTER_BODY.0,
    );

    /// What the hazard probe in front of a walking character looks for.
    pub const MASK_HAZARD_PROBE: Self = Self(Self::SOLID.0 | Self::PLATFORM.0 | Self::HAZARD.0);

    /// Check if these flags contain a specific flag.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any of the given flags are set.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Remove flags from this set.
    #[inline]
    pub fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether a surface with these contents stops a moving character.
    #[inline]
    pub fn blocks_characters(self) -> bool {
        self.intersects(Self::MASK_CHARACTER_SOLID)
    }
}

impl std::ops::BitOr for ContentFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for ContentFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}
