#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod content;
pub mod direction;
pub mod item;
pub mod tags;
pub mod terrain;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use content::{
    AnimationClip, BehaviourSpec, BuildingCategory, BuildingDef, ContentError, ContentRegistry,
    DropEntry, FrameSpec, ItemDef, MobAttackDef, MobDef, ProjectileDef, ProjectileEffectDef,
    ResourceDef, ResourceTag, TagModifier, ToolDef,
};
pub use direction::Direction;
pub use item::{ItemInfo, ItemSerial};
pub use tags::{TagChoice, TagSet, TagSlot};
pub use terrain::{Decoration, Terrain};

/// Fixed simulation rate (ticks per second).
pub const TICKS_PER_SECOND: u32 = 60;

/// Wall-clock milliseconds covered by one simulation tick.
pub const TICK_MILLIS: f64 = 1000.0 / TICKS_PER_SECOND as f64;

/// Fixed tick type (60 TPS => ~16.7 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }

    /// Milliseconds of simulated time elapsed since [`SimTick::ZERO`].
    pub fn elapsed_millis(self) -> f64 {
        self.0 as f64 * TICK_MILLIS
    }
}

/// Build the gameplay random source.
///
/// Gameplay randomness (spawn timing, tag rolls, wander targets) is not
/// required to be replayable, but tests seed it to pin outcomes.
pub fn gameplay_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
