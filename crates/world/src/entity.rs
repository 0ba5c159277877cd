//! Shared physical state of everything that moves through the world.

use std::cmp::Ordering;

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};
use verdant_core::Direction;

use crate::coords::WorldPos;
use crate::storage::ChunkStore;

/// Geometric decay applied to knockback force each tick.
pub const FORCE_DECAY: f64 = 0.8;

/// Squared force magnitude below which knockback is cleared.
pub const MIN_FORCE_SQ: f64 = 0.01;

/// Manager-assigned entity identity. Never reused within a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out entity ids for every manager of one world.
#[derive(Debug, Clone, Default)]
pub struct EntityIds {
    next: u64,
}

impl EntityIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> EntityId {
        self.next += 1;
        EntityId(self.next)
    }
}

/// Reference to an entity of any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Player(EntityId),
    Mob(EntityId),
    Item(EntityId),
    Projectile(EntityId),
    /// Resources live on tiles and are addressed by tile coordinate.
    Resource(IVec2),
}

impl EntityRef {
    /// Variant first, then id, then tile (x before y).
    fn sort_key(&self) -> (u8, u64, i32, i32) {
        match *self {
            EntityRef::Player(id) => (0, id.0, 0, 0),
            EntityRef::Mob(id) => (1, id.0, 0, 0),
            EntityRef::Item(id) => (2, id.0, 0, 0),
            EntityRef::Projectile(id) => (3, id.0, 0, 0),
            EntityRef::Resource(tile) => (4, 0, tile.x, tile.y),
        }
    }
}

// `IVec2` has no total order, so `Ord` cannot be derived.
impl Ord for EntityRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for EntityRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Something with a circular hitbox.
pub trait Hittable {
    /// Centre of the hitbox in world space.
    fn hitbox_center(&self) -> DVec2;
    /// Squared hitbox radius.
    fn hit_radius_sq(&self) -> f64;

    /// Circle overlap: squared centre distance against the sum of both
    /// squared radii.
    fn collides_with(&self, other: &dyn Hittable) -> bool {
        self.hitbox_center().distance_squared(other.hitbox_center())
            <= self.hit_radius_sq() + other.hit_radius_sq()
    }
}

/// Position, facing, hitbox and knockback state of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    position: WorldPos,
    pub facing: Direction,
    hit_radius_sq: f64,
    hitbox_offset: DVec2,
    force: DVec2,
    despawn: bool,
}

impl Body {
    pub fn new(position: DVec2, hit_radius: f64) -> Self {
        Self {
            position: WorldPos::new(position),
            facing: Direction::default(),
            hit_radius_sq: hit_radius * hit_radius,
            hitbox_offset: DVec2::ZERO,
            force: DVec2::ZERO,
            despawn: false,
        }
    }

    pub fn with_hitbox_offset(mut self, offset: DVec2) -> Self {
        self.hitbox_offset = offset;
        self
    }

    pub fn position(&self) -> DVec2 {
        self.position.continuous()
    }

    pub fn world_pos(&self) -> &WorldPos {
        &self.position
    }

    pub fn tile(&self) -> IVec2 {
        self.position.tile()
    }

    pub fn set_position(&mut self, position: DVec2) {
        self.position.set(position);
    }

    pub fn set_hit_radius(&mut self, hit_radius: f64) {
        self.hit_radius_sq = hit_radius * hit_radius;
    }

    /// Turn toward the dominant axis of `vector`; zero vectors keep the facing.
    pub fn face(&mut self, vector: DVec2) {
        if let Some(direction) = Direction::from_vector(vector.x, vector.y) {
            self.facing = direction;
        }
    }

    pub fn force(&self) -> DVec2 {
        self.force
    }

    /// Add an external knockback impulse.
    pub fn apply_force(&mut self, force: DVec2) {
        self.force += force;
    }

    pub fn has_force(&self) -> bool {
        self.force != DVec2::ZERO
    }

    /// Step that knockback would move the body this tick, then decay it.
    ///
    /// The force is cleared once its squared magnitude drops below
    /// [`MIN_FORCE_SQ`].
    pub fn take_force_step(&mut self) -> DVec2 {
        let step = self.force;
        self.force *= FORCE_DECAY;
        if self.force.length_squared() < MIN_FORCE_SQ {
            self.force = DVec2::ZERO;
        }
        step
    }

    /// Move by `step` unless the destination is blocked.
    pub fn try_move(&mut self, store: &mut ChunkStore, step: DVec2) -> bool {
        if step == DVec2::ZERO {
            return true;
        }
        let to = self.position() + step;
        if store.validate_movement(to) {
            self.set_position(to);
            true
        } else {
            false
        }
    }

    /// Move by `step`, sliding along one axis when the full step is blocked.
    pub fn slide(&mut self, store: &mut ChunkStore, step: DVec2) -> bool {
        if self.try_move(store, step) {
            return true;
        }
        let along_x = DVec2::new(step.x, 0.0);
        let along_y = DVec2::new(0.0, step.y);
        (along_x != DVec2::ZERO && self.try_move(store, along_x))
            || (along_y != DVec2::ZERO && self.try_move(store, along_y))
    }

    pub fn flag_despawn(&mut self) {
        self.despawn = true;
    }

    pub fn is_despawned(&self) -> bool {
        self.despawn
    }
}

impl Hittable for Body {
    fn hitbox_center(&self) -> DVec2 {
        self.position.continuous() + self.hitbox_offset
    }

    fn hit_radius_sq(&self) -> f64 {
        self.hit_radius_sq
    }
}

/// A point-like hitbox, used for resources and ad-hoc point queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitCircle {
    pub center: DVec2,
    pub radius_sq: f64,
}

impl Hittable for HitCircle {
    fn hitbox_center(&self) -> DVec2 {
        self.center
    }

    fn hit_radius_sq(&self) -> f64 {
        self.radius_sq
    }
}
