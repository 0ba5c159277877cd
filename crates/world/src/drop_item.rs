//! Dropped item system with physics and lifecycle management.
//!
//! Items are scattered by harvested resources and defeated mobs. They fly on a
//! small ballistic arc, bounce until they settle, can be collected by players
//! after a short delay and despawn after a fixed age.

use glam::{DVec2, IVec2};
use tracing::debug;
use verdant_core::{ItemInfo, SimTick};

use crate::config::SimConfig;
use crate::coords::chebyshev;
use crate::entity::{Body, EntityId, EntityRef, Hittable};
use crate::player::PlayerManager;
use crate::storage::ChunkStore;

/// Item collision radius in world units.
pub const ITEM_HIT_RADIUS: f64 = 6.0;
/// Horizontal speed below which an item stops sliding.
pub const LOWEST_SPEED: f64 = 0.05;
/// Bounce velocity below which an item stops bouncing.
pub const LOWEST_BOUNCE: f64 = 0.1;
/// Horizontal speed is divided by this on each ground contact.
pub const SPEED_DIVISOR: f64 = 2.0;
/// Bounce velocity is divided by this on each ground contact.
pub const BOUNCE_DIVISOR: f64 = 2.0;
/// Downward acceleration of the bounce height (world units per tick²).
pub const GRAVITY: f64 = 0.2;

/// A dropped item lying in (or flying over) the world.
#[derive(Debug, Clone)]
pub struct DroppedItem {
    pub id: EntityId,
    pub body: Body,
    pub info: ItemInfo,
    direction: DVec2,
    speed: f64,
    height: f64,
    vertical_velocity: f64,
    bounce: f64,
    age_ticks: u64,
}

impl DroppedItem {
    /// Create an item launched along `direction` with a first bounce of `bounce`.
    pub fn new(
        id: EntityId,
        info: ItemInfo,
        position: DVec2,
        direction: DVec2,
        speed: f64,
        bounce: f64,
    ) -> Self {
        Self {
            id,
            body: Body::new(position, ITEM_HIT_RADIUS),
            info,
            direction: direction.normalize_or_zero(),
            speed,
            height: 0.0,
            vertical_velocity: bounce,
            bounce,
            age_ticks: 0,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::Item(self.id)
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn bounce(&self) -> f64 {
        self.bounce
    }

    /// Height above the ground, for drawing.
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn age_ticks(&self) -> u64 {
        self.age_ticks
    }

    /// Whether all motion has stopped.
    pub fn is_settled(&self) -> bool {
        self.speed == 0.0 && self.bounce == 0.0 && self.height == 0.0
    }

    /// Advance physics and age by one tick.
    pub fn update(&mut self, store: &mut ChunkStore, despawn_ticks: u64) {
        if self.speed > 0.0 && !self.body.try_move(store, self.direction * self.speed) {
            self.speed = 0.0;
        }

        if self.height > 0.0 || self.vertical_velocity > 0.0 {
            self.height += self.vertical_velocity;
            self.vertical_velocity -= GRAVITY;
            if self.height <= 0.0 {
                self.ground_contact();
            }
        } else if self.speed > 0.0 {
            // Sliding on the ground counts as a contact every tick.
            self.ground_contact();
        }

        self.age_ticks += 1;
        if self.age_ticks >= despawn_ticks {
            self.body.flag_despawn();
        }
    }

    fn ground_contact(&mut self) {
        self.height = 0.0;

        self.speed /= SPEED_DIVISOR;
        if self.speed < LOWEST_SPEED {
            self.speed = 0.0;
        }

        self.bounce /= BOUNCE_DIVISOR;
        if self.bounce < LOWEST_BOUNCE {
            self.bounce = 0.0;
        }
        self.vertical_velocity = self.bounce;
    }
}

/// Manages all dropped items in the world.
#[derive(Debug, Default)]
pub struct ItemManager {
    items: Vec<DroppedItem>,
}

impl ItemManager {
    /// Create a new empty item manager.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, item: DroppedItem) {
        self.items.push(item);
    }

    /// Get the number of active dropped items.
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, id: EntityId) -> Option<&DroppedItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut DroppedItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DroppedItem> {
        self.items.iter()
    }

    /// Update every item, hand collectable ones to colliding players and
    /// sweep the despawned.
    ///
    /// Returns the references of removed items.
    pub fn update(
        &mut self,
        store: &mut ChunkStore,
        players: &mut PlayerManager,
        tick: SimTick,
        config: &SimConfig,
        center_tile: Option<IVec2>,
    ) -> Vec<EntityRef> {
        for item in &mut self.items {
            if item.body.is_despawned() {
                continue;
            }
            if let Some(center) = center_tile {
                if chebyshev(item.body.tile(), center) > config.despawn_distance {
                    item.body.flag_despawn();
                    continue;
                }
            }

            item.update(store, config.item_despawn_ticks);
            if item.body.is_despawned() || item.age_ticks < config.item_pickup_delay_ticks {
                continue;
            }

            if let Some(player) = players
                .iter_mut()
                .find(|p| p.body.collides_with(&item.body))
            {
                let mut info = item.info.clone();
                info.picked_up_at = Some(tick);
                debug!(item = %info.id, player = %player.id, "Picked up item");
                player.inventory.add(info);
                item.body.flag_despawn();
            }
        }

        let mut removed = Vec::new();
        self.items.retain(|item| {
            if item.body.is_despawned() {
                removed.push(item.entity_ref());
                false
            } else {
                true
            }
        });
        removed
    }
}
