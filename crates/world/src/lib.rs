//! Entity simulation and world interaction for verdant.
//!
//! The crate owns the infinite chunked tile world, the entity managers
//! (players, dropped items, projectiles, mobs), the key-frame driven animation
//! engine and the telescope/commit action layer. [`WorldContext`] ties them
//! together and advances everything one fixed tick at a time.

mod action;
mod animation;
mod behaviour;
mod chunk;
mod config;
mod context;
mod coords;
mod drop_item;
mod entity;
mod error;
mod inventory;
mod mob;
mod noise;
mod player;
mod projectile;
mod range;
mod storage;
mod terrain;

pub use action::*;
pub use animation::*;
pub use behaviour::*;
pub use chunk::*;
pub use config::*;
pub use context::*;
pub use coords::*;
pub use drop_item::*;
pub use entity::*;
pub use error::*;
pub use inventory::*;
pub use mob::*;
pub use self::noise::*;
pub use player::*;
pub use projectile::*;
pub use range::*;
pub use storage::*;
pub use terrain::*;
