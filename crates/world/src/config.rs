use serde::{Deserialize, Serialize};

/// Tunables of one simulated world.
///
/// Every field has a default, so partial config files are accepted.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed of the terrain generator.
    pub world_seed: u64,
    /// Seed of the gameplay RNG; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
    /// Lower bound of the mob spawn countdown (ms).
    pub spawn_min_ms: f64,
    /// Upper bound of the mob spawn countdown (ms).
    pub spawn_max_ms: f64,
    /// Distance from the player at which spawn points are placed (world units).
    pub spawn_radius: f64,
    /// Maximum per-mob offset from its group's spawn point (world units).
    pub group_jitter: f64,
    /// No spawn attempt is made while this many mobs are alive.
    pub max_mobs: usize,
    /// Chebyshev tile distance beyond which mobs, items and projectiles despawn.
    pub despawn_distance: i32,
    /// Ticks a dropped item stays in the world.
    pub item_despawn_ticks: u64,
    /// Ticks before a dropped item can be collected.
    pub item_pickup_delay_ticks: u64,
    /// Targets this close to an attacker are engaged even outside the arc.
    pub engage_distance: f64,
    /// Drop cached chunks when the world is reseeded.
    pub discard_chunks_on_reseed: bool,
    /// Player walk speed (world units per tick).
    pub player_speed: f64,
    /// Player hit points.
    pub player_hp: f64,
    /// Tool definition carried by new players.
    pub player_tool: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_seed: 0,
            rng_seed: None,
            spawn_min_ms: 4_000.0,
            spawn_max_ms: 12_000.0,
            spawn_radius: 480.0,
            group_jitter: 24.0,
            max_mobs: 48,
            despawn_distance: 40,
            // Five minutes at 60 ticks per second.
            item_despawn_ticks: 18_000,
            item_pickup_delay_ticks: 45,
            engage_distance: 12.0,
            discard_chunks_on_reseed: true,
            player_speed: 2.0,
            player_hp: 20.0,
            player_tool: "multi_tool".to_string(),
        }
    }
}

impl SimConfig {
    /// Clamp values that would break the simulation.
    pub fn sanitized(mut self) -> Self {
        if self.spawn_max_ms < self.spawn_min_ms {
            std::mem::swap(&mut self.spawn_min_ms, &mut self.spawn_max_ms);
        }
        self.spawn_min_ms = self.spawn_min_ms.max(0.0);
        self.spawn_max_ms = self.spawn_max_ms.max(self.spawn_min_ms);
        self.despawn_distance = self.despawn_distance.max(1);
        self.group_jitter = self.group_jitter.max(0.0);
        self
    }

    pub fn engage_distance_sq(&self) -> f64 {
        self.engage_distance * self.engage_distance
    }
}
