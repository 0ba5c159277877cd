//! Mobs: spawning, behaviour ticking, knockback recovery and death.

use std::f64::consts::TAU;

use glam::{DVec2, IVec2};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use verdant_core::{ContentRegistry, DropEntry, MobAttackDef, MobDef, TagSet, Terrain};

use crate::behaviour::{run_chain, Behaviour, BehaviourCtx, PlayerSnapshot};
use crate::config::SimConfig;
use crate::coords::{chebyshev, tile_of};
use crate::entity::{Body, EntityId, EntityIds, EntityRef};
use crate::storage::ChunkStore;

/// Spawn points per spawn attempt, evenly spread around the player.
pub const SPAWN_POINTS: usize = 3;

/// Transient state of a mob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MobState {
    /// Running its behaviour chain.
    #[default]
    Normal,
    /// Knocked back; behaviours are suspended until the force decays.
    Hit,
}

/// A mob instance in the world.
#[derive(Debug, Clone)]
pub struct Mob {
    pub id: EntityId,
    /// Content definition id.
    pub def_id: String,
    /// Sprite sheet key.
    pub sprite: String,
    pub body: Body,
    pub tags: TagSet,
    /// Sprite and hitbox scale from rolled tags.
    pub scale: f64,
    pub tint: Option<[u8; 3]>,
    /// A rolled tag marks this mob as identifiable.
    pub identified: bool,
    pub hp: f64,
    pub max_hp: f64,
    pub state: MobState,
    behaviours: Vec<Behaviour>,
    attack: Option<MobAttackDef>,
    attack_cooldown_ms: f64,
    allowed: Vec<Terrain>,
    speed: f64,
    drops: Vec<DropEntry>,
}

impl Mob {
    /// Create a mob from its definition, rolling its tags.
    pub fn spawn(id: EntityId, def: &MobDef, position: DVec2, rng: &mut StdRng) -> Self {
        let tags = TagSet::roll(&def.tag_slots, rng);
        let mut scale = 1.0;
        let mut tint = None;
        let mut identified = false;
        for tag in tags.iter() {
            if let Some(modifier) = def.tag_modifiers.get(tag) {
                scale *= modifier.scale;
                tint = modifier.tint.or(tint);
                identified |= modifier.identifiable;
            }
        }

        Self {
            id,
            def_id: def.id.clone(),
            sprite: def.sprite.clone(),
            body: Body::new(position, def.hit_radius * scale),
            tags,
            scale,
            tint,
            identified,
            hp: def.hp,
            max_hp: def.hp,
            state: MobState::Normal,
            behaviours: def.behaviours.iter().map(Behaviour::from_spec).collect(),
            attack: def.attack.clone(),
            attack_cooldown_ms: 0.0,
            allowed: def.spawn_terrain.clone(),
            speed: def.speed,
            drops: def.drops.clone(),
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::Mob(self.id)
    }

    pub fn attack(&self) -> Option<&MobAttackDef> {
        self.attack.as_ref()
    }

    pub fn behaviours(&self) -> &[Behaviour] {
        &self.behaviours
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }

    /// Take damage and knockback; interrupts the behaviour chain.
    pub fn take_hit(&mut self, damage: f64, force: DVec2) {
        self.hp -= damage;
        self.body.apply_force(force);
        self.state = MobState::Hit;
    }

    /// Integrate knockback; returns to normal once the force is spent.
    fn recover(&mut self, store: &mut ChunkStore) {
        let step = self.body.take_force_step();
        self.body.slide(store, step);
        if !self.body.has_force() {
            self.state = MobState::Normal;
        }
    }

    /// Count down the attack cooldown and check reach against the player.
    fn ready_to_attack(&mut self, player: Option<PlayerSnapshot>, dt_ms: f64) -> bool {
        let Some(attack) = &self.attack else {
            return false;
        };
        self.attack_cooldown_ms = (self.attack_cooldown_ms - dt_ms).max(0.0);
        let Some(player) = player else {
            return false;
        };
        let to_player = player.position - self.body.position();
        if self.attack_cooldown_ms > 0.0 || to_player.length_squared() > attack.reach * attack.reach {
            return false;
        }
        self.attack_cooldown_ms = attack.cooldown_ms;
        self.body.face(to_player);
        true
    }
}

/// A mob decided to swing at a player this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackIntent {
    pub mob: EntityId,
    pub target: EntityRef,
}

/// A mob died this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MobDeath {
    pub mob: EntityId,
    pub position: DVec2,
    pub drops: Vec<DropEntry>,
}

/// Everything the world context needs to react to after a mob update.
#[derive(Debug, Default)]
pub struct MobUpdate {
    pub removed: Vec<EntityRef>,
    pub spawned: Vec<EntityId>,
    pub attacks: Vec<AttackIntent>,
    pub deaths: Vec<MobDeath>,
}

/// Inputs of one mob update.
pub struct MobTick<'a> {
    pub store: &'a mut ChunkStore,
    pub content: &'a ContentRegistry,
    pub rng: &'a mut StdRng,
    pub ids: &'a mut EntityIds,
    pub config: &'a SimConfig,
    /// Active player, if any.
    pub player: Option<(EntityId, PlayerSnapshot)>,
    pub dt_ms: f64,
}

/// Owns every mob and the spawn timer.
#[derive(Debug, Default)]
pub struct MobManager {
    mobs: Vec<Mob>,
    spawn_timer_ms: Option<f64>,
}

impl MobManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.mobs.len()
    }

    pub fn get(&self, id: EntityId) -> Option<&Mob> {
        self.mobs.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Mob> {
        self.mobs.iter_mut().find(|m| m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mob> {
        self.mobs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Mob> {
        self.mobs.iter_mut()
    }

    /// Milliseconds until the next spawn attempt, once the timer is armed.
    pub fn spawn_timer_ms(&self) -> Option<f64> {
        self.spawn_timer_ms
    }

    pub fn insert(&mut self, mob: Mob) {
        self.mobs.push(mob);
    }

    /// Spawn groups around `center`, one per spawn point whose terrain some
    /// mob accepts. Returns the new mob ids.
    pub fn spawn_groups(
        &mut self,
        store: &mut ChunkStore,
        content: &ContentRegistry,
        rng: &mut StdRng,
        ids: &mut EntityIds,
        config: &SimConfig,
        center: DVec2,
    ) -> Vec<EntityId> {
        let theta = rng.gen_range(0.0..TAU);
        let mut spawned = Vec::new();

        for i in 0..SPAWN_POINTS {
            let angle = theta + TAU * i as f64 / SPAWN_POINTS as f64;
            let point = center + DVec2::from_angle(angle) * config.spawn_radius;
            let terrain = store.terrain(tile_of(point));
            let eligible = content.mobs_for_terrain(terrain);
            if eligible.is_empty() {
                debug!(?terrain, "No mob spawns on terrain");
                continue;
            }

            let def = eligible[rng.gen_range(0..eligible.len())];
            let group = rng.gen_range(def.min_group..=def.max_group);
            let mut placed = 0u32;
            for _ in 0..group {
                if self.mobs.len() >= config.max_mobs {
                    break;
                }
                let jitter = DVec2::new(
                    rng.gen_range(-config.group_jitter..=config.group_jitter),
                    rng.gen_range(-config.group_jitter..=config.group_jitter),
                );
                let position = point + jitter;
                if !store.validate_movement(position) {
                    continue;
                }
                let mob = Mob::spawn(ids.next_id(), def, position, rng);
                spawned.push(mob.id);
                self.mobs.push(mob);
                placed += 1;
            }
            info!(mob = %def.id, placed, ?terrain, "Spawned mob group");
        }
        spawned
    }

    /// Run spawning, recovery, behaviours and attacks, then sweep.
    pub fn update(&mut self, tick: MobTick<'_>) -> MobUpdate {
        let MobTick {
            store,
            content,
            rng,
            ids,
            config,
            player,
            dt_ms,
        } = tick;
        let mut update = MobUpdate::default();

        if let Some((_, snapshot)) = player {
            let timer = self
                .spawn_timer_ms
                .get_or_insert_with(|| rng.gen_range(config.spawn_min_ms..=config.spawn_max_ms));
            *timer -= dt_ms;
            if *timer <= 0.0 {
                self.spawn_timer_ms =
                    Some(rng.gen_range(config.spawn_min_ms..=config.spawn_max_ms));
                if self.mobs.len() < config.max_mobs {
                    update.spawned =
                        self.spawn_groups(store, content, rng, ids, config, snapshot.position);
                }
            }
        }

        let center_tile: Option<IVec2> = player.map(|(_, p)| p.tile);
        for mob in &mut self.mobs {
            if mob.body.is_despawned() {
                continue;
            }
            if let Some(center) = center_tile {
                if chebyshev(mob.body.tile(), center) > config.despawn_distance {
                    mob.body.flag_despawn();
                    continue;
                }
            }
            if mob.is_dead() {
                debug!(mob = %mob.id, def = %mob.def_id, "Mob died");
                mob.body.flag_despawn();
                update.deaths.push(MobDeath {
                    mob: mob.id,
                    position: mob.body.position(),
                    drops: mob.drops.clone(),
                });
                continue;
            }

            if mob.state == MobState::Hit {
                mob.recover(store);
                continue;
            }

            let snapshot = player.map(|(_, p)| p);
            let mut ctx = BehaviourCtx {
                store: &mut *store,
                rng: &mut *rng,
                player: snapshot,
                allowed: &mob.allowed,
                speed: mob.speed,
                dt_ms,
            };
            run_chain(&mut mob.behaviours, &mut mob.body, &mut ctx);

            if let Some((player_id, _)) = player {
                if mob.ready_to_attack(snapshot, dt_ms) {
                    update.attacks.push(AttackIntent {
                        mob: mob.id,
                        target: EntityRef::Player(player_id),
                    });
                }
            }
        }

        self.mobs.retain(|mob| {
            if mob.body.is_despawned() {
                update.removed.push(mob.entity_ref());
                false
            } else {
                true
            }
        });
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use crate::coords::tile_center;

    fn content() -> ContentRegistry {
        ContentRegistry::builtin().unwrap()
    }

    fn paint(store: &mut ChunkStore, center: IVec2, radius: i32, terrain: Terrain) {
        for y in center.y - radius..=center.y + radius {
            for x in center.x - radius..=center.x + radius {
                let tile = store.tile_mut(x, y);
                tile.terrain = terrain;
                tile.resource = None;
            }
        }
    }

    #[test]
    fn tag_modifiers_scale_hitbox() {
        let content = content();
        let mut def = content.mob("wolf").unwrap().clone();
        def.tag_slots = vec![verdant_core::TagSlot {
            choices: vec![verdant_core::TagChoice {
                tag: "alpha".into(),
                weight: 1,
            }],
            picks: 1,
        }];
        let mut rng = StdRng::seed_from_u64(1);
        let mob = Mob::spawn(EntityId(1), &def, DVec2::ZERO, &mut rng);
        assert!(mob.tags.contains("alpha"));
        assert!(mob.identified);
        assert!((mob.scale - 1.3).abs() < 1e-12);
        let radius = def.hit_radius * 1.3;
        assert!((crate::entity::Hittable::hit_radius_sq(&mob.body) - radius * radius).abs() < 1e-9);
    }

    #[test]
    fn spawn_points_respect_terrain() {
        let content = content();
        let mut store = ChunkStore::new(4, &content);
        let mut rng = StdRng::seed_from_u64(7);
        let mut ids = EntityIds::new();
        let config = SimConfig {
            spawn_radius: 320.0,
            group_jitter: 0.0,
            ..SimConfig::default()
        };
        // Everything around the player is deep water except sand.
        paint(&mut store, IVec2::ZERO, 14, Terrain::DeepWater);

        let mut manager = MobManager::new();
        let spawned =
            manager.spawn_groups(&mut store, &content, &mut rng, &mut ids, &config, tile_center(IVec2::ZERO));
        assert!(spawned.is_empty());

        paint(&mut store, IVec2::ZERO, 14, Terrain::Sand);
        let spawned =
            manager.spawn_groups(&mut store, &content, &mut rng, &mut ids, &config, tile_center(IVec2::ZERO));
        assert!(!spawned.is_empty());
        assert!(manager.iter().all(|m| m.def_id == "crab"));
    }

    #[test]
    fn hit_mob_only_recovers_until_force_spent() {
        let content = content();
        let mut store = ChunkStore::new(4, &content);
        paint(&mut store, IVec2::ZERO, 6, Terrain::Grass);
        let mut rng = StdRng::seed_from_u64(2);
        let mut ids = EntityIds::new();
        let config = SimConfig::default();
        let mut manager = MobManager::new();
        let mut mob = Mob::spawn(
            ids.next_id(),
            content.mob("chicken").unwrap(),
            tile_center(IVec2::ZERO),
            &mut rng,
        );
        mob.take_hit(1.0, DVec2::new(2.0, 0.0));
        let id = mob.id;
        manager.insert(mob);

        let mut ticks = 0;
        while manager.get(id).unwrap().state == MobState::Hit {
            manager.update(MobTick {
                store: &mut store,
                content: &content,
                rng: &mut rng,
                ids: &mut ids,
                config: &config,
                player: None,
                dt_ms: 16.0,
            });
            ticks += 1;
            assert!(ticks < 100);
        }
        let mob = manager.get(id).unwrap();
        assert!(mob.body.position().x > tile_center(IVec2::ZERO).x);
        assert_eq!(mob.body.force(), DVec2::ZERO);
    }

    #[test]
    fn dead_mob_reports_drops_and_is_swept() {
        let content = content();
        let mut store = ChunkStore::new(4, &content);
        let mut rng = StdRng::seed_from_u64(3);
        let mut ids = EntityIds::new();
        let config = SimConfig::default();
        let mut manager = MobManager::new();
        let mut mob = Mob::spawn(ids.next_id(), content.mob("wolf").unwrap(), DVec2::ZERO, &mut rng);
        mob.hp = 0.0;
        manager.insert(mob);

        let update = manager.update(MobTick {
            store: &mut store,
            content: &content,
            rng: &mut rng,
            ids: &mut ids,
            config: &config,
            player: None,
            dt_ms: 16.0,
        });
        assert_eq!(update.deaths.len(), 1);
        assert_eq!(update.deaths[0].drops[0].item, "meat");
        assert_eq!(update.removed, vec![EntityRef::Mob(EntityId(1))]);
        assert_eq!(manager.count(), 0);
    }

    #[test]
    fn far_mobs_despawn() {
        let content = content();
        let mut store = ChunkStore::new(4, &content);
        let mut rng = StdRng::seed_from_u64(3);
        let mut ids = EntityIds::new();
        let config = SimConfig {
            despawn_distance: 5,
            spawn_min_ms: 1.0e9,
            spawn_max_ms: 1.0e9,
            ..SimConfig::default()
        };
        let mut manager = MobManager::new();
        manager.insert(Mob::spawn(
            ids.next_id(),
            content.mob("chicken").unwrap(),
            tile_center(IVec2::new(6, 0)),
            &mut rng,
        ));
        let player = PlayerSnapshot {
            position: tile_center(IVec2::ZERO),
            tile: IVec2::ZERO,
        };
        let update = manager.update(MobTick {
            store: &mut store,
            content: &content,
            rng: &mut rng,
            ids: &mut ids,
            config: &config,
            player: Some((EntityId(99), player)),
            dt_ms: 16.0,
        });
        assert_eq!(update.removed.len(), 1);
        assert!(update.deaths.is_empty());
    }
}
