//! The world context: owner of every manager and the fixed-tick loop.

use std::f64::consts::TAU;

use glam::{DVec2, IVec2};
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument};
use verdant_core::{
    gameplay_rng, BuildingCategory, ContentRegistry, Direction, DropEntry, ItemInfo, ItemSerial,
    ResourceTag, SimTick, TagSet, TICK_MILLIS,
};

use crate::action::{
    aim_or_facing, Swing, TelescopeKind, BUILD_CLIP, SHOOT_CLIP, SWING_CLIP, TOOL_CLIPS,
};
use crate::animation::{AnimationCommand, AnimationManager, EFFECTS_SHEET, IDLE_KEY, TILES_SHEET};
use crate::behaviour::PlayerSnapshot;
use crate::config::SimConfig;
use crate::coords::{tile_center, TileRect};
use crate::drop_item::{DroppedItem, ItemManager};
use crate::entity::{EntityId, EntityIds, EntityRef, Hittable};
use crate::error::WorldError;
use crate::mob::{Mob, MobManager, MobTick};
use crate::player::{Player, PlayerInput, PlayerManager, PLAYER_SHEET};
use crate::projectile::{
    HitTarget, Projectile, ProjectileEvent, ProjectileKind, ProjectileManager,
};
use crate::storage::ChunkStore;

/// Animation played on an entity that takes damage.
pub const HURT_KEY: &str = "hurt";
/// Effect played where a mob dies.
pub const DEATH_EFFECT: &str = "poof";
/// Debris played where wood or plants are harvested.
pub const LEAVES_EFFECT: &str = "leaves";
/// Debris played where rock, ore and liquids are harvested.
pub const DUST_EFFECT: &str = "dust";
/// Tile-set loop started with every world.
pub const WATER_SHIMMER: &str = "water_shimmer";

/// Launch speed range of scattered drops (world units per tick).
const DROP_SPEED: (f64, f64) = (1.0, 2.5);
/// First bounce range of scattered drops.
const DROP_BOUNCE: (f64, f64) = (1.5, 3.0);

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: SimTick,
    /// Action committed by the active player this tick.
    pub action: Option<TelescopeKind>,
    pub spawned: Vec<EntityRef>,
    pub despawned: Vec<EntityRef>,
    /// Deferred animation commands executed.
    pub commands: usize,
    /// Projectile hits resolved.
    pub hits: usize,
}

impl TickReport {
    fn new(tick: SimTick) -> Self {
        Self {
            tick,
            action: None,
            spawned: Vec::new(),
            despawned: Vec::new(),
            commands: 0,
            hits: 0,
        }
    }
}

/// One simulated world.
pub struct WorldContext {
    pub(crate) config: SimConfig,
    pub(crate) content: ContentRegistry,
    pub(crate) chunks: ChunkStore,
    pub(crate) players: PlayerManager,
    pub(crate) items: ItemManager,
    pub(crate) projectiles: ProjectileManager,
    pub(crate) mobs: MobManager,
    pub(crate) animations: AnimationManager,
    pub(crate) rng: StdRng,
    tick: SimTick,
    ids: EntityIds,
    next_serial: u64,
}

impl WorldContext {
    /// Build a world from a config and validated content.
    pub fn new(config: SimConfig, content: ContentRegistry) -> Result<Self, WorldError> {
        let config = config.sanitized();
        content.tool(&config.player_tool)?;
        check_content(&content)?;

        let mut world = Self {
            chunks: ChunkStore::new(config.world_seed, &content),
            rng: gameplay_rng(config.rng_seed),
            config,
            content,
            players: PlayerManager::new(),
            items: ItemManager::new(),
            projectiles: ProjectileManager::new(),
            mobs: MobManager::new(),
            animations: AnimationManager::new(),
            tick: SimTick::ZERO,
            ids: EntityIds::new(),
            next_serial: 0,
        };
        if world.content.has_clip(TILES_SHEET, WATER_SHIMMER) {
            world.animations.play_global(&world.content, WATER_SHIMMER)?;
        }
        info!(seed = world.config.world_seed, "Created world");
        Ok(world)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn content(&self) -> &ContentRegistry {
        &self.content
    }

    pub fn current_tick(&self) -> SimTick {
        self.tick
    }

    pub fn chunks(&self) -> &ChunkStore {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut ChunkStore {
        &mut self.chunks
    }

    pub fn players(&self) -> &PlayerManager {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut PlayerManager {
        &mut self.players
    }

    pub fn items(&self) -> &ItemManager {
        &self.items
    }

    pub fn projectiles(&self) -> &ProjectileManager {
        &self.projectiles
    }

    pub fn mobs(&self) -> &MobManager {
        &self.mobs
    }

    pub fn mobs_mut(&mut self) -> &mut MobManager {
        &mut self.mobs
    }

    pub fn animations(&self) -> &AnimationManager {
        &self.animations
    }

    /// Add a player carrying the configured tool.
    pub fn spawn_player(&mut self, position: DVec2) -> Result<EntityId, WorldError> {
        let tool = self.content.tool(&self.config.player_tool)?.clone();
        let id = self.ids.next_id();
        self.players.add(Player::new(
            id,
            position,
            tool,
            self.config.player_speed,
            self.config.player_hp,
        ));
        self.animations.start_default(
            &self.content,
            EntityRef::Player(id),
            PLAYER_SHEET,
            Direction::Down,
            0.0,
        )?;
        info!(player = %id, ?position, "Spawned player");
        Ok(id)
    }

    /// Spawn a single mob outside the spawn cycle.
    pub fn spawn_mob(&mut self, def_id: &str, position: DVec2) -> Result<EntityId, WorldError> {
        let def = self.content.mob(def_id)?;
        let mob = Mob::spawn(self.ids.next_id(), def, position, &mut self.rng);
        let id = mob.id;
        self.mobs.insert(mob);
        self.start_mob_default(id)?;
        Ok(id)
    }

    /// Replace the terrain generator.
    pub fn reseed(&mut self, seed: u64) {
        self.config.world_seed = seed;
        self.chunks.reseed(seed, self.config.discard_chunks_on_reseed);
    }

    /// Run one fixed tick.
    #[instrument(skip(self, input), fields(tick = self.tick.0))]
    pub fn tick(&mut self, input: &PlayerInput) -> Result<TickReport, WorldError> {
        let mut report = TickReport::new(self.tick);
        let mut despawned = Vec::new();

        report.action = self.update_players(input)?;
        despawned.extend(self.players.sweep());

        let center = self.players.active().map(|p| p.body.tile());
        despawned.extend(self.items.update(
            &mut self.chunks,
            &mut self.players,
            self.tick,
            &self.config,
            center,
        ));

        let targets: Vec<HitTarget> = self
            .players
            .iter()
            .map(|p| HitTarget::of(p.entity_ref(), &p.body))
            .chain(
                self.mobs
                    .iter()
                    .filter(|m| !m.body.is_despawned())
                    .map(|m| HitTarget::of(m.entity_ref(), &m.body)),
            )
            .collect();
        let flight =
            self.projectiles
                .update(&mut self.chunks, &targets, center, self.config.despawn_distance);
        despawned.extend(flight.removed);
        for event in flight.events {
            if matches!(event, ProjectileEvent::Hit { .. }) {
                report.hits += 1;
            }
            self.handle_projectile_event(event)?;
        }

        let player = self.players.active().map(|p| {
            (
                p.id,
                PlayerSnapshot {
                    position: p.body.position(),
                    tile: p.body.tile(),
                },
            )
        });
        let mob_update = self.mobs.update(MobTick {
            store: &mut self.chunks,
            content: &self.content,
            rng: &mut self.rng,
            ids: &mut self.ids,
            config: &self.config,
            player,
            dt_ms: TICK_MILLIS,
        });
        despawned.extend(mob_update.removed);
        for id in mob_update.spawned {
            self.start_mob_default(id)?;
            report.spawned.push(EntityRef::Mob(id));
        }
        for death in mob_update.deaths {
            self.scatter_drops(&death.drops, 1, death.position)?;
            self.play_cosmetic(DEATH_EFFECT, death.position)?;
        }
        for intent in mob_update.attacks {
            let (Some(from), Some(to)) = (
                self.entity_center(EntityRef::Mob(intent.mob)),
                self.entity_center(intent.target),
            ) else {
                continue;
            };
            self.invoke(EntityRef::Mob(intent.mob), DVec2::ZERO, to - from)?;
        }

        self.animations.release_entities(&despawned);
        let commands = self.animations.update(TICK_MILLIS);
        report.commands = commands.len();
        for command in commands {
            self.execute(command)?;
        }

        report.despawned = despawned;
        self.tick = self.tick.advance(1);
        Ok(report)
    }

    /// Selection, movement and the primary action of the active player.
    fn update_players(&mut self, input: &PlayerInput) -> Result<Option<TelescopeKind>, WorldError> {
        if let Some(player) = self.players.active_mut() {
            player.apply_selection(input);
        }
        self.players.update_movement(&mut self.chunks, input);

        let Some(player) = self.players.active() else {
            return Ok(None);
        };
        let id = player.id;
        let placement = player.placement.clone();
        let busy = player
            .action
            .is_some_and(|action| self.animations.is_playing(action));
        let aim = aim_or_facing(input.cursor - player.body.hitbox_center(), player.body.facing);
        let click = input.world_click() && !busy;

        if let Some(mode) = placement {
            if click {
                self.begin_placement(id, &mode.building, input.cursor)?;
            }
            return Ok(None);
        }

        let result = self.telescope(EntityRef::Player(id), DVec2::ZERO, aim)?;
        let kind = result.kind();
        if let Some(player) = self.players.get_mut(id) {
            player.cursor_hint = kind;
        }
        if !click {
            return Ok(None);
        }
        result.commit(self)?;
        Ok(Some(kind))
    }

    fn handle_projectile_event(&mut self, event: ProjectileEvent) -> Result<(), WorldError> {
        match event {
            ProjectileEvent::Hit {
                target,
                position,
                direction,
                damage,
                effect,
                ..
            } => {
                let knockback = effect.as_ref().map_or(0.0, |e| e.knockback);
                self.apply_damage(target, damage, direction * knockback)?;
                if let Some(animation) = effect.and_then(|e| e.on_hit_animation) {
                    self.animations
                        .generate_effect(&self.content, &animation, position)?;
                }
            }
            ProjectileEvent::Expired {
                position,
                animation,
                ..
            } => {
                self.animations
                    .generate_effect(&self.content, &animation, position)?;
            }
        }
        Ok(())
    }

    /// Run one deferred animation command.
    pub(crate) fn execute(&mut self, command: AnimationCommand) -> Result<(), WorldError> {
        match command {
            AnimationCommand::ResumeDefault { entity } => {
                if let Some(facing) = self.entity_facing(entity) {
                    self.animations
                        .resume_default_for(&self.content, entity, facing)?;
                }
            }
            AnimationCommand::MeleeStrike {
                attacker,
                offset,
                aim,
                swing,
                targets,
            } => self.melee_strike(attacker, offset, aim, swing, targets)?,
            AnimationCommand::HarvestResource { tile, multiplier } => {
                self.harvest_resource(tile, multiplier)?
            }
            AnimationCommand::ChangeTerrain { tile, terrain } => {
                self.chunks.change_tile(tile, terrain)
            }
            AnimationCommand::CollectLiquid { player, tile } => self.collect_liquid(player, tile)?,
            AnimationCommand::PlaceBuilding {
                key,
                category,
                rect,
            } => {
                self.place_building(category, &key, rect);
            }
            AnimationCommand::FireProjectile {
                owner,
                projectile,
                direction,
            } => self.fire_projectile(owner, &projectile, direction)?,
        }
        Ok(())
    }

    fn place_building(&mut self, category: BuildingCategory, key: &str, rect: TileRect) {
        if !self.chunks.place_building(category, key, rect) {
            debug!(key, ?rect, "Footprint no longer free");
        }
    }

    /// Re-query the telescoped arc and hit the union with the telescoped targets.
    fn melee_strike(
        &mut self,
        attacker: EntityRef,
        offset: DVec2,
        aim: DVec2,
        swing: Swing,
        mut targets: Vec<EntityRef>,
    ) -> Result<(), WorldError> {
        let Some(origin) = self.attacker_center(attacker).map(|c| c + offset) else {
            return Ok(());
        };
        for target in self.slash_targets(attacker, origin, aim, &swing) {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        if targets.is_empty() {
            return Ok(());
        }

        debug!(?attacker, targets = targets.len(), "Melee strike landed");
        for target in targets {
            let Some(position) = self.entity_center(target) else {
                continue;
            };
            let force = (position - origin).normalize_or_zero() * swing.knockback;
            self.apply_damage(target, swing.damage, force)?;
        }
        Ok(())
    }

    /// Damage, knock back and play the hurt animation. Missing or despawned
    /// targets are ignored.
    pub(crate) fn apply_damage(
        &mut self,
        target: EntityRef,
        damage: f64,
        force: DVec2,
    ) -> Result<(), WorldError> {
        let (sheet, facing) = match target {
            EntityRef::Mob(id) => {
                let Some(mob) = self.mobs.get_mut(id).filter(|m| !m.body.is_despawned()) else {
                    return Ok(());
                };
                mob.take_hit(damage, force);
                (mob.sprite.clone(), mob.body.facing)
            }
            EntityRef::Player(id) => {
                let Some(player) = self.players.get_mut(id).filter(|p| !p.body.is_despawned())
                else {
                    return Ok(());
                };
                if player.take_damage(damage) {
                    info!(player = %id, "Player defeated");
                } else {
                    player.body.apply_force(force);
                }
                (PLAYER_SHEET.to_string(), player.body.facing)
            }
            _ => return Ok(()),
        };

        if self.content.has_clip(&sheet, HURT_KEY) {
            self.animations
                .play_once(&self.content, target, &sheet, HURT_KEY, facing)?;
        }
        Ok(())
    }

    /// Remove the resource on `tile` and scatter its drops around it.
    pub fn harvest_resource(&mut self, tile: IVec2, multiplier: u32) -> Result<(), WorldError> {
        let Some(occupant) = self.chunks.take_resource(tile) else {
            return Ok(());
        };
        let drops = self.content.resource(&occupant.id)?.drops.clone();
        let position = tile_center(tile);
        self.scatter_drops(&drops, multiplier, position)?;

        let effect = match occupant.tag {
            ResourceTag::Wood | ResourceTag::Plant => LEAVES_EFFECT,
            _ => DUST_EFFECT,
        };
        self.play_cosmetic(effect, position)?;
        self.animations
            .release_entities(&[EntityRef::Resource(tile)]);
        info!(resource = %occupant.id, ?tile, multiplier, "Harvested resource");
        Ok(())
    }

    /// Fill the player's inventory from the liquid resource on `tile`.
    fn collect_liquid(&mut self, player: EntityId, tile: IVec2) -> Result<(), WorldError> {
        let Some(resource) = self.chunks.tile(tile.x, tile.y).resource.clone() else {
            return Ok(());
        };
        let drops = self.content.resource(&resource.id)?.drops.clone();
        let mut collected = Vec::new();
        for drop in &drops {
            for _ in 0..drop.count {
                collected.push(self.new_item_info(&drop.item)?);
            }
        }
        let tick = self.tick;
        if let Some(player) = self.players.get_mut(player) {
            for mut info in collected {
                info.picked_up_at = Some(tick);
                player.inventory.add(info);
            }
        }
        Ok(())
    }

    /// Launch `projectile` from the owner's hitbox centre.
    fn fire_projectile(
        &mut self,
        owner: EntityRef,
        projectile: &str,
        direction: DVec2,
    ) -> Result<(), WorldError> {
        let Some(origin) = self.entity_center(owner) else {
            return Ok(());
        };
        let def = self.content.projectile(projectile)?;
        let projectile = Projectile::from_def(self.ids.next_id(), def, owner, origin, direction)?;
        let entity = projectile.entity_ref();
        let facing = projectile.body.facing;
        let sprite = projectile.sprite.clone();
        self.projectiles.spawn(projectile);
        if self.content.has_clip(&sprite, IDLE_KEY) {
            self.animations
                .start_default(&self.content, entity, &sprite, facing, 0.0)?;
        }
        Ok(())
    }

    /// Spawn `multiplier × count` copies of every drop at `position`, each
    /// launched in a random direction.
    pub fn scatter_drops(
        &mut self,
        drops: &[DropEntry],
        multiplier: u32,
        position: DVec2,
    ) -> Result<(), WorldError> {
        for drop in drops {
            for _ in 0..drop.count * multiplier {
                let direction = DVec2::from_angle(self.rng.gen_range(0.0..TAU));
                let speed = self.rng.gen_range(DROP_SPEED.0..=DROP_SPEED.1);
                let bounce = self.rng.gen_range(DROP_BOUNCE.0..=DROP_BOUNCE.1);
                self.spawn_item(&drop.item, position, direction, speed, bounce)?;
            }
        }
        Ok(())
    }

    /// Drop a freshly rolled copy of `item` into the world.
    pub fn spawn_item(
        &mut self,
        item: &str,
        position: DVec2,
        direction: DVec2,
        speed: f64,
        bounce: f64,
    ) -> Result<EntityId, WorldError> {
        let info = self.new_item_info(item)?;
        let id = self.ids.next_id();
        self.items
            .spawn(DroppedItem::new(id, info, position, direction, speed, bounce));
        Ok(id)
    }

    fn new_item_info(&mut self, item: &str) -> Result<ItemInfo, WorldError> {
        let def = self.content.item(item)?;
        let tags = TagSet::roll(&def.tag_slots, &mut self.rng);
        self.next_serial += 1;
        Ok(ItemInfo::new(item, ItemSerial(self.next_serial)).with_tags(tags))
    }

    fn start_mob_default(&mut self, id: EntityId) -> Result<(), WorldError> {
        let Some(mob) = self.mobs.get(id) else {
            return Ok(());
        };
        let sprite = mob.sprite.clone();
        let facing = mob.body.facing;
        let cycle = self.content.clip(&sprite, IDLE_KEY, facing)?.cycle_ms();
        let offset = self.rng.gen_range(0.0..cycle);
        self.animations
            .start_default(&self.content, EntityRef::Mob(id), &sprite, facing, offset)?;
        Ok(())
    }

    /// Play a free-standing effect that a content pack may leave out.
    fn play_cosmetic(&mut self, key: &str, position: DVec2) -> Result<(), WorldError> {
        if self.content.has_clip(EFFECTS_SHEET, key) {
            self.animations
                .generate_effect(&self.content, key, position)?;
        } else {
            debug!(key, "Effect clip not in content, skipped");
        }
        Ok(())
    }

    /// Hitbox centre of a live entity.
    pub fn entity_center(&self, entity: EntityRef) -> Option<DVec2> {
        match entity {
            EntityRef::Player(id) => self.players.get(id).map(|p| p.body.hitbox_center()),
            EntityRef::Mob(id) => self.mobs.get(id).map(|m| m.body.hitbox_center()),
            EntityRef::Item(id) => self.items.get(id).map(|i| i.body.hitbox_center()),
            EntityRef::Projectile(id) => self.projectiles.get(id).map(|p| p.body.hitbox_center()),
            EntityRef::Resource(tile) => self
                .chunks
                .peek_tile(tile.x, tile.y)
                .and_then(|t| t.resource.as_ref())
                .map(|_| tile_center(tile)),
        }
    }

    fn entity_facing(&self, entity: EntityRef) -> Option<Direction> {
        match entity {
            EntityRef::Player(id) => self.players.get(id).map(|p| p.body.facing),
            EntityRef::Mob(id) => self.mobs.get(id).map(|m| m.body.facing),
            EntityRef::Projectile(id) => self.projectiles.get(id).map(|p| p.body.facing),
            EntityRef::Item(_) | EntityRef::Resource(_) => None,
        }
    }

    /// Current hitbox centre of an actor that can still swing.
    fn attacker_center(&self, entity: EntityRef) -> Option<DVec2> {
        match entity {
            EntityRef::Player(id) => self.players.get(id).map(|p| p.body.hitbox_center()),
            EntityRef::Mob(id) => self
                .mobs
                .get(id)
                .filter(|m| !m.body.is_despawned())
                .map(|m| m.body.hitbox_center()),
            _ => None,
        }
    }
}

/// Check every clip and projectile kind a tick can reach, so a broken pack
/// fails when the world is built instead of halfway through a tick.
///
/// Hurt animations, death puffs and harvest debris are optional.
fn check_content(content: &ContentRegistry) -> Result<(), WorldError> {
    let require = |sheet: &str, key: &str| -> Result<(), WorldError> {
        for facing in Direction::ALL {
            content.clip(sheet, key, facing)?;
        }
        Ok(())
    };

    require(PLAYER_SHEET, IDLE_KEY)?;
    for key in TOOL_CLIPS {
        require(PLAYER_SHEET, key)?;
    }
    if content.buildings().next().is_some() {
        require(PLAYER_SHEET, BUILD_CLIP)?;
    }
    for def in content.projectiles() {
        ProjectileKind::for_def(def)?;
        require(PLAYER_SHEET, SHOOT_CLIP)?;
        require(EFFECTS_SHEET, &def.despawn_animation)?;
        if let Some(on_hit) = def.effect.as_ref().and_then(|e| e.on_hit_animation.as_deref()) {
            require(EFFECTS_SHEET, on_hit)?;
        }
    }
    for mob in content.mobs() {
        require(&mob.sprite, IDLE_KEY)?;
        if mob.attack.is_some() {
            require(&mob.sprite, SWING_CLIP)?;
        }
    }
    Ok(())
}
