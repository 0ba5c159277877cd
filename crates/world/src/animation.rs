//! Frame-driven animations and the deferred commands bound to them.
//!
//! An animation cycles through its frames on a millisecond clock. Gameplay
//! side effects are attached as [`AnimationCommand`]s to the clip's key frame
//! or to completion. [`AnimationManager::update`] only collects the commands
//! that came due; the world context runs them after the whole collection has
//! been advanced and swept, so a command may freely start animations, mutate
//! tiles or despawn entities.

use std::collections::BTreeMap;

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};
use tracing::debug;
use verdant_core::{BuildingCategory, ContentRegistry, Direction, FrameSpec, Terrain};

use crate::action::Swing;
use crate::coords::TileRect;
use crate::entity::{EntityId, EntityRef};
use crate::error::WorldError;

/// Sheet holding free-standing effect animations.
pub const EFFECTS_SHEET: &str = "effects";
/// Sheet holding global tile-set loops.
pub const TILES_SHEET: &str = "tiles";
/// Animation key entities fall back to.
pub const IDLE_KEY: &str = "idle";

/// Identity of one running animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimationId(pub u64);

/// Where an animation is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PositionSource {
    /// A free-standing world point.
    Fixed(DVec2),
    /// Mirrors an entity; released when the entity despawns.
    Entity(EntityRef),
    /// Tile-set loop with no position of its own.
    Global,
}

/// When an animation ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Despawns after one full cycle.
    PlayOnce,
    /// Loops until the remaining time runs out.
    DurationBound { remaining_ms: f64 },
    /// Loops until released.
    Repeating,
}

/// Outcome of advancing one animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEvent {
    None,
    /// The key frame became active and has commands registered.
    KeyFrame,
    /// A cycle (or the bound duration) completed.
    After,
}

/// Deferred side effect executed by the world context.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationCommand {
    /// Restart the entity's default animation.
    ResumeDefault { entity: EntityRef },
    /// Re-query the telescoped arc and hit the union with `targets`.
    ///
    /// The arc is rebuilt from the attacker's current hitbox centre shifted by
    /// `offset`, pointing along the telescoped `aim`.
    MeleeStrike {
        attacker: EntityRef,
        offset: DVec2,
        aim: DVec2,
        swing: Swing,
        targets: Vec<EntityRef>,
    },
    /// Remove the resource on `tile` and scatter its drops.
    HarvestResource { tile: IVec2, multiplier: u32 },
    /// Swap the terrain of a tile.
    ChangeTerrain { tile: IVec2, terrain: Terrain },
    /// Fill a bucket from the liquid resource on `tile`.
    CollectLiquid { player: EntityId, tile: IVec2 },
    /// Stamp a building after re-validating its footprint.
    PlaceBuilding {
        key: String,
        category: BuildingCategory,
        rect: TileRect,
    },
    /// Launch a projectile from the owner's current position.
    FireProjectile {
        owner: EntityRef,
        projectile: String,
        direction: DVec2,
    },
}

/// One running animation.
#[derive(Debug, Clone)]
pub struct Animation {
    id: AnimationId,
    sheet: String,
    key: String,
    facing: Direction,
    frames: Vec<FrameSpec>,
    frame_size: [u32; 2],
    key_frame: Option<usize>,
    active_frame: usize,
    elapsed_ms: f64,
    cycled: bool,
    source: PositionSource,
    lifecycle: Lifecycle,
    key_frame_commands: Vec<AnimationCommand>,
    after_commands: Vec<AnimationCommand>,
    despawn: bool,
}

impl Animation {
    pub fn id(&self) -> AnimationId {
        self.id
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn frame_size(&self) -> [u32; 2] {
        self.frame_size
    }

    /// Index of the frame to draw.
    pub fn active_frame(&self) -> usize {
        self.active_frame
    }

    /// Whether at least one full cycle has completed.
    pub fn cycled(&self) -> bool {
        self.cycled
    }

    pub fn source(&self) -> PositionSource {
        self.source
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_despawned(&self) -> bool {
        self.despawn
    }

    /// Commands waiting for the key frame.
    pub fn pending_key_frame(&self) -> &[AnimationCommand] {
        &self.key_frame_commands
    }

    /// Commands waiting for completion.
    pub fn pending_after(&self) -> &[AnimationCommand] {
        &self.after_commands
    }

    fn bound_to(&self, entity: EntityRef) -> bool {
        self.source == PositionSource::Entity(entity)
    }

    /// Flag for removal and drop every pending command.
    pub fn cancel(&mut self) {
        self.despawn = true;
        self.key_frame_commands.clear();
        self.after_commands.clear();
    }

    /// Skip ahead by `offset_ms` without firing anything.
    fn advance_phase(&mut self, offset_ms: f64) {
        let cycle: f64 = self.frames.iter().map(|f| f.duration_ms).sum();
        if cycle <= 0.0 || offset_ms <= 0.0 {
            return;
        }
        let mut remaining = offset_ms % cycle;
        while remaining >= self.frames[self.active_frame].duration_ms {
            remaining -= self.frames[self.active_frame].duration_ms;
            self.active_frame = (self.active_frame + 1) % self.frames.len();
        }
        self.elapsed_ms = remaining;
    }

    /// Advance the clock by `dt_ms`.
    ///
    /// Reports at most one event per call; time left over after an event is
    /// kept and consumed by the next call.
    pub fn update(&mut self, dt_ms: f64) -> AnimationEvent {
        if self.despawn {
            return AnimationEvent::None;
        }

        if let Lifecycle::DurationBound { remaining_ms } = &mut self.lifecycle {
            *remaining_ms -= dt_ms;
            if *remaining_ms <= 0.0 {
                self.despawn = true;
                return AnimationEvent::After;
            }
        }

        // Covers a key frame at index 0 and commands added while it is active.
        if Some(self.active_frame) == self.key_frame && !self.key_frame_commands.is_empty() {
            self.elapsed_ms += dt_ms;
            return AnimationEvent::KeyFrame;
        }

        self.elapsed_ms += dt_ms;
        while self.elapsed_ms >= self.frames[self.active_frame].duration_ms {
            self.elapsed_ms -= self.frames[self.active_frame].duration_ms;
            self.active_frame += 1;

            if self.active_frame >= self.frames.len() {
                self.active_frame = 0;
                self.cycled = true;
                match self.lifecycle {
                    Lifecycle::PlayOnce => {
                        self.despawn = true;
                        return AnimationEvent::After;
                    }
                    Lifecycle::Repeating => return AnimationEvent::After,
                    // Completes when its time runs out, not per cycle.
                    Lifecycle::DurationBound { .. } => {}
                }
            }

            if Some(self.active_frame) == self.key_frame && !self.key_frame_commands.is_empty() {
                return AnimationEvent::KeyFrame;
            }
        }

        AnimationEvent::None
    }
}

/// What a new animation looks like and how it lives.
#[derive(Debug, Clone)]
pub struct AnimationSpec<'a> {
    pub sheet: &'a str,
    pub key: &'a str,
    pub facing: Direction,
    pub source: PositionSource,
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone)]
struct DefaultAnimation {
    sheet: String,
    key: String,
}

/// Owns every running animation.
#[derive(Debug, Default)]
pub struct AnimationManager {
    animations: Vec<Animation>,
    defaults: BTreeMap<EntityRef, DefaultAnimation>,
    next_id: u64,
}

impl AnimationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Animation> {
        self.animations.iter()
    }

    pub fn get(&self, id: AnimationId) -> Option<&Animation> {
        self.animations.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: AnimationId) -> Option<&mut Animation> {
        self.animations.iter_mut().find(|a| a.id == id)
    }

    /// Whether the animation exists and has not been flagged.
    pub fn is_playing(&self, id: AnimationId) -> bool {
        self.get(id).is_some_and(|a| !a.despawn)
    }

    /// Live animations bound to an entity.
    pub fn for_entity(&self, entity: EntityRef) -> impl Iterator<Item = &Animation> {
        self.animations
            .iter()
            .filter(move |a| !a.despawn && a.bound_to(entity))
    }

    /// Create an animation from content timing data.
    pub fn play(
        &mut self,
        content: &ContentRegistry,
        spec: AnimationSpec<'_>,
    ) -> Result<AnimationId, WorldError> {
        let clip = content.clip(spec.sheet, spec.key, spec.facing)?;
        let id = AnimationId(self.next_id);
        self.next_id += 1;
        self.animations.push(Animation {
            id,
            sheet: spec.sheet.to_string(),
            key: spec.key.to_string(),
            facing: spec.facing,
            frames: clip.frames.clone(),
            frame_size: clip.frame_size,
            key_frame: clip.key_frame(),
            active_frame: 0,
            elapsed_ms: 0.0,
            cycled: false,
            source: spec.source,
            lifecycle: spec.lifecycle,
            key_frame_commands: Vec::new(),
            after_commands: Vec::new(),
            despawn: false,
        });
        Ok(id)
    }

    /// Record and start an entity's default loop, `phase_offset_ms` into its cycle.
    pub fn start_default(
        &mut self,
        content: &ContentRegistry,
        entity: EntityRef,
        sheet: &str,
        facing: Direction,
        phase_offset_ms: f64,
    ) -> Result<AnimationId, WorldError> {
        self.defaults.insert(
            entity,
            DefaultAnimation {
                sheet: sheet.to_string(),
                key: IDLE_KEY.to_string(),
            },
        );
        self.resume_default(content, entity, facing, phase_offset_ms)
    }

    /// Restart the recorded default animation of an entity.
    ///
    /// Returns `Ok(None)` when the entity has no default (it was released).
    pub fn resume_default_for(
        &mut self,
        content: &ContentRegistry,
        entity: EntityRef,
        facing: Direction,
    ) -> Result<Option<AnimationId>, WorldError> {
        if !self.defaults.contains_key(&entity) {
            return Ok(None);
        }
        self.resume_default(content, entity, facing, 0.0).map(Some)
    }

    fn resume_default(
        &mut self,
        content: &ContentRegistry,
        entity: EntityRef,
        facing: Direction,
        phase_offset_ms: f64,
    ) -> Result<AnimationId, WorldError> {
        let Some(default) = self.defaults.get(&entity).cloned() else {
            return Err(WorldError::MissingEntity(entity));
        };
        self.cancel_entity(entity);
        let id = self.play(
            content,
            AnimationSpec {
                sheet: &default.sheet,
                key: &default.key,
                facing,
                source: PositionSource::Entity(entity),
                lifecycle: Lifecycle::Repeating,
            },
        )?;
        if let Some(animation) = self.get_mut(id) {
            animation.advance_phase(phase_offset_ms);
        }
        Ok(id)
    }

    /// Play a one-shot animation on an entity.
    ///
    /// Cancels whatever else the entity is playing and chains a return to its
    /// default animation.
    pub fn play_once(
        &mut self,
        content: &ContentRegistry,
        entity: EntityRef,
        sheet: &str,
        key: &str,
        facing: Direction,
    ) -> Result<AnimationId, WorldError> {
        // Resolve the clip before cancelling so a bad key leaves the entity as is.
        content.clip(sheet, key, facing)?;
        self.cancel_entity(entity);
        let id = self.play(
            content,
            AnimationSpec {
                sheet,
                key,
                facing,
                source: PositionSource::Entity(entity),
                lifecycle: Lifecycle::PlayOnce,
            },
        )?;
        self.add_after_command(id, AnimationCommand::ResumeDefault { entity });
        Ok(id)
    }

    /// Free-standing one-shot effect at a world point.
    pub fn generate_effect(
        &mut self,
        content: &ContentRegistry,
        key: &str,
        position: DVec2,
    ) -> Result<AnimationId, WorldError> {
        self.play(
            content,
            AnimationSpec {
                sheet: EFFECTS_SHEET,
                key,
                facing: Direction::Down,
                source: PositionSource::Fixed(position),
                lifecycle: Lifecycle::PlayOnce,
            },
        )
    }

    /// Global tile-set loop.
    pub fn play_global(
        &mut self,
        content: &ContentRegistry,
        key: &str,
    ) -> Result<AnimationId, WorldError> {
        self.play(
            content,
            AnimationSpec {
                sheet: TILES_SHEET,
                key,
                facing: Direction::Down,
                source: PositionSource::Global,
                lifecycle: Lifecycle::Repeating,
            },
        )
    }

    /// Attach a command to the key frame; clips without one run it on completion.
    pub fn add_key_frame_command(&mut self, id: AnimationId, command: AnimationCommand) {
        if let Some(animation) = self.get_mut(id) {
            if animation.key_frame.is_some() {
                animation.key_frame_commands.push(command);
            } else {
                animation.after_commands.push(command);
            }
        }
    }

    pub fn add_after_command(&mut self, id: AnimationId, command: AnimationCommand) {
        if let Some(animation) = self.get_mut(id) {
            animation.after_commands.push(command);
        }
    }

    /// Cancel every animation bound to an entity.
    pub fn cancel_entity(&mut self, entity: EntityRef) {
        for animation in self.animations.iter_mut().filter(|a| a.bound_to(entity)) {
            animation.cancel();
        }
    }

    /// Cancel the animations of despawned entities and forget their defaults.
    pub fn release_entities(&mut self, entities: &[EntityRef]) {
        for entity in entities {
            self.defaults.remove(entity);
            self.cancel_entity(*entity);
        }
    }

    /// Advance every animation and sweep despawned ones.
    ///
    /// Returns the commands that came due, in animation creation order. The
    /// animations' registrations for those events are cleared before return.
    pub fn update(&mut self, dt_ms: f64) -> Vec<AnimationCommand> {
        let mut due = Vec::new();
        for animation in &mut self.animations {
            match animation.update(dt_ms) {
                AnimationEvent::KeyFrame => due.append(&mut animation.key_frame_commands),
                AnimationEvent::After => due.append(&mut animation.after_commands),
                AnimationEvent::None => {}
            }
        }

        let before = self.animations.len();
        self.animations.retain_mut(|animation| {
            if animation.despawn {
                animation.key_frame_commands.clear();
                animation.after_commands.clear();
                false
            } else {
                true
            }
        });
        let removed = before - self.animations.len();
        if removed > 0 || !due.is_empty() {
            debug!(removed, due = due.len(), "Animation sweep");
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACK: &str = r#"{"animations": [
        {"sheet": "hero", "key": "idle", "frames": [{"duration_ms": 100}, {"duration_ms": 100}]},
        {"sheet": "hero", "key": "swing", "frames": [
            {"duration_ms": 50}, {"duration_ms": 50, "key_frame": true}, {"duration_ms": 50}
        ]},
        {"sheet": "hero", "key": "build", "frames": [{"duration_ms": 50}, {"duration_ms": 50}]},
        {"sheet": "hero", "key": "jab", "frames": [
            {"duration_ms": 50, "key_frame": true}, {"duration_ms": 50}
        ]},
        {"sheet": "effects", "key": "poof", "frames": [{"duration_ms": 40}]}
    ]}"#;

    fn content() -> ContentRegistry {
        ContentRegistry::from_json_str(PACK).unwrap()
    }

    const HERO: EntityRef = EntityRef::Player(EntityId(1));

    fn change(tile: i32) -> AnimationCommand {
        AnimationCommand::ChangeTerrain {
            tile: IVec2::new(tile, 0),
            terrain: Terrain::Rock,
        }
    }

    #[test]
    fn key_frame_fires_once_with_commands() {
        let content = content();
        let mut manager = AnimationManager::new();
        let id = manager
            .play(
                &content,
                AnimationSpec {
                    sheet: "hero",
                    key: "swing",
                    facing: Direction::Down,
                    source: PositionSource::Global,
                    lifecycle: Lifecycle::Repeating,
                },
            )
            .unwrap();
        manager.add_key_frame_command(id, change(1));

        assert!(manager.update(30.0).is_empty());
        let due = manager.update(30.0);
        assert_eq!(due, vec![change(1)]);
        assert!(manager.get(id).unwrap().pending_key_frame().is_empty());

        // Next cycle passes the key frame without registrations.
        for _ in 0..10 {
            assert!(manager.update(30.0).is_empty());
        }
    }

    #[test]
    fn leading_key_frame_fires_on_first_update() {
        let content = content();
        let mut manager = AnimationManager::new();
        let id = manager
            .play_once(&content, HERO, "hero", "jab", Direction::Left)
            .unwrap();
        manager.add_key_frame_command(id, change(5));

        let mut fired = Vec::new();
        for _ in 0..10 {
            fired.extend(manager.update(20.0));
        }
        assert_eq!(
            fired,
            vec![change(5), AnimationCommand::ResumeDefault { entity: HERO }]
        );
        assert!(manager.get(id).is_none());
    }

    #[test]
    fn play_once_despawns_after_one_cycle() {
        let content = content();
        let mut anim_manager = AnimationManager::new();
        let id = anim_manager.generate_effect(&content, "poof", DVec2::ZERO).unwrap();
        assert!(anim_manager.is_playing(id));
        anim_manager.update(40.0);
        assert!(anim_manager.get(id).is_none());
    }

    #[test]
    fn one_shot_replaces_and_resumes_default() {
        let content = content();
        let mut manager = AnimationManager::new();
        let idle = manager
            .start_default(&content, HERO, "hero", Direction::Down, 0.0)
            .unwrap();
        let build = manager
            .play_once(&content, HERO, "hero", "build", Direction::Down)
            .unwrap();
        manager.add_after_command(build, change(2));

        // The default is flagged at once and swept on the next update.
        assert!(!manager.is_playing(idle));
        assert!(manager.get(idle).unwrap().pending_after().is_empty());

        let due = manager.update(50.0);
        assert!(due.is_empty());
        assert!(manager.get(idle).is_none());

        let due = manager.update(50.0);
        assert_eq!(
            due,
            vec![AnimationCommand::ResumeDefault { entity: HERO }, change(2)]
        );
        let resumed = manager.resume_default_for(&content, HERO, Direction::Down).unwrap();
        let resumed = resumed.unwrap();
        assert_eq!(manager.get(resumed).unwrap().key(), IDLE_KEY);
        assert_eq!(manager.for_entity(HERO).count(), 1);
    }

    #[test]
    fn second_one_shot_drops_first_commands() {
        let content = content();
        let mut manager = AnimationManager::new();
        manager
            .start_default(&content, HERO, "hero", Direction::Down, 0.0)
            .unwrap();
        let first = manager
            .play_once(&content, HERO, "hero", "swing", Direction::Down)
            .unwrap();
        manager.add_key_frame_command(first, change(3));
        let second = manager
            .play_once(&content, HERO, "hero", "build", Direction::Down)
            .unwrap();

        assert!(!manager.is_playing(first));
        assert!(manager.get(first).unwrap().pending_key_frame().is_empty());
        assert!(manager.is_playing(second));

        let mut fired = Vec::new();
        for _ in 0..4 {
            fired.extend(manager.update(25.0));
        }
        assert!(!fired.contains(&change(3)));
    }

    #[test]
    fn release_cancels_bound_animations() {
        let content = content();
        let mut manager = AnimationManager::new();
        manager
            .start_default(&content, HERO, "hero", Direction::Down, 0.0)
            .unwrap();
        manager.release_entities(&[HERO]);
        manager.update(1.0);
        assert!(manager.is_empty());
        assert_eq!(
            manager.resume_default_for(&content, HERO, Direction::Down).unwrap(),
            None
        );
    }

    #[test]
    fn phase_offset_skips_frames() {
        let content = content();
        let mut manager = AnimationManager::new();
        let id = manager
            .start_default(&content, HERO, "hero", Direction::Down, 350.0)
            .unwrap();
        // 350 % 200 = 150: one full frame consumed, 50ms into the second.
        assert_eq!(manager.get(id).unwrap().active_frame(), 1);
        manager.update(50.0);
        assert_eq!(manager.get(id).unwrap().active_frame(), 0);
        assert!(manager.get(id).unwrap().cycled());
    }

    #[test]
    fn duration_bound_ends_with_after() {
        let content = content();
        let mut manager = AnimationManager::new();
        let id = manager
            .play(
                &content,
                AnimationSpec {
                    sheet: "hero",
                    key: "idle",
                    facing: Direction::Down,
                    source: PositionSource::Fixed(DVec2::ZERO),
                    lifecycle: Lifecycle::DurationBound { remaining_ms: 250.0 },
                },
            )
            .unwrap();
        manager.add_after_command(id, change(4));
        // The 200ms cycle boundary does not end a duration-bound animation.
        let mut fired = Vec::new();
        for _ in 0..5 {
            fired.extend(manager.update(60.0));
        }
        assert_eq!(fired, vec![change(4)]);
        assert!(manager.get(id).is_none());
    }

    #[test]
    fn unknown_clip_is_an_error() {
        let content = content();
        let mut manager = AnimationManager::new();
        assert!(manager
            .play_once(&content, HERO, "hero", "dance", Direction::Down)
            .is_err());
    }
}
