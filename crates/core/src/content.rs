//! Content tables: immutable definitions keyed by string id.
//!
//! The data-loading layer hands the simulation a [`ContentRegistry`] built from
//! a JSON pack. Every cross-reference in the pack (drop tables, decoration
//! table, spawn groups, animation key frames) is checked by
//! [`ContentRegistry::validate`] when the registry is built, so a broken pack
//! fails at startup instead of in the middle of a tick.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::{Decoration, Direction, TagSlot, Terrain};

/// Base content pack compiled into the crate.
const BUILTIN_PACK: &str = include_str!("../content/base.json");

/// Errors emitted while loading or querying content.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The pack is not valid JSON for the schema.
    #[error("failed to parse content pack: {0}")]
    Parse(#[from] serde_json::Error),
    /// A lookup referenced an id that no table defines.
    #[error("unknown {kind} id '{id}'")]
    Unknown {
        /// Table name ("item", "mob", ...).
        kind: &'static str,
        /// Offending id.
        id: String,
    },
    /// No animation clip is registered for the sheet/key pair.
    #[error("no animation clip '{key}' on sheet '{sheet}'")]
    UnknownClip {
        /// Sprite-sheet key.
        sheet: String,
        /// Animation key.
        key: String,
    },
    /// Two definitions in one table share an id.
    #[error("duplicate {kind} id '{id}'")]
    Duplicate {
        /// Table name.
        kind: &'static str,
        /// Offending id.
        id: String,
    },
    /// A definition violates a table constraint.
    #[error("invalid {kind} '{id}': {reason}")]
    Invalid {
        /// Table name.
        kind: &'static str,
        /// Offending id.
        id: String,
        /// Human-readable constraint.
        reason: String,
    },
}

/// Item metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    /// Unique id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Sprite key used by the renderer.
    #[serde(default)]
    pub sprite: String,
    /// Tag slots rolled for each new copy.
    #[serde(default)]
    pub tag_slots: Vec<TagSlot>,
}

/// Primary tag of a resource; decides which tool action applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceTag {
    /// Trees and logs (chopped).
    Wood,
    /// Bushes and crops (harvested).
    Plant,
    /// Ponds and springs (bucketed).
    Liquid,
    /// Drinkable sources (bucketed).
    Drink,
    /// Boulders (mined).
    Rock,
    /// Ore veins (mined).
    Ore,
    /// Gem deposits (mined).
    Gem,
}

/// One entry of a drop table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropEntry {
    /// Item id to drop.
    pub item: String,
    /// Copies dropped per multiplier step.
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

/// Resource metadata (trees, rocks, bushes...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDef {
    /// Unique id.
    pub id: String,
    /// Primary tag.
    pub tag: ResourceTag,
    /// Sprite key.
    #[serde(default)]
    pub sprite: String,
    /// Collision radius in world units.
    #[serde(default = "default_resource_radius")]
    pub hit_radius: f64,
    /// Items produced when harvested.
    #[serde(default)]
    pub drops: Vec<DropEntry>,
}

fn default_resource_radius() -> f64 {
    12.0
}

/// Visual/physical adjustment applied when a mob rolls a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagModifier {
    /// Sprite and hitbox scale multiplier.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// RGB tint applied by the renderer.
    #[serde(default)]
    pub tint: Option<[u8; 3]>,
    /// Whether this tag makes the mob identifiable in the UI.
    #[serde(default)]
    pub identifiable: bool,
}

fn default_scale() -> f64 {
    1.0
}

/// Behaviour entry of a mob definition, in priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BehaviourSpec {
    /// Wander to random allowed tiles.
    RandomWander {
        /// Half-size of the wander box, in tiles.
        bounds: i32,
        /// Minimum idle time after arriving (ms).
        min_wait_ms: f64,
        /// Maximum idle time after arriving (ms).
        max_wait_ms: f64,
    },
    /// Trail the active player.
    FollowActivePlayer {
        /// Distance kept from the player (world units).
        follow_distance: f64,
        /// Player distance beyond which the behaviour yields (world units).
        range: f64,
    },
}

/// Melee attack of a hostile mob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobAttackDef {
    /// Damage per hit.
    pub damage: f64,
    /// Arc half-width in radians.
    pub half_angle: f64,
    /// Reach in world units.
    pub reach: f64,
    /// Knockback force applied to the target.
    #[serde(default)]
    pub knockback: f64,
    /// Minimum time between swings (ms).
    pub cooldown_ms: f64,
}

/// Mob metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobDef {
    /// Unique id.
    pub id: String,
    /// Sprite sheet key.
    pub sprite: String,
    /// Starting hit points.
    pub hp: f64,
    /// Walk speed in world units per tick.
    pub speed: f64,
    /// Collision radius in world units (before tag scaling).
    pub hit_radius: f64,
    /// Terrain the mob may spawn and wander on.
    pub spawn_terrain: Vec<Terrain>,
    /// Smallest spawn group.
    #[serde(default = "default_group")]
    pub min_group: u32,
    /// Largest spawn group.
    #[serde(default = "default_group")]
    pub max_group: u32,
    /// Tag slots rolled at spawn.
    #[serde(default)]
    pub tag_slots: Vec<TagSlot>,
    /// Per-tag adjustments.
    #[serde(default)]
    pub tag_modifiers: BTreeMap<String, TagModifier>,
    /// Behaviour chain, highest priority first.
    #[serde(default)]
    pub behaviours: Vec<BehaviourSpec>,
    /// Items dropped on death.
    #[serde(default)]
    pub drops: Vec<DropEntry>,
    /// Melee attack, for hostile mobs.
    #[serde(default)]
    pub attack: Option<MobAttackDef>,
}

fn default_group() -> u32 {
    1
}

/// Whether a placed structure is exclusive or stackable on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingCategory {
    /// At most one per tile; blocks movement.
    Building,
    /// Any number per tile; passable.
    Station,
}

/// Building metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingDef {
    /// Unique id.
    pub id: String,
    /// Occupancy category.
    pub category: BuildingCategory,
    /// Footprint width in tiles.
    pub width: u32,
    /// Footprint height in tiles.
    pub height: u32,
    /// Sprite key.
    #[serde(default)]
    pub sprite: String,
}

/// On-hit effect carried by a projectile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileEffectDef {
    /// Animation generated where the projectile hits.
    #[serde(default)]
    pub on_hit_animation: Option<String>,
    /// Knockback force applied along the flight direction.
    #[serde(default)]
    pub knockback: f64,
}

/// Projectile metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileDef {
    /// Unique id.
    pub id: String,
    /// Implementation key resolved by the world crate.
    pub kind: String,
    /// Speed in world units per tick.
    pub speed: f64,
    /// Damage dealt on hit.
    pub damage: f64,
    /// Collision radius in world units.
    pub hit_radius: f64,
    /// Travel distance after which the projectile fades out.
    pub max_distance: f64,
    /// Sprite sheet key for the projectile and its effects.
    pub sprite: String,
    /// Animation generated when the projectile despawns without hitting.
    pub despawn_animation: String,
    /// Optional on-hit effect.
    #[serde(default)]
    pub effect: Option<ProjectileEffectDef>,
}

/// Multi-tool / weapon stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    /// Unique id.
    pub id: String,
    /// Weapon arc half-width in radians.
    pub half_angle: f64,
    /// Weapon reach in world units.
    pub weapon_reach: f64,
    /// Damage per swing.
    pub damage: f64,
    /// Knockback force per swing.
    #[serde(default)]
    pub knockback: f64,
    /// Distance from the actor to the tool's work point.
    pub tool_reach: f64,
    /// Radius around the work point that counts as reached.
    pub tool_tolerance: f64,
    /// Copies produced per harvest.
    #[serde(default = "default_count")]
    pub harvest_multiplier: u32,
}

/// Timing data of one animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSpec {
    /// Time the frame stays active (ms).
    pub duration_ms: f64,
    /// Marks the frame gameplay callbacks are bound to.
    #[serde(default)]
    pub key_frame: bool,
}

/// Frame timing of one sheet/animation pair, optionally per facing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationClip {
    /// Sprite-sheet key.
    pub sheet: String,
    /// Animation key within the sheet.
    pub key: String,
    /// Facing this clip applies to; `None` applies to all facings.
    #[serde(default)]
    pub facing: Option<Direction>,
    /// Ordered frames.
    pub frames: Vec<FrameSpec>,
    /// Pixel size of one frame.
    #[serde(default)]
    pub frame_size: [u32; 2],
}

impl AnimationClip {
    /// Index of the key frame, if the clip has one.
    pub fn key_frame(&self) -> Option<usize> {
        self.frames.iter().position(|f| f.key_frame)
    }

    /// Total duration of one cycle (ms).
    pub fn cycle_ms(&self) -> f64 {
        self.frames.iter().map(|f| f.duration_ms).sum()
    }
}

/// Maps a generated decoration to the resource it becomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecorationRule {
    /// Decoration produced by world generation.
    pub decoration: Decoration,
    /// Resource id placed on the tile.
    pub resource: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentPack {
    items: Vec<ItemDef>,
    resources: Vec<ResourceDef>,
    mobs: Vec<MobDef>,
    buildings: Vec<BuildingDef>,
    projectiles: Vec<ProjectileDef>,
    tools: Vec<ToolDef>,
    animations: Vec<AnimationClip>,
    decorations: Vec<DecorationRule>,
}

/// Validated, read-only content tables.
#[derive(Debug, Clone, Default)]
pub struct ContentRegistry {
    items: BTreeMap<String, ItemDef>,
    resources: BTreeMap<String, ResourceDef>,
    mobs: BTreeMap<String, MobDef>,
    buildings: BTreeMap<String, BuildingDef>,
    projectiles: BTreeMap<String, ProjectileDef>,
    tools: BTreeMap<String, ToolDef>,
    clips: BTreeMap<(String, String), Vec<AnimationClip>>,
    decorations: BTreeMap<Decoration, String>,
}

fn index<T>(
    kind: &'static str,
    defs: Vec<T>,
    id: impl Fn(&T) -> &str,
) -> Result<BTreeMap<String, T>, ContentError> {
    let mut map = BTreeMap::new();
    for def in defs {
        let key = id(&def).to_string();
        if map.contains_key(&key) {
            return Err(ContentError::Duplicate { kind, id: key });
        }
        map.insert(key, def);
    }
    Ok(map)
}

impl ContentRegistry {
    /// Parse and validate a JSON content pack.
    pub fn from_json_str(input: &str) -> Result<Self, ContentError> {
        let pack: ContentPack = serde_json::from_str(input)?;

        let mut clips: BTreeMap<(String, String), Vec<AnimationClip>> = BTreeMap::new();
        for clip in pack.animations {
            clips
                .entry((clip.sheet.clone(), clip.key.clone()))
                .or_default()
                .push(clip);
        }

        let mut decorations = BTreeMap::new();
        for rule in pack.decorations {
            decorations.insert(rule.decoration, rule.resource);
        }

        let registry = Self {
            items: index("item", pack.items, |d| &d.id)?,
            resources: index("resource", pack.resources, |d| &d.id)?,
            mobs: index("mob", pack.mobs, |d| &d.id)?,
            buildings: index("building", pack.buildings, |d| &d.id)?,
            projectiles: index("projectile", pack.projectiles, |d| &d.id)?,
            tools: index("tool", pack.tools, |d| &d.id)?,
            clips,
            decorations,
        };
        registry.validate()?;

        tracing::debug!(
            items = registry.items.len(),
            mobs = registry.mobs.len(),
            resources = registry.resources.len(),
            clips = registry.clips.len(),
            "Loaded content pack"
        );
        Ok(registry)
    }

    /// The base pack compiled into the crate.
    pub fn builtin() -> Result<Self, ContentError> {
        Self::from_json_str(BUILTIN_PACK)
    }

    /// Check every cross-reference and table constraint.
    pub fn validate(&self) -> Result<(), ContentError> {
        for resource in self.resources.values() {
            self.check_drops("resource", &resource.id, &resource.drops)?;
        }

        for mob in self.mobs.values() {
            self.check_drops("mob", &mob.id, &mob.drops)?;
            if mob.min_group == 0 || mob.min_group > mob.max_group {
                return Err(ContentError::Invalid {
                    kind: "mob",
                    id: mob.id.clone(),
                    reason: format!("bad group size {}..={}", mob.min_group, mob.max_group),
                });
            }
            if mob.spawn_terrain.is_empty() {
                return Err(ContentError::Invalid {
                    kind: "mob",
                    id: mob.id.clone(),
                    reason: "no spawn terrain".into(),
                });
            }
            for spec in &mob.behaviours {
                if let BehaviourSpec::RandomWander {
                    bounds,
                    min_wait_ms,
                    max_wait_ms,
                } = spec
                {
                    if *bounds <= 0 || min_wait_ms > max_wait_ms {
                        return Err(ContentError::Invalid {
                            kind: "mob",
                            id: mob.id.clone(),
                            reason: "bad random_wander parameters".into(),
                        });
                    }
                }
            }
        }

        for (decoration, resource) in &self.decorations {
            if !self.resources.contains_key(resource) {
                return Err(ContentError::Invalid {
                    kind: "decoration",
                    id: format!("{decoration:?}"),
                    reason: format!("unknown resource '{resource}'"),
                });
            }
        }

        for building in self.buildings.values() {
            if building.width == 0 || building.height == 0 {
                return Err(ContentError::Invalid {
                    kind: "building",
                    id: building.id.clone(),
                    reason: "empty footprint".into(),
                });
            }
        }

        for ((sheet, key), clips) in &self.clips {
            for clip in clips {
                let id = format!("{sheet}/{key}");
                if clip.frames.is_empty() {
                    return Err(ContentError::Invalid {
                        kind: "animation",
                        id,
                        reason: "no frames".into(),
                    });
                }
                if clip.frames.iter().filter(|f| f.key_frame).count() > 1 {
                    return Err(ContentError::Invalid {
                        kind: "animation",
                        id,
                        reason: "more than one key frame".into(),
                    });
                }
                if clip.frames.iter().any(|f| f.duration_ms <= 0.0) {
                    return Err(ContentError::Invalid {
                        kind: "animation",
                        id,
                        reason: "non-positive frame duration".into(),
                    });
                }
            }
        }

        Ok(())
    }

    fn check_drops(
        &self,
        kind: &'static str,
        id: &str,
        drops: &[DropEntry],
    ) -> Result<(), ContentError> {
        for drop in drops {
            if !self.items.contains_key(&drop.item) {
                return Err(ContentError::Invalid {
                    kind,
                    id: id.to_string(),
                    reason: format!("drops unknown item '{}'", drop.item),
                });
            }
        }
        Ok(())
    }

    /// Look up an item definition.
    pub fn item(&self, id: &str) -> Result<&ItemDef, ContentError> {
        self.items.get(id).ok_or_else(|| unknown("item", id))
    }

    /// Look up a resource definition.
    pub fn resource(&self, id: &str) -> Result<&ResourceDef, ContentError> {
        self.resources.get(id).ok_or_else(|| unknown("resource", id))
    }

    /// Look up a mob definition.
    pub fn mob(&self, id: &str) -> Result<&MobDef, ContentError> {
        self.mobs.get(id).ok_or_else(|| unknown("mob", id))
    }

    /// Look up a building definition.
    pub fn building(&self, id: &str) -> Result<&BuildingDef, ContentError> {
        self.buildings.get(id).ok_or_else(|| unknown("building", id))
    }

    /// Look up a projectile definition.
    pub fn projectile(&self, id: &str) -> Result<&ProjectileDef, ContentError> {
        self.projectiles
            .get(id)
            .ok_or_else(|| unknown("projectile", id))
    }

    /// Look up a tool definition.
    pub fn tool(&self, id: &str) -> Result<&ToolDef, ContentError> {
        self.tools.get(id).ok_or_else(|| unknown("tool", id))
    }

    /// All projectile definitions, ordered by id.
    pub fn projectiles(&self) -> impl Iterator<Item = &ProjectileDef> {
        self.projectiles.values()
    }

    /// All mob definitions, ordered by id.
    pub fn mobs(&self) -> impl Iterator<Item = &MobDef> {
        self.mobs.values()
    }

    /// All building definitions, ordered by id.
    pub fn buildings(&self) -> impl Iterator<Item = &BuildingDef> {
        self.buildings.values()
    }

    /// Mob definitions allowed to spawn on `terrain`, ordered by id.
    pub fn mobs_for_terrain(&self, terrain: Terrain) -> Vec<&MobDef> {
        self.mobs
            .values()
            .filter(|mob| mob.spawn_terrain.contains(&terrain))
            .collect()
    }

    /// Resource a generated decoration turns into, if the pack maps it.
    pub fn resource_for_decoration(&self, decoration: Decoration) -> Option<&ResourceDef> {
        self.decorations
            .get(&decoration)
            .and_then(|id| self.resources.get(id))
    }

    /// Frame timing for a sheet/animation pair, preferring a facing-specific clip.
    pub fn clip(
        &self,
        sheet: &str,
        key: &str,
        facing: Direction,
    ) -> Result<&AnimationClip, ContentError> {
        let clips = self
            .clips
            .get(&(sheet.to_string(), key.to_string()))
            .ok_or_else(|| ContentError::UnknownClip {
                sheet: sheet.to_string(),
                key: key.to_string(),
            })?;
        clips
            .iter()
            .find(|c| c.facing == Some(facing))
            .or_else(|| clips.iter().find(|c| c.facing.is_none()))
            .ok_or_else(|| ContentError::UnknownClip {
                sheet: sheet.to_string(),
                key: format!("{key}:{}", facing.as_str()),
            })
    }

    /// Whether a clip exists for the pair in any facing.
    pub fn has_clip(&self, sheet: &str, key: &str) -> bool {
        self.clips
            .contains_key(&(sheet.to_string(), key.to_string()))
    }
}

fn unknown(kind: &'static str, id: &str) -> ContentError {
    ContentError::Unknown {
        kind,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_pack_loads_and_validates() {
        let registry = ContentRegistry::builtin().expect("builtin pack is valid");
        assert!(registry.item("wood").is_ok());
        assert!(registry.mob("chicken").is_ok());
        assert!(registry.tool("multi_tool").is_ok());
        assert!(registry.resource_for_decoration(Decoration::Tree).is_some());
    }

    #[test]
    fn unknown_lookup_is_an_error() {
        let registry = ContentRegistry::builtin().unwrap();
        let err = registry.mob("dragon").unwrap_err();
        assert!(matches!(err, ContentError::Unknown { kind: "mob", .. }));
    }

    #[test]
    fn mobs_for_terrain_filters_by_spawn_list() {
        let registry = ContentRegistry::builtin().unwrap();
        let on_grass = registry.mobs_for_terrain(Terrain::Grass);
        assert!(!on_grass.is_empty());
        assert!(on_grass
            .iter()
            .all(|m| m.spawn_terrain.contains(&Terrain::Grass)));
        assert!(registry.mobs_for_terrain(Terrain::DeepWater).is_empty());
    }

    #[test]
    fn drop_of_unknown_item_fails_validation() {
        let pack = r#"{
            "resources": [{"id": "tree", "tag": "wood", "drops": [{"item": "ghost"}]}]
        }"#;
        let err = ContentRegistry::from_json_str(pack).unwrap_err();
        assert!(matches!(err, ContentError::Invalid { kind: "resource", .. }));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let pack = r#"{"items": [{"id": "wood"}, {"id": "wood"}]}"#;
        let err = ContentRegistry::from_json_str(pack).unwrap_err();
        assert!(matches!(err, ContentError::Duplicate { kind: "item", .. }));
    }

    #[test]
    fn two_key_frames_are_rejected() {
        let pack = r#"{"animations": [{
            "sheet": "player", "key": "swing",
            "frames": [
                {"duration_ms": 50, "key_frame": true},
                {"duration_ms": 50, "key_frame": true}
            ]
        }]}"#;
        let err = ContentRegistry::from_json_str(pack).unwrap_err();
        assert!(matches!(err, ContentError::Invalid { kind: "animation", .. }));
    }

    #[test]
    fn clip_prefers_facing_specific_entry() {
        let pack = r#"{"animations": [
            {"sheet": "s", "key": "walk", "frames": [{"duration_ms": 10}]},
            {"sheet": "s", "key": "walk", "facing": "left", "frames": [{"duration_ms": 20}, {"duration_ms": 20}]}
        ]}"#;
        let registry = ContentRegistry::from_json_str(pack).unwrap();
        assert_eq!(registry.clip("s", "walk", Direction::Left).unwrap().frames.len(), 2);
        assert_eq!(registry.clip("s", "walk", Direction::Up).unwrap().frames.len(), 1);
        assert!(registry.clip("s", "run", Direction::Up).is_err());
    }
}
