//! Telescoping of intended actions.
//!
//! A telescope looks at what an actor's tool or weapon would touch right now
//! without changing anything. Committing it plays the matching action
//! animation and binds the actual mutation to the clip's key frame, so the
//! world only changes when the swing lands.

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};
use tracing::debug;
use verdant_core::{Direction, MobAttackDef, ResourceTag, Terrain, ToolDef};

use crate::animation::{AnimationCommand, AnimationId};
use crate::context::WorldContext;
use crate::coords::{tile_center, tile_of, TileRect, TILE_SIZE};
use crate::entity::{Body, EntityId, EntityRef, HitCircle, Hittable};
use crate::error::WorldError;
use crate::player::{PrimaryBinding, PLAYER_SHEET};
use crate::range::{ArcRange, PointRange};

/// Player and mob clip of a melee swing.
pub const SWING_CLIP: &str = "swing";
/// Player clip of a projectile launch.
pub const SHOOT_CLIP: &str = "shoot";
/// Player clip of a building placement.
pub const BUILD_CLIP: &str = "build";
/// Player clips the multi-tool can play.
pub const TOOL_CLIPS: [&str; 6] = [SWING_CLIP, "chop", "mine", "harvest", "bucket", "farm"];

/// Weapon stats of one swing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swing {
    pub half_angle: f64,
    pub reach: f64,
    pub damage: f64,
    pub knockback: f64,
}

impl Swing {
    pub fn from_tool(tool: &ToolDef) -> Self {
        Self {
            half_angle: tool.half_angle,
            reach: tool.weapon_reach,
            damage: tool.damage,
            knockback: tool.knockback,
        }
    }

    pub fn from_attack(attack: &MobAttackDef) -> Self {
        Self {
            half_angle: attack.half_angle,
            reach: attack.reach,
            damage: attack.damage,
            knockback: attack.knockback,
        }
    }
}

/// Discriminant of a [`Telescope`], used for cursor hints and reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TelescopeKind {
    #[default]
    None,
    Projectile,
    Slash,
    Bucket,
    Chop,
    Farm,
    Harvest,
    Mine,
}

/// What an action would do if committed now.
#[derive(Debug, Clone, PartialEq)]
pub enum Telescope {
    /// The actor cannot act.
    None,
    Projectile {
        projectile: String,
        direction: DVec2,
    },
    /// Melee swing; `targets` may be empty.
    Slash {
        swing: Swing,
        targets: Vec<EntityRef>,
    },
    /// Fill a bucket from a liquid resource, or fill in water with `result`.
    Bucket {
        tile: IVec2,
        targets: Vec<EntityRef>,
        result: Option<Terrain>,
    },
    Chop {
        tile: IVec2,
        multiplier: u32,
    },
    Farm {
        tile: IVec2,
        result: Terrain,
    },
    Harvest {
        tile: IVec2,
        multiplier: u32,
    },
    Mine {
        tile: IVec2,
        multiplier: u32,
    },
}

impl Telescope {
    pub fn kind(&self) -> TelescopeKind {
        match self {
            Telescope::None => TelescopeKind::None,
            Telescope::Projectile { .. } => TelescopeKind::Projectile,
            Telescope::Slash { .. } => TelescopeKind::Slash,
            Telescope::Bucket { .. } => TelescopeKind::Bucket,
            Telescope::Chop { .. } => TelescopeKind::Chop,
            Telescope::Farm { .. } => TelescopeKind::Farm,
            Telescope::Harvest { .. } => TelescopeKind::Harvest,
            Telescope::Mine { .. } => TelescopeKind::Mine,
        }
    }

    /// Entities the action would touch.
    pub fn targets(&self) -> Vec<EntityRef> {
        match self {
            Telescope::None | Telescope::Projectile { .. } | Telescope::Farm { .. } => Vec::new(),
            Telescope::Slash { targets, .. } | Telescope::Bucket { targets, .. } => targets.clone(),
            Telescope::Chop { tile, .. }
            | Telescope::Harvest { tile, .. }
            | Telescope::Mine { tile, .. } => vec![EntityRef::Resource(*tile)],
        }
    }
}

/// A telescoped action bound to its actor, ready to commit.
#[derive(Debug, Clone, PartialEq)]
pub struct TelescopeResult {
    pub actor: EntityRef,
    /// Query origin relative to the actor's hitbox centre.
    pub offset: DVec2,
    /// Aim used for the queries.
    pub facing: DVec2,
    pub telescope: Telescope,
}

impl TelescopeResult {
    pub fn kind(&self) -> TelescopeKind {
        self.telescope.kind()
    }

    /// Play the action animation and bind the mutation to its key frame.
    ///
    /// Returns the animation id, or `None` when there is nothing to do.
    pub fn commit(self, world: &mut WorldContext) -> Result<Option<AnimationId>, WorldError> {
        let kind = self.kind();
        let (clip, command) = match self.telescope {
            Telescope::None => return Ok(None),
            Telescope::Projectile {
                projectile,
                direction,
            } => (
                SHOOT_CLIP,
                AnimationCommand::FireProjectile {
                    owner: self.actor,
                    projectile,
                    direction,
                },
            ),
            Telescope::Slash { swing, targets } => (
                SWING_CLIP,
                AnimationCommand::MeleeStrike {
                    attacker: self.actor,
                    offset: self.offset,
                    aim: self.facing,
                    swing,
                    targets,
                },
            ),
            Telescope::Bucket {
                tile,
                result: Some(terrain),
                ..
            } => ("bucket", AnimationCommand::ChangeTerrain { tile, terrain }),
            Telescope::Bucket {
                tile, result: None, ..
            } => {
                let EntityRef::Player(player) = self.actor else {
                    return Ok(None);
                };
                ("bucket", AnimationCommand::CollectLiquid { player, tile })
            }
            Telescope::Chop { tile, multiplier } => {
                ("chop", AnimationCommand::HarvestResource { tile, multiplier })
            }
            Telescope::Harvest { tile, multiplier } => {
                ("harvest", AnimationCommand::HarvestResource { tile, multiplier })
            }
            Telescope::Mine { tile, multiplier } => {
                ("mine", AnimationCommand::HarvestResource { tile, multiplier })
            }
            Telescope::Farm { tile, result } => (
                "farm",
                AnimationCommand::ChangeTerrain {
                    tile,
                    terrain: result,
                },
            ),
        };

        let id = world.play_action(self.actor, self.facing, clip)?;
        world.animations.add_key_frame_command(id, command);
        debug!(actor = ?self.actor, ?kind, clip, "Committed action");
        Ok(Some(id))
    }
}

impl WorldContext {
    /// Work out what `actor` would do when acting toward `facing`.
    ///
    /// `offset` shifts the query origin away from the actor's hitbox centre.
    pub fn telescope(
        &mut self,
        actor: EntityRef,
        offset: DVec2,
        facing: DVec2,
    ) -> Result<TelescopeResult, WorldError> {
        let facing = facing.normalize_or_zero();
        let telescope = match actor {
            EntityRef::Player(id) => {
                let player = self
                    .players
                    .get(id)
                    .ok_or(WorldError::MissingEntity(actor))?;
                let origin = player.body.hitbox_center() + offset;
                let tool = player.tool.clone();
                match player.binding.clone() {
                    PrimaryBinding::Projectile(projectile) => {
                        self.content.projectile(&projectile)?;
                        Telescope::Projectile {
                            projectile,
                            direction: facing,
                        }
                    }
                    PrimaryBinding::MultiTool => {
                        self.telescope_multi_tool(actor, origin, facing, &tool)
                    }
                }
            }
            EntityRef::Mob(id) => {
                let mob = self.mobs.get(id).ok_or(WorldError::MissingEntity(actor))?;
                let origin = mob.body.hitbox_center() + offset;
                match mob.attack().map(Swing::from_attack) {
                    Some(swing) => Telescope::Slash {
                        targets: self.slash_targets(actor, origin, facing, &swing),
                        swing,
                    },
                    None => Telescope::None,
                }
            }
            EntityRef::Item(_) | EntityRef::Projectile(_) | EntityRef::Resource(_) => {
                Telescope::None
            }
        };
        Ok(TelescopeResult {
            actor,
            offset,
            facing,
            telescope,
        })
    }

    /// Telescope and commit in one step.
    pub fn invoke(
        &mut self,
        actor: EntityRef,
        offset: DVec2,
        facing: DVec2,
    ) -> Result<Option<AnimationId>, WorldError> {
        self.telescope(actor, offset, facing)?.commit(self)
    }

    fn telescope_multi_tool(
        &mut self,
        actor: EntityRef,
        origin: DVec2,
        facing: DVec2,
        tool: &ToolDef,
    ) -> Telescope {
        let swing = Swing::from_tool(tool);
        let targets = self.slash_targets(actor, origin, facing, &swing);
        if !targets.is_empty() {
            return Telescope::Slash { swing, targets };
        }

        let reach = PointRange::new(
            origin,
            facing,
            tool.tool_reach,
            tool.tool_tolerance * tool.tool_tolerance,
        );
        let multiplier = tool.harvest_multiplier;
        if let Some((tile, tag)) = self.nearest_resource(&reach, origin, tool) {
            return match tag {
                ResourceTag::Wood => Telescope::Chop { tile, multiplier },
                ResourceTag::Plant => Telescope::Harvest { tile, multiplier },
                ResourceTag::Liquid | ResourceTag::Drink => Telescope::Bucket {
                    tile,
                    targets: vec![EntityRef::Resource(tile)],
                    result: None,
                },
                ResourceTag::Rock | ResourceTag::Ore | ResourceTag::Gem => {
                    Telescope::Mine { tile, multiplier }
                }
            };
        }

        let tile = tile_of(reach.reach_point());
        let terrain = self.chunks.terrain(tile);
        if let Some(result) = terrain.farm_toggle() {
            return Telescope::Farm { tile, result };
        }
        if terrain.is_water() {
            return Telescope::Bucket {
                tile,
                targets: Vec::new(),
                result: Some(Terrain::Rock),
            };
        }
        Telescope::Slash {
            swing,
            targets: Vec::new(),
        }
    }

    /// Opponents of `attacker` inside the swing arc or within engage distance.
    pub(crate) fn slash_targets(
        &self,
        attacker: EntityRef,
        origin: DVec2,
        facing: DVec2,
        swing: &Swing,
    ) -> Vec<EntityRef> {
        let arc = ArcRange::new(origin, facing, swing.half_angle, swing.reach * swing.reach);
        let engage_sq = self.config.engage_distance_sq();
        let engaged = |body: &Body| {
            let hit = arc.query(body);
            hit.in_range || hit.distance_sq <= engage_sq + body.hit_radius_sq()
        };

        match attacker {
            EntityRef::Player(_) => self
                .mobs
                .iter()
                .filter(|m| !m.body.is_despawned() && engaged(&m.body))
                .map(|m| m.entity_ref())
                .collect(),
            EntityRef::Mob(_) => self
                .players
                .iter()
                .filter(|p| !p.body.is_despawned() && engaged(&p.body))
                .map(|p| p.entity_ref())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Closest resource whose hitbox centre lies within the tool tolerance.
    fn nearest_resource(
        &mut self,
        reach: &PointRange,
        origin: DVec2,
        tool: &ToolDef,
    ) -> Option<(IVec2, ResourceTag)> {
        let radius = ((tool.tool_reach + tool.tool_tolerance) / TILE_SIZE as f64).ceil() as i32 + 1;
        self.chunks
            .resources_near(tile_of(origin), radius)
            .into_iter()
            .filter_map(|(tile, occupant)| {
                let hitbox = HitCircle {
                    center: tile_center(tile),
                    radius_sq: occupant.hit_radius_sq,
                };
                (!reach.in_range(&hitbox)).then(|| (reach.distance_sq(&hitbox), tile, occupant.tag))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, tile, tag)| (tile, tag))
    }

    /// Turn the actor toward `facing` and play its one-shot `clip`.
    pub(crate) fn play_action(
        &mut self,
        actor: EntityRef,
        facing: DVec2,
        clip: &str,
    ) -> Result<AnimationId, WorldError> {
        let (sheet, direction) = match actor {
            EntityRef::Player(id) => {
                let player = self
                    .players
                    .get_mut(id)
                    .ok_or(WorldError::MissingEntity(actor))?;
                player.body.face(facing);
                (PLAYER_SHEET.to_string(), player.body.facing)
            }
            EntityRef::Mob(id) => {
                let mob = self
                    .mobs
                    .get_mut(id)
                    .ok_or(WorldError::MissingEntity(actor))?;
                mob.body.face(facing);
                (mob.sprite.clone(), mob.body.facing)
            }
            _ => return Err(WorldError::MissingEntity(actor)),
        };

        let id = self
            .animations
            .play_once(&self.content, actor, &sheet, clip, direction)?;
        if let EntityRef::Player(player) = actor {
            if let Some(player) = self.players.get_mut(player) {
                player.action = Some(id);
            }
        }
        Ok(id)
    }

    /// Start placing `building` with its top-left tile under `cursor`.
    ///
    /// The footprint is validated now and again when the build animation
    /// completes. Returns `None` when the footprint is refused.
    pub fn begin_placement(
        &mut self,
        player: EntityId,
        building: &str,
        cursor: DVec2,
    ) -> Result<Option<AnimationId>, WorldError> {
        let def = self.content.building(building)?;
        let category = def.category;
        let rect = TileRect::from_size(tile_of(cursor), def.width, def.height);
        if !self.chunks.can_place(category, rect) {
            debug!(building, ?rect, "Placement refused");
            return Ok(None);
        }

        let actor = EntityRef::Player(player);
        let facing = match self.players.get(player) {
            Some(p) => tile_center(rect.top_left) - p.body.position(),
            None => return Err(WorldError::MissingEntity(actor)),
        };
        let id = self.play_action(actor, facing, BUILD_CLIP)?;
        self.animations.add_after_command(
            id,
            AnimationCommand::PlaceBuilding {
                key: building.to_string(),
                category,
                rect,
            },
        );
        Ok(Some(id))
    }
}

/// Facing used when an aim vector is zero.
pub fn aim_or_facing(aim: DVec2, facing: Direction) -> DVec2 {
    let aim = aim.normalize_or_zero();
    if aim == DVec2::ZERO {
        let (x, y) = facing.unit();
        DVec2::new(x, y)
    } else {
        aim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let swing = Swing {
            half_angle: 1.0,
            reach: 10.0,
            damage: 1.0,
            knockback: 0.0,
        };
        assert_eq!(
            Telescope::Slash {
                swing,
                targets: Vec::new()
            }
            .kind(),
            TelescopeKind::Slash
        );
        let tile = IVec2::new(2, 3);
        let chop = Telescope::Chop { tile, multiplier: 1 };
        assert_eq!(chop.kind(), TelescopeKind::Chop);
        assert_eq!(chop.targets(), vec![EntityRef::Resource(tile)]);
        assert!(Telescope::None.targets().is_empty());
    }

    #[test]
    fn zero_aim_falls_back_to_facing() {
        assert_eq!(aim_or_facing(DVec2::ZERO, Direction::Left), DVec2::new(-1.0, 0.0));
        assert_eq!(aim_or_facing(DVec2::new(0.0, 5.0), Direction::Left), DVec2::new(0.0, 1.0));
    }
}
