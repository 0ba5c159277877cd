//! Projectile system for arrows and other ranged attacks.
//!
//! Projectiles fly in a straight line. They fade out when blocked, when they
//! leave the despawn radius or when they have travelled their maximum
//! distance, and they hit the first opposing entity they touch.

use glam::{DVec2, IVec2};
use tracing::debug;
use verdant_core::{ProjectileDef, ProjectileEffectDef};

use crate::coords::chebyshev;
use crate::entity::{Body, EntityId, EntityRef, HitCircle, Hittable};
use crate::error::WorldError;
use crate::storage::ChunkStore;

/// Per-tick speed multiplier of decelerating projectiles.
pub const SPIT_DRAG: f64 = 0.97;
/// Speed under which a decelerating projectile drops to the ground.
pub const SPIT_MIN_SPEED: f64 = 0.5;

/// Flight model of a projectile, keyed by the content `kind` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectileKind {
    /// Constant speed until it hits or runs out of range.
    Arrow,
    /// Slows down each tick and splashes when it gets too slow.
    Spit,
}

impl ProjectileKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProjectileKind::Arrow => "arrow",
            ProjectileKind::Spit => "spit",
        }
    }

    /// Parse a kind from a string key (case-insensitive).
    pub fn parse(input: &str) -> Option<Self> {
        let key = input.trim().to_lowercase();
        match key.as_str() {
            "arrow" => Some(ProjectileKind::Arrow),
            "spit" => Some(ProjectileKind::Spit),
            _ => None,
        }
    }

    /// Resolve the kind of a definition.
    pub fn for_def(def: &ProjectileDef) -> Result<Self, WorldError> {
        Self::parse(&def.kind).ok_or_else(|| WorldError::UnknownProjectileKind(def.kind.clone()))
    }

    /// Speed after one tick of flight.
    fn next_speed(self, speed: f64) -> f64 {
        match self {
            ProjectileKind::Arrow => speed,
            ProjectileKind::Spit => speed * SPIT_DRAG,
        }
    }
}

/// A projectile in flight.
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: EntityId,
    pub body: Body,
    pub owner: EntityRef,
    pub kind: ProjectileKind,
    /// Sprite sheet of the flight animation.
    pub sprite: String,
    direction: DVec2,
    speed: f64,
    damage: f64,
    travelled: f64,
    max_distance: f64,
    despawn_animation: String,
    effect: Option<ProjectileEffectDef>,
}

impl Projectile {
    /// Build a projectile from its definition, flying along `direction`.
    pub fn from_def(
        id: EntityId,
        def: &ProjectileDef,
        owner: EntityRef,
        position: DVec2,
        direction: DVec2,
    ) -> Result<Self, WorldError> {
        let direction = direction.normalize_or_zero();
        let mut body = Body::new(position, def.hit_radius);
        body.face(direction);
        Ok(Self {
            id,
            body,
            owner,
            kind: ProjectileKind::for_def(def)?,
            sprite: def.sprite.clone(),
            direction,
            speed: def.speed,
            damage: def.damage,
            travelled: 0.0,
            max_distance: def.max_distance,
            despawn_animation: def.despawn_animation.clone(),
            effect: def.effect.clone(),
        })
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::Projectile(self.id)
    }

    pub fn direction(&self) -> DVec2 {
        self.direction
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn damage(&self) -> f64 {
        self.damage
    }

    pub fn travelled(&self) -> f64 {
        self.travelled
    }

    /// Whether this projectile damages `target`.
    fn opposes(&self, target: EntityRef) -> bool {
        match self.owner {
            EntityRef::Player(_) => matches!(target, EntityRef::Mob(_)),
            EntityRef::Mob(_) => matches!(target, EntityRef::Player(_)),
            _ => false,
        }
    }

    /// Fly one tick. Returns false when the flight ended without a hit.
    fn fly(&mut self, store: &mut ChunkStore) -> bool {
        let step = self.direction * self.speed;
        if !self.body.try_move(store, step) {
            return false;
        }
        self.travelled += step.length();
        self.speed = self.kind.next_speed(self.speed);
        self.travelled < self.max_distance
            && !(self.kind == ProjectileKind::Spit && self.speed < SPIT_MIN_SPEED)
    }

    fn expire(&mut self) -> ProjectileEvent {
        self.body.flag_despawn();
        ProjectileEvent::Expired {
            projectile: self.id,
            position: self.body.position(),
            animation: self.despawn_animation.clone(),
        }
    }
}

/// Something a projectile can hit this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTarget {
    pub entity: EntityRef,
    pub hitbox: HitCircle,
}

impl HitTarget {
    pub fn of(entity: EntityRef, body: &Body) -> Self {
        Self {
            entity,
            hitbox: HitCircle {
                center: body.hitbox_center(),
                radius_sq: body.hit_radius_sq(),
            },
        }
    }
}

/// Outcome of a projectile's flight, applied by the world context.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectileEvent {
    /// The projectile struck an opposing entity.
    Hit {
        projectile: EntityId,
        owner: EntityRef,
        target: EntityRef,
        position: DVec2,
        direction: DVec2,
        damage: f64,
        effect: Option<ProjectileEffectDef>,
    },
    /// The projectile faded out without hitting anything.
    Expired {
        projectile: EntityId,
        position: DVec2,
        animation: String,
    },
}

/// Result of one projectile update.
#[derive(Debug, Default)]
pub struct ProjectileUpdate {
    pub events: Vec<ProjectileEvent>,
    pub removed: Vec<EntityRef>,
}

/// Manages projectiles in the world.
#[derive(Debug, Default)]
pub struct ProjectileManager {
    projectiles: Vec<Projectile>,
}

impl ProjectileManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, projectile: Projectile) {
        debug!(
            id = %projectile.id,
            kind = projectile.kind.as_str(),
            owner = ?projectile.owner,
            "Spawned projectile"
        );
        self.projectiles.push(projectile);
    }

    /// Get number of active projectiles.
    pub fn count(&self) -> usize {
        self.projectiles.len()
    }

    pub fn get(&self, id: EntityId) -> Option<&Projectile> {
        self.projectiles.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    /// Fly every projectile, resolve hits against `targets` and sweep.
    ///
    /// A target is struck by at most one projectile per tick.
    pub fn update(
        &mut self,
        store: &mut ChunkStore,
        targets: &[HitTarget],
        center_tile: Option<IVec2>,
        despawn_distance: i32,
    ) -> ProjectileUpdate {
        let mut update = ProjectileUpdate::default();
        let mut struck: Vec<EntityRef> = Vec::new();

        for projectile in &mut self.projectiles {
            if projectile.body.is_despawned() {
                continue;
            }
            if let Some(center) = center_tile {
                if chebyshev(projectile.body.tile(), center) > despawn_distance {
                    projectile.body.flag_despawn();
                    continue;
                }
            }

            let flying = projectile.fly(store);

            let hit = targets.iter().find(|t| {
                projectile.opposes(t.entity)
                    && !struck.contains(&t.entity)
                    && projectile.body.collides_with(&t.hitbox)
            });
            if let Some(target) = hit {
                struck.push(target.entity);
                projectile.body.flag_despawn();
                update.events.push(ProjectileEvent::Hit {
                    projectile: projectile.id,
                    owner: projectile.owner,
                    target: target.entity,
                    position: projectile.body.position(),
                    direction: projectile.direction,
                    damage: projectile.damage,
                    effect: projectile.effect.clone(),
                });
                continue;
            }

            if !flying {
                update.events.push(projectile.expire());
            }
        }

        self.projectiles.retain(|p| {
            if p.body.is_despawned() {
                update.removed.push(p.entity_ref());
                false
            } else {
                true
            }
        });
        update
    }
}
