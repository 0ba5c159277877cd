//! Mob behaviour chain.
//!
//! Each mob carries an ordered list of behaviours. Every tick they are tried
//! in order and the first one that reports it executed ends the chain.

use glam::{DVec2, IVec2};
use rand::rngs::StdRng;
use rand::Rng;
use verdant_core::{BehaviourSpec, Terrain};

use crate::coords::tile_center;
use crate::entity::Body;
use crate::storage::ChunkStore;

/// Wander destinations tried per attempt before giving up for the tick.
pub const MAX_WANDER_ATTEMPTS: usize = 8;

/// Distance under which a walker counts as arrived.
pub const ARRIVE_DISTANCE: f64 = 1.0;

/// What the behaviour chain knows about the active player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSnapshot {
    pub position: DVec2,
    pub tile: IVec2,
}

/// Shared inputs of one behaviour tick.
pub struct BehaviourCtx<'a> {
    pub store: &'a mut ChunkStore,
    pub rng: &'a mut StdRng,
    pub player: Option<PlayerSnapshot>,
    /// Terrain the mob may stand on.
    pub allowed: &'a [Terrain],
    /// Walk speed (world units per tick).
    pub speed: f64,
    pub dt_ms: f64,
}

/// Result of one walking step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Moving,
    Arrived,
    Blocked,
}

/// Step toward `target`, never overshooting it.
pub fn walk_toward(body: &mut Body, store: &mut ChunkStore, target: DVec2, speed: f64) -> Walk {
    let delta = target - body.position();
    let distance = delta.length();
    if distance <= ARRIVE_DISTANCE {
        return Walk::Arrived;
    }
    let step = delta / distance * speed.min(distance);
    body.face(step);
    if body.try_move(store, step) {
        if distance - speed <= ARRIVE_DISTANCE {
            Walk::Arrived
        } else {
            Walk::Moving
        }
    } else {
        Walk::Blocked
    }
}

/// Wander between random allowed tiles, idling on arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomWander {
    pub bounds: i32,
    pub min_wait_ms: f64,
    pub max_wait_ms: f64,
    target: Option<DVec2>,
    wait_ms: f64,
}

impl RandomWander {
    pub fn new(bounds: i32, min_wait_ms: f64, max_wait_ms: f64) -> Self {
        Self {
            bounds,
            min_wait_ms,
            max_wait_ms,
            target: None,
            wait_ms: 0.0,
        }
    }

    pub fn target(&self) -> Option<DVec2> {
        self.target
    }

    fn pick_target(&self, origin: IVec2, ctx: &mut BehaviourCtx<'_>) -> Option<DVec2> {
        for _ in 0..MAX_WANDER_ATTEMPTS {
            let offset = IVec2::new(
                ctx.rng.gen_range(-self.bounds..=self.bounds),
                ctx.rng.gen_range(-self.bounds..=self.bounds),
            );
            let tile = origin + offset;
            if ctx.allowed.contains(&ctx.store.terrain(tile)) {
                return Some(tile_center(tile));
            }
        }
        None
    }

    fn execute(&mut self, body: &mut Body, ctx: &mut BehaviourCtx<'_>) -> bool {
        if self.wait_ms > 0.0 {
            self.wait_ms -= ctx.dt_ms;
            return true;
        }

        let target = match self.target {
            Some(target) => target,
            None => match self.pick_target(body.tile(), ctx) {
                Some(target) => {
                    self.target = Some(target);
                    target
                }
                None => return false,
            },
        };

        match walk_toward(body, ctx.store, target, ctx.speed) {
            Walk::Moving => {}
            Walk::Arrived | Walk::Blocked => {
                self.target = None;
                self.wait_ms = ctx.rng.gen_range(self.min_wait_ms..=self.max_wait_ms);
            }
        }
        true
    }
}

/// Trail the active player at a fixed distance.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowActivePlayer {
    pub follow_distance: f64,
    pub range: f64,
    last_player_tile: Option<IVec2>,
    target: Option<DVec2>,
    waiting: bool,
}

impl FollowActivePlayer {
    pub fn new(follow_distance: f64, range: f64) -> Self {
        Self {
            follow_distance,
            range,
            last_player_tile: None,
            target: None,
            waiting: false,
        }
    }

    pub fn target(&self) -> Option<DVec2> {
        self.target
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    fn execute(&mut self, body: &mut Body, ctx: &mut BehaviourCtx<'_>) -> bool {
        let Some(player) = ctx.player else {
            return false;
        };
        let to_player = player.position - body.position();
        if to_player.length_squared() > self.range * self.range {
            self.last_player_tile = None;
            self.target = None;
            return false;
        }

        if self.last_player_tile != Some(player.tile) {
            self.last_player_tile = Some(player.tile);
            self.target = Some(player.position - to_player.normalize_or_zero() * self.follow_distance);
            self.waiting = false;
        }

        if self.waiting {
            return true;
        }
        if let Some(target) = self.target {
            if walk_toward(body, ctx.store, target, ctx.speed) == Walk::Blocked {
                self.waiting = true;
            }
        }
        true
    }
}

/// One entry of a mob's behaviour chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Behaviour {
    RandomWander(RandomWander),
    FollowActivePlayer(FollowActivePlayer),
}

impl Behaviour {
    pub fn from_spec(spec: &BehaviourSpec) -> Self {
        match spec {
            BehaviourSpec::RandomWander {
                bounds,
                min_wait_ms,
                max_wait_ms,
            } => Behaviour::RandomWander(RandomWander::new(*bounds, *min_wait_ms, *max_wait_ms)),
            BehaviourSpec::FollowActivePlayer {
                follow_distance,
                range,
            } => Behaviour::FollowActivePlayer(FollowActivePlayer::new(*follow_distance, *range)),
        }
    }

    /// Run one tick; returns whether the behaviour executed.
    pub fn execute(&mut self, body: &mut Body, ctx: &mut BehaviourCtx<'_>) -> bool {
        match self {
            Behaviour::RandomWander(b) => b.execute(body, ctx),
            Behaviour::FollowActivePlayer(b) => b.execute(body, ctx),
        }
    }
}

/// Run the chain until one behaviour executes. Returns its index.
pub fn run_chain(
    behaviours: &mut [Behaviour],
    body: &mut Body,
    ctx: &mut BehaviourCtx<'_>,
) -> Option<usize> {
    behaviours
        .iter_mut()
        .position(|behaviour| behaviour.execute(body, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use verdant_core::{BuildingCategory, ContentRegistry};

    use crate::coords::TileRect;

    fn store() -> ChunkStore {
        ChunkStore::new(11, &ContentRegistry::builtin().unwrap())
    }

    fn flatten(store: &mut ChunkStore, radius: i32, terrain: Terrain) {
        for y in -radius..=radius {
            for x in -radius..=radius {
                let tile = store.tile_mut(x, y);
                tile.terrain = terrain;
                tile.resource = None;
            }
        }
    }

    #[test]
    fn wander_only_targets_allowed_terrain() {
        let mut store = store();
        flatten(&mut store, 6, Terrain::Sand);
        store.change_tile(IVec2::new(2, 1), Terrain::Grass);
        let mut rng = StdRng::seed_from_u64(1);
        let mut body = Body::new(tile_center(IVec2::ZERO), 8.0);
        let mut wander = RandomWander::new(3, 100.0, 200.0);

        let mut picked = false;
        for _ in 0..200 {
            let mut ctx = BehaviourCtx {
                store: &mut store,
                rng: &mut rng,
                player: None,
                allowed: &[Terrain::Grass],
                speed: 0.0,
                dt_ms: 16.0,
            };
            if wander.execute(&mut body, &mut ctx) {
                if let Some(target) = wander.target() {
                    assert_eq!(target, tile_center(IVec2::new(2, 1)));
                    picked = true;
                    break;
                }
            }
        }
        assert!(picked);
    }

    #[test]
    fn wander_gives_up_after_bounded_attempts() {
        let mut store = store();
        flatten(&mut store, 4, Terrain::Sand);
        let mut rng = StdRng::seed_from_u64(2);
        let mut body = Body::new(tile_center(IVec2::ZERO), 8.0);
        let mut wander = RandomWander::new(2, 0.0, 0.0);
        let mut ctx = BehaviourCtx {
            store: &mut store,
            rng: &mut rng,
            player: None,
            allowed: &[Terrain::Rock],
            speed: 1.0,
            dt_ms: 16.0,
        };
        assert!(!wander.execute(&mut body, &mut ctx));
        assert_eq!(body.position(), tile_center(IVec2::ZERO));
    }

    #[test]
    fn follow_yields_when_player_out_of_range() {
        let mut store = store();
        let mut rng = StdRng::seed_from_u64(3);
        let mut body = Body::new(DVec2::ZERO, 8.0);
        let mut follow = FollowActivePlayer::new(20.0, 100.0);
        let mut ctx = BehaviourCtx {
            store: &mut store,
            rng: &mut rng,
            player: Some(PlayerSnapshot {
                position: DVec2::new(500.0, 0.0),
                tile: IVec2::new(15, 0),
            }),
            allowed: &[Terrain::Grass],
            speed: 1.0,
            dt_ms: 16.0,
        };
        assert!(!follow.execute(&mut body, &mut ctx));
        ctx.player = None;
        assert!(!follow.execute(&mut body, &mut ctx));
    }

    #[test]
    fn follow_targets_point_short_of_player_and_waits_when_blocked() {
        let mut store = store();
        flatten(&mut store, 4, Terrain::Grass);
        let mut rng = StdRng::seed_from_u64(4);
        let start = tile_center(IVec2::ZERO);
        let mut body = Body::new(start, 8.0);
        let mut follow = FollowActivePlayer::new(20.0, 400.0);
        let player = PlayerSnapshot {
            position: start + DVec2::new(100.0, 0.0),
            tile: IVec2::new(3, 0),
        };

        // Wall off the tile right of the mob.
        assert!(store.place_building(
            BuildingCategory::Building,
            "fence",
            TileRect::from_size(IVec2::new(1, 0), 1, 1)
        ));

        let mut ctx = BehaviourCtx {
            store: &mut store,
            rng: &mut rng,
            player: Some(player),
            allowed: &[Terrain::Grass],
            speed: 20.0,
            dt_ms: 16.0,
        };
        assert!(follow.execute(&mut body, &mut ctx));
        assert_eq!(follow.target(), Some(start + DVec2::new(80.0, 0.0)));
        assert!(follow.is_waiting());
        assert_eq!(body.position(), start);

        // Waiting persists until the player changes tile.
        assert!(follow.execute(&mut body, &mut ctx));
        assert!(follow.is_waiting());

        ctx.player = Some(PlayerSnapshot {
            position: start + DVec2::new(0.0, 100.0),
            tile: IVec2::new(0, 3),
        });
        assert!(follow.execute(&mut body, &mut ctx));
        assert!(!follow.is_waiting());
        assert!(body.position().y > start.y);
    }

    #[test]
    fn chain_stops_at_first_executed() {
        let mut store = store();
        flatten(&mut store, 4, Terrain::Grass);
        let mut rng = StdRng::seed_from_u64(5);
        let mut body = Body::new(tile_center(IVec2::ZERO), 8.0);
        let mut chain = vec![
            Behaviour::FollowActivePlayer(FollowActivePlayer::new(10.0, 50.0)),
            Behaviour::RandomWander(RandomWander::new(2, 10.0, 20.0)),
        ];
        let mut ctx = BehaviourCtx {
            store: &mut store,
            rng: &mut rng,
            player: None,
            allowed: &[Terrain::Grass],
            speed: 1.0,
            dt_ms: 16.0,
        };
        assert_eq!(run_chain(&mut chain, &mut body, &mut ctx), Some(1));

        ctx.player = Some(PlayerSnapshot {
            position: body.position() + DVec2::new(30.0, 0.0),
            tile: IVec2::new(1, 0),
        });
        assert_eq!(run_chain(&mut chain, &mut body, &mut ctx), Some(0));
    }
}
