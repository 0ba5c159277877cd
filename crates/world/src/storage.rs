use std::collections::BTreeMap;

use glam::{DVec2, IVec2};
use tracing::{debug, info};
use verdant_core::{BuildingCategory, ContentRegistry, Decoration, Terrain};

use crate::chunk::{BuildingOccupant, Chunk, ResourceOccupant, Tile};
use crate::coords::{tile_of, ChunkPos, TileRect};
use crate::terrain::TerrainGenerator;

/// Lazily generated, memoized chunk cache.
/// Uses BTreeMap for deterministic iteration order.
pub struct ChunkStore {
    generator: TerrainGenerator,
    /// Chunks keyed by floor-divided chunk position.
    chunks: BTreeMap<ChunkPos, Chunk>,
    /// Resource placed for each generated decoration.
    decoration_resources: BTreeMap<Decoration, ResourceOccupant>,
    generated: u64,
}

impl ChunkStore {
    /// Create a store for `seed`, resolving decorations through `content`.
    pub fn new(seed: u64, content: &ContentRegistry) -> Self {
        let decoration_resources = [
            Decoration::Tree,
            Decoration::Bush,
            Decoration::Ore,
            Decoration::Boulder,
        ]
        .into_iter()
        .filter_map(|d| {
            content
                .resource_for_decoration(d)
                .map(|def| (d, ResourceOccupant::from_def(def)))
        })
        .collect();

        Self {
            generator: TerrainGenerator::new(seed),
            chunks: BTreeMap::new(),
            decoration_resources,
            generated: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.generator.seed()
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true when no chunks are currently stored.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total chunks generated since construction, across reseeds.
    pub fn generated_chunks(&self) -> u64 {
        self.generated
    }

    /// Iterate over currently resident chunk positions.
    pub fn iter_positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.chunks.keys().copied()
    }

    /// Obtain a chunk by position, generating it on first access.
    pub fn ensure_chunk(&mut self, pos: ChunkPos) -> &mut Chunk {
        let Self {
            generator,
            chunks,
            decoration_resources,
            generated,
        } = self;
        chunks.entry(pos).or_insert_with(|| {
            *generated += 1;
            materialize(generator, decoration_resources, pos)
        })
    }

    /// Chunk containing a tile coordinate.
    pub fn chunk(&mut self, tile_x: i32, tile_y: i32) -> &Chunk {
        self.ensure_chunk(ChunkPos::from_tile(tile_x, tile_y))
    }

    /// Tile at an absolute coordinate.
    pub fn tile(&mut self, tile_x: i32, tile_y: i32) -> &Tile {
        self.ensure_chunk(ChunkPos::from_tile(tile_x, tile_y))
            .tile(tile_x, tile_y)
    }

    pub fn tile_mut(&mut self, tile_x: i32, tile_y: i32) -> &mut Tile {
        self.ensure_chunk(ChunkPos::from_tile(tile_x, tile_y))
            .tile_mut(tile_x, tile_y)
    }

    /// Tile at a coordinate whose chunk is already resident.
    pub fn peek_tile(&self, tile_x: i32, tile_y: i32) -> Option<&Tile> {
        self.chunks
            .get(&ChunkPos::from_tile(tile_x, tile_y))
            .map(|chunk| chunk.tile(tile_x, tile_y))
    }

    /// Terrain at a tile.
    pub fn terrain(&mut self, tile: IVec2) -> Terrain {
        self.tile(tile.x, tile.y).terrain
    }

    /// Tiles of an inclusive rectangle, row-major.
    pub fn range(&mut self, top_left: IVec2, bottom_right: IVec2) -> Vec<&Tile> {
        let rect = TileRect::new(top_left, bottom_right);
        let first = ChunkPos::from_tile(rect.top_left.x, rect.top_left.y);
        let last = ChunkPos::from_tile(rect.bottom_right.x, rect.bottom_right.y);
        for cy in first.y..=last.y {
            for cx in first.x..=last.x {
                self.ensure_chunk(ChunkPos::new(cx, cy));
            }
        }

        let chunks = &self.chunks;
        rect.tiles()
            .filter_map(|t| {
                chunks
                    .get(&ChunkPos::from_tile(t.x, t.y))
                    .map(|chunk| chunk.tile(t.x, t.y))
            })
            .collect()
    }

    /// Whether every tile of `rect` accepts an occupant of `category`.
    pub fn can_place(&mut self, category: BuildingCategory, rect: TileRect) -> bool {
        self.range(rect.top_left, rect.bottom_right)
            .iter()
            .all(|tile| tile.can_place(category))
    }

    /// Stamp a building occupant on every tile of `rect`.
    ///
    /// Validates the whole footprint first; nothing is stamped when any tile
    /// refuses.
    pub fn place_building(&mut self, category: BuildingCategory, key: &str, rect: TileRect) -> bool {
        if !self.can_place(category, rect) {
            debug!(key, ?rect, "Building placement rejected");
            return false;
        }
        for pos in rect.tiles() {
            self.tile_mut(pos.x, pos.y).add_building(BuildingOccupant {
                key: key.to_string(),
                category,
            });
        }
        info!(key, ?category, tiles = rect.area(), "Placed building");
        true
    }

    /// Swap the terrain id of one tile in place.
    pub fn change_tile(&mut self, tile: IVec2, terrain: Terrain) {
        let slot = self.tile_mut(tile.x, tile.y);
        debug!(tile = ?tile, from = ?slot.terrain, to = ?terrain, "Changed tile");
        slot.terrain = terrain;
    }

    /// Remove and return the resource occupant of a tile.
    pub fn take_resource(&mut self, tile: IVec2) -> Option<ResourceOccupant> {
        let slot = self.tile_mut(tile.x, tile.y);
        slot.decoration = None;
        slot.resource.take()
    }

    /// Resources whose tile lies within `radius` tiles of `center`, as
    /// `(tile, occupant)` pairs in row-major order.
    pub fn resources_near(&mut self, center: IVec2, radius: i32) -> Vec<(IVec2, ResourceOccupant)> {
        let offset = IVec2::splat(radius.max(0));
        self.range(center - offset, center + offset)
            .into_iter()
            .filter_map(|tile| tile.resource.clone().map(|r| (tile.pos(), r)))
            .collect()
    }

    /// Whether an entity may move to `to`.
    ///
    /// Returns false when the destination tile holds a Building-category
    /// occupant.
    pub fn validate_movement(&mut self, to: DVec2) -> bool {
        let tile = tile_of(to);
        !self.tile(tile.x, tile.y).is_blocked()
    }

    /// Replace the generator. With `discard`, every cached chunk is dropped
    /// and regenerated from the new seed on next access.
    pub fn reseed(&mut self, seed: u64, discard: bool) {
        self.generator = TerrainGenerator::new(seed);
        let dropped = if discard {
            let n = self.chunks.len();
            self.chunks.clear();
            n
        } else {
            0
        };
        info!(seed, discard, dropped, "Reseeded terrain generator");
    }
}

/// Generate a chunk and turn its decorations into resource occupants.
fn materialize(
    generator: &TerrainGenerator,
    decoration_resources: &BTreeMap<Decoration, ResourceOccupant>,
    pos: ChunkPos,
) -> Chunk {
    let mut chunk = generator.generate_chunk(pos);
    let mut resources = 0usize;
    for tile in chunk.tiles_mut() {
        if let Some(resource) = tile
            .decoration
            .and_then(|decoration| decoration_resources.get(&decoration))
        {
            tile.resource = Some(resource.clone());
            resources += 1;
        }
    }
    debug!(chunk = %pos, resources, "Materialized chunk");
    chunk
}
