//! Terrain generation from two coherent-noise fields.
//!
//! The region field picks a biome classifier, the tile field is then fed
//! through that classifier's threshold table. A per-tile hash sprinkles
//! decorations on top.

use glam::IVec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use verdant_core::{Decoration, Terrain};

use crate::chunk::{Chunk, Tile};
use crate::coords::{ChunkPos, CHUNK_AREA, CHUNK_SIZE};
use crate::noise::{tile_hash, NoiseConfig, NoiseGenerator, NoiseLayer};

/// Region value below which the Sea classifier applies.
pub const SEA_THRESHOLD: f64 = 0.42;
/// Region value above which the Rocky classifier applies.
pub const ROCKY_THRESHOLD: f64 = 0.58;

/// Chance a grass/meadow tile grows a tree.
pub const TREE_DENSITY: f64 = 0.05;
/// Chance a grass tile grows a bush (after the tree roll).
pub const BUSH_DENSITY: f64 = 0.02;
/// Chance a rock tile carries an ore vein.
pub const ORE_DENSITY: f64 = 0.06;
/// Chance a gravel tile carries a boulder.
pub const BOULDER_DENSITY: f64 = 0.04;

/// Biome classifier chosen by the region field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiomeClass {
    Rocky,
    Sea,
    Plains,
}

impl BiomeClass {
    /// Pick the classifier for a region value in `[0, 1]`.
    pub fn from_region(region: f64) -> Self {
        if region < SEA_THRESHOLD {
            BiomeClass::Sea
        } else if region > ROCKY_THRESHOLD {
            BiomeClass::Rocky
        } else {
            BiomeClass::Plains
        }
    }

    /// Upper bounds (exclusive) paired with the terrain they select.
    fn thresholds(self) -> &'static [(f64, Terrain)] {
        match self {
            BiomeClass::Sea => &[
                (0.45, Terrain::DeepWater),
                (0.56, Terrain::Water),
                (f64::INFINITY, Terrain::Sand),
            ],
            BiomeClass::Plains => &[
                (0.30, Terrain::Water),
                (0.36, Terrain::Sand),
                (0.60, Terrain::Grass),
                (0.70, Terrain::Meadow),
                (f64::INFINITY, Terrain::Dirt),
            ],
            BiomeClass::Rocky => &[
                (0.36, Terrain::Gravel),
                (0.45, Terrain::Dirt),
                (f64::INFINITY, Terrain::Rock),
            ],
        }
    }

    /// Terrain for a tile value in `[0, 1]`.
    pub fn classify(self, tile: f64) -> Terrain {
        self.thresholds()
            .iter()
            .find(|(bound, _)| tile < *bound)
            .map(|(_, terrain)| *terrain)
            .unwrap_or(Terrain::Rock)
    }
}

/// Terrain generator that fills chunks with tiles.
pub struct TerrainGenerator {
    world_seed: u64,
    tile_noise: NoiseGenerator,
    region_noise: NoiseGenerator,
}

impl TerrainGenerator {
    /// Create a new terrain generator from world seed.
    pub fn new(world_seed: u64) -> Self {
        let noise_seed = (world_seed ^ (world_seed >> 32)) as u32;
        Self {
            world_seed,
            tile_noise: NoiseGenerator::new(NoiseConfig::for_layer(NoiseLayer::Tile, noise_seed)),
            region_noise: NoiseGenerator::new(NoiseConfig::for_layer(
                NoiseLayer::Region,
                noise_seed,
            )),
        }
    }

    pub fn seed(&self) -> u64 {
        self.world_seed
    }

    /// Biome classifier at a tile.
    pub fn biome_at(&self, tile_x: i32, tile_y: i32) -> BiomeClass {
        BiomeClass::from_region(self.region_noise.sample_tile(tile_x, tile_y))
    }

    /// Terrain id at a tile.
    pub fn terrain_at(&self, tile_x: i32, tile_y: i32) -> Terrain {
        let biome = self.biome_at(tile_x, tile_y);
        biome.classify(self.tile_noise.sample_tile(tile_x, tile_y))
    }

    /// Decoration at a tile with the given terrain.
    pub fn decoration_at(&self, tile_x: i32, tile_y: i32, terrain: Terrain) -> Option<Decoration> {
        let roll = tile_hash(self.world_seed.wrapping_add(0xDEC0), tile_x, tile_y);
        match terrain {
            Terrain::Grass if roll < TREE_DENSITY => Some(Decoration::Tree),
            Terrain::Grass if roll < TREE_DENSITY + BUSH_DENSITY => Some(Decoration::Bush),
            Terrain::Meadow if roll < TREE_DENSITY => Some(Decoration::Tree),
            Terrain::Rock if roll < ORE_DENSITY => Some(Decoration::Ore),
            Terrain::Gravel if roll < BOULDER_DENSITY => Some(Decoration::Boulder),
            _ => None,
        }
    }

    /// Generate terrain for a chunk at the given position.
    ///
    /// Pure: the same seed and position always give the same tiles.
    #[instrument(skip(self), fields(chunk_pos = %chunk_pos, world_seed = self.world_seed))]
    pub fn generate_chunk(&self, chunk_pos: ChunkPos) -> Chunk {
        let origin = chunk_pos.origin_tile();
        let mut tiles = Vec::with_capacity(CHUNK_AREA);
        let mut decorated = 0usize;

        for local_y in 0..CHUNK_SIZE {
            for local_x in 0..CHUNK_SIZE {
                let pos = origin + IVec2::new(local_x, local_y);
                let terrain = self.terrain_at(pos.x, pos.y);
                let mut tile = Tile::new(pos, terrain);
                tile.decoration = self.decoration_at(pos.x, pos.y, terrain);
                if tile.decoration.is_some() {
                    decorated += 1;
                }
                tiles.push(tile);
            }
        }

        debug!(decorated, "Terrain generation complete");
        Chunk::from_tiles(chunk_pos, tiles)
    }
}

/// Generate one chunk with a throwaway generator.
pub fn generate(seed: u64, chunk_x: i32, chunk_y: i32) -> Chunk {
    TerrainGenerator::new(seed).generate_chunk(ChunkPos::new(chunk_x, chunk_y))
}
