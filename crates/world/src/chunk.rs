use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};
use verdant_core::{BuildingCategory, Decoration, ResourceDef, ResourceTag, Terrain};

use crate::coords::{tile_center, tile_to_local, ChunkPos, CHUNK_AREA, CHUNK_SIZE};

/// Resource occupying a tile (tree, boulder, bush...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceOccupant {
    /// Resource definition id.
    pub id: String,
    /// Primary tag, decides the tool action.
    pub tag: ResourceTag,
    /// Squared collision radius.
    pub hit_radius_sq: f64,
}

impl ResourceOccupant {
    pub fn from_def(def: &ResourceDef) -> Self {
        Self {
            id: def.id.clone(),
            tag: def.tag,
            hit_radius_sq: def.hit_radius * def.hit_radius,
        }
    }
}

/// A structure stamped onto a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingOccupant {
    /// Building definition id.
    pub key: String,
    /// Occupancy category.
    pub category: BuildingCategory,
}

/// One grid cell of the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pos: IVec2,
    /// Terrain id; only changed through the chunk store.
    pub terrain: Terrain,
    /// Decoration placed by world generation.
    pub decoration: Option<Decoration>,
    /// Resource standing on the tile.
    pub resource: Option<ResourceOccupant>,
    buildings: Vec<BuildingOccupant>,
}

impl Tile {
    pub fn new(pos: IVec2, terrain: Terrain) -> Self {
        Self {
            pos,
            terrain,
            decoration: None,
            resource: None,
            buildings: Vec::new(),
        }
    }

    /// Absolute tile coordinate.
    pub fn pos(&self) -> IVec2 {
        self.pos
    }

    /// World-space centre of the tile.
    pub fn center(&self) -> DVec2 {
        tile_center(self.pos)
    }

    /// Building occupants in placement order.
    pub fn buildings(&self) -> &[BuildingOccupant] {
        &self.buildings
    }

    /// Whether a Building-category occupant blocks the tile.
    pub fn is_blocked(&self) -> bool {
        self.buildings
            .iter()
            .any(|b| b.category == BuildingCategory::Building)
    }

    /// Whether an occupant of `category` may be stamped here.
    ///
    /// Buildings need an empty, dry tile without a resource. Stations only
    /// need dry ground that no Building-category occupant blocks.
    pub fn can_place(&self, category: BuildingCategory) -> bool {
        if !self.terrain.is_buildable() || self.is_blocked() {
            return false;
        }
        match category {
            BuildingCategory::Building => self.resource.is_none() && self.buildings.is_empty(),
            BuildingCategory::Station => true,
        }
    }

    /// Stamp an occupant; refuses a second Building-category occupant.
    pub fn add_building(&mut self, occupant: BuildingOccupant) -> bool {
        if occupant.category == BuildingCategory::Building && self.is_blocked() {
            return false;
        }
        self.buildings.push(occupant);
        true
    }
}

/// Square grid of tiles, side [`CHUNK_SIZE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    position: ChunkPos,
    tiles: Vec<Tile>,
}

impl Chunk {
    /// Build a chunk from row-major tiles. `tiles.len()` must equal [`CHUNK_AREA`].
    pub fn from_tiles(position: ChunkPos, tiles: Vec<Tile>) -> Self {
        debug_assert_eq!(tiles.len(), CHUNK_AREA);
        Self { position, tiles }
    }

    pub fn position(&self) -> ChunkPos {
        self.position
    }

    fn index(tile_x: i32, tile_y: i32) -> usize {
        tile_to_local(tile_y) * CHUNK_SIZE as usize + tile_to_local(tile_x)
    }

    /// Tile at an absolute coordinate that lies inside this chunk.
    pub fn tile(&self, tile_x: i32, tile_y: i32) -> &Tile {
        debug_assert_eq!(ChunkPos::from_tile(tile_x, tile_y), self.position);
        &self.tiles[Self::index(tile_x, tile_y)]
    }

    pub fn tile_mut(&mut self, tile_x: i32, tile_y: i32) -> &mut Tile {
        debug_assert_eq!(ChunkPos::from_tile(tile_x, tile_y), self.position);
        &mut self.tiles[Self::index(tile_x, tile_y)]
    }

    /// Row-major tiles.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    /// Row-major terrain ids; used to compare generations.
    pub fn terrain_grid(&self) -> Vec<Terrain> {
        self.tiles.iter().map(|t| t.terrain).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_chunk(pos: ChunkPos, terrain: Terrain) -> Chunk {
        let origin = pos.origin_tile();
        let mut tiles = Vec::with_capacity(CHUNK_AREA);
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                tiles.push(Tile::new(origin + IVec2::new(x, y), terrain));
            }
        }
        Chunk::from_tiles(pos, tiles)
    }

    #[test]
    fn tile_lookup_handles_negative_chunks() {
        let chunk = flat_chunk(ChunkPos::new(-1, -1), Terrain::Grass);
        assert_eq!(chunk.tile(-1, -1).pos(), IVec2::new(-1, -1));
        assert_eq!(chunk.tile(-64, -64).pos(), IVec2::new(-64, -64));
        assert_eq!(chunk.tile(-33, -2).pos(), IVec2::new(-33, -2));
    }

    #[test]
    fn only_one_blocking_building_per_tile() {
        let mut tile = Tile::new(IVec2::ZERO, Terrain::Grass);
        let cabin = BuildingOccupant {
            key: "cabin".into(),
            category: BuildingCategory::Building,
        };
        assert!(tile.add_building(cabin.clone()));
        assert!(!tile.add_building(cabin));
        assert!(tile.add_building(BuildingOccupant {
            key: "workbench".into(),
            category: BuildingCategory::Station,
        }));
        assert_eq!(tile.buildings().len(), 2);
        assert!(tile.is_blocked());
    }

    #[test]
    fn stations_stack_but_water_is_never_buildable() {
        let mut tile = Tile::new(IVec2::ZERO, Terrain::Dirt);
        tile.add_building(BuildingOccupant {
            key: "workbench".into(),
            category: BuildingCategory::Station,
        });
        assert!(tile.can_place(BuildingCategory::Station));
        assert!(!tile.can_place(BuildingCategory::Building));

        let water = Tile::new(IVec2::ZERO, Terrain::Water);
        assert!(!water.can_place(BuildingCategory::Station));
    }
}
