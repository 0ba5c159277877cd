//! World, tile and chunk coordinate spaces.
//!
//! Continuous positions are `f64` world units. Their integer form is always
//! `floor(continuous)`, and the tile index is always
//! `floor_div(integer, TILE_SIZE)`. Both conversions floor toward negative
//! infinity; truncation would fold tiles -1 and 0 together.

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

/// Edge length of one tile in world units.
pub const TILE_SIZE: i32 = 32;

/// Edge length of one chunk in tiles.
pub const CHUNK_SIZE: i32 = 64;

/// Tiles per chunk.
pub const CHUNK_AREA: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Integer division rounding toward negative infinity.
#[inline]
pub fn floor_div(value: i32, divisor: i32) -> i32 {
    value.div_euclid(divisor)
}

/// Tile index containing an integer world coordinate.
#[inline]
pub fn world_to_tile(world: i32) -> i32 {
    floor_div(world, TILE_SIZE)
}

/// Chunk index containing a tile coordinate.
#[inline]
pub fn tile_to_chunk(tile: i32) -> i32 {
    floor_div(tile, CHUNK_SIZE)
}

/// Position of a tile inside its chunk (always `0..CHUNK_SIZE`).
#[inline]
pub fn tile_to_local(tile: i32) -> usize {
    tile.rem_euclid(CHUNK_SIZE) as usize
}

/// World-space centre of a tile.
pub fn tile_center(tile: IVec2) -> DVec2 {
    DVec2::new(
        (tile.x * TILE_SIZE) as f64 + TILE_SIZE as f64 / 2.0,
        (tile.y * TILE_SIZE) as f64 + TILE_SIZE as f64 / 2.0,
    )
}

/// Tile containing a continuous world position.
pub fn tile_of(position: DVec2) -> IVec2 {
    let world = position.floor().as_ivec2();
    IVec2::new(world_to_tile(world.x), world_to_tile(world.y))
}

/// Chebyshev (max-axis) distance between two tiles.
pub fn chebyshev(a: IVec2, b: IVec2) -> i32 {
    let d = (a - b).abs();
    d.x.max(d.y)
}

/// Chunk coordinate (X, Y) in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap (sorts by x, then y).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing the given tile.
    pub fn from_tile(tile_x: i32, tile_y: i32) -> Self {
        Self::new(tile_to_chunk(tile_x), tile_to_chunk(tile_y))
    }

    /// Tile coordinate of this chunk's top-left corner.
    pub fn origin_tile(self) -> IVec2 {
        IVec2::new(self.x * CHUNK_SIZE, self.y * CHUNK_SIZE)
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A positioned object's location in all three forms.
///
/// Only [`WorldPos::set`] writes the fields, so the integer and tile forms can
/// never drift from the continuous one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    continuous: DVec2,
    integer: IVec2,
    tile: IVec2,
}

impl WorldPos {
    pub fn new(position: DVec2) -> Self {
        let mut pos = Self {
            continuous: DVec2::ZERO,
            integer: IVec2::ZERO,
            tile: IVec2::ZERO,
        };
        pos.set(position);
        pos
    }

    /// Move to a new continuous position and refresh the derived forms.
    pub fn set(&mut self, position: DVec2) {
        self.continuous = position;
        self.integer = position.floor().as_ivec2();
        self.tile = IVec2::new(world_to_tile(self.integer.x), world_to_tile(self.integer.y));
    }

    #[inline]
    pub fn continuous(&self) -> DVec2 {
        self.continuous
    }

    #[inline]
    pub fn integer(&self) -> IVec2 {
        self.integer
    }

    #[inline]
    pub fn tile(&self) -> IVec2 {
        self.tile
    }
}

/// Inclusive rectangle of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRect {
    pub top_left: IVec2,
    pub bottom_right: IVec2,
}

impl TileRect {
    pub fn new(top_left: IVec2, bottom_right: IVec2) -> Self {
        Self {
            top_left: top_left.min(bottom_right),
            bottom_right: top_left.max(bottom_right),
        }
    }

    /// Rectangle of `width` x `height` tiles anchored at its top-left tile.
    pub fn from_size(top_left: IVec2, width: u32, height: u32) -> Self {
        let size = IVec2::new(width.max(1) as i32 - 1, height.max(1) as i32 - 1);
        Self::new(top_left, top_left + size)
    }

    /// Tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = IVec2> + '_ {
        (self.top_left.y..=self.bottom_right.y).flat_map(move |y| {
            (self.top_left.x..=self.bottom_right.x).map(move |x| IVec2::new(x, y))
        })
    }

    pub fn area(&self) -> usize {
        let d = self.bottom_right - self.top_left + IVec2::ONE;
        (d.x as usize) * (d.y as usize)
    }
}
