//! Terrain identifiers shared by the generator, content tables and actions.

use serde::{Deserialize, Serialize};

/// Concrete terrain type of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Open sea, never walkable.
    DeepWater,
    /// Shallow water.
    Water,
    /// Beach sand.
    Sand,
    /// Grass.
    Grass,
    /// Tall meadow grass.
    Meadow,
    /// Bare dirt.
    Dirt,
    /// Tilled farm land.
    FarmLand,
    /// Loose gravel.
    Gravel,
    /// Solid rock.
    Rock,
}

impl Terrain {
    /// Every terrain id, in declaration order.
    pub const ALL: [Terrain; 9] = [
        Terrain::DeepWater,
        Terrain::Water,
        Terrain::Sand,
        Terrain::Grass,
        Terrain::Meadow,
        Terrain::Dirt,
        Terrain::FarmLand,
        Terrain::Gravel,
        Terrain::Rock,
    ];

    /// Canonical lowercase key for configs/logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Terrain::DeepWater => "deep_water",
            Terrain::Water => "water",
            Terrain::Sand => "sand",
            Terrain::Grass => "grass",
            Terrain::Meadow => "meadow",
            Terrain::Dirt => "dirt",
            Terrain::FarmLand => "farm_land",
            Terrain::Gravel => "gravel",
            Terrain::Rock => "rock",
        }
    }

    /// Parse a terrain id from its key (case-insensitive).
    pub fn parse(input: &str) -> Option<Self> {
        let key = input.trim().to_lowercase();
        Terrain::ALL.into_iter().find(|t| t.as_str() == key)
    }

    /// Water of any depth.
    pub fn is_water(self) -> bool {
        matches!(self, Terrain::Water | Terrain::DeepWater)
    }

    /// Whether structures can be stamped onto this terrain.
    pub fn is_buildable(self) -> bool {
        !self.is_water()
    }

    /// Terrain the farm action flips this tile to, if it can be farmed.
    pub fn farm_toggle(self) -> Option<Terrain> {
        match self {
            Terrain::Grass | Terrain::Meadow | Terrain::Dirt => Some(Terrain::FarmLand),
            Terrain::FarmLand => Some(Terrain::Grass),
            _ => None,
        }
    }
}

/// Decoration tag placed by world generation; resolved to a resource occupant
/// when the chunk is first materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decoration {
    /// A tree on grassland.
    Tree,
    /// A bush or wild plant.
    Bush,
    /// An ore vein in rock.
    Ore,
    /// A loose boulder.
    Boulder,
}
