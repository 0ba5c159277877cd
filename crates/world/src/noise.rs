//! Noise generation utilities for terrain generation.
//!
//! Provides the deterministic coherent-noise fields sampled by the terrain
//! generator. Every field is a seeded [`Perlin`] evaluated at absolute tile
//! coordinates, so neighbouring chunks agree at their seams.

use noise::{NoiseFn, Perlin};

/// Noise layer type for different terrain features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseLayer {
    /// Fine-grained field that picks a terrain id inside a biome.
    Tile,
    /// Coarse field that picks the biome classifier.
    Region,
}

/// Configuration for multi-octave noise generation.
#[derive(Debug, Clone)]
pub struct NoiseConfig {
    /// Number of octaves (layers of detail)
    pub octaves: u32,
    /// Frequency multiplier between octaves
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves (persistence)
    pub persistence: f64,
    /// Tile coordinates are divided by this before sampling
    pub divisor: f64,
    /// Seed for deterministic generation
    pub seed: u32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            divisor: 32.0,
            seed: 0,
        }
    }
}

impl NoiseConfig {
    /// Config for one of the generator's layers.
    pub fn for_layer(layer: NoiseLayer, seed: u32) -> Self {
        match layer {
            NoiseLayer::Tile => Self::tile(seed),
            NoiseLayer::Region => Self::region(seed),
        }
    }

    /// Tile noise: medium features such as ponds and clearings.
    pub fn tile(seed: u32) -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            divisor: 24.0,
            seed,
        }
    }

    /// Region noise: large biome-scale areas.
    pub fn region(seed: u32) -> Self {
        Self {
            octaves: 2,
            lacunarity: 2.0,
            persistence: 0.5,
            divisor: 160.0,
            seed: seed.wrapping_add(1000), // Offset seed
        }
    }
}

/// Noise generator using Perlin noise.
pub struct NoiseGenerator {
    perlin: Perlin,
    config: NoiseConfig,
}

impl NoiseGenerator {
    /// Create a new noise generator with the given configuration.
    pub fn new(config: NoiseConfig) -> Self {
        Self {
            perlin: Perlin::new(config.seed),
            config,
        }
    }

    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    /// Generate noise value at 2D coordinates with multi-octave sampling.
    ///
    /// Returns value in range [-1.0, 1.0].
    pub fn sample_2d(&self, x: f64, y: f64) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0 / self.config.divisor;
        let mut max_value = 0.0;

        for _ in 0..self.config.octaves {
            value += self.perlin.get([x * frequency, y * frequency]) * amplitude;
            max_value += amplitude;

            amplitude *= self.config.persistence;
            frequency *= self.config.lacunarity;
        }

        // Normalize to [-1.0, 1.0]
        (value / max_value).clamp(-1.0, 1.0)
    }

    /// Sample noise at a tile and map it to `[0.0, 1.0]`.
    pub fn sample_tile(&self, tile_x: i32, tile_y: i32) -> f64 {
        // Offset by half a tile: Perlin is zero on every integer lattice point.
        let noise = self.sample_2d(tile_x as f64 + 0.5, tile_y as f64 + 0.5);
        (noise + 1.0) * 0.5
    }
}

/// Stateless per-tile hash in `[0.0, 1.0)`, used for sparse decorations.
pub fn tile_hash(seed: u64, tile_x: i32, tile_y: i32) -> f64 {
    let mut h = seed ^ 0x9E37_79B9_7F4A_7C15;
    h ^= (tile_x as i64 as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = h.rotate_left(31);
    h ^= (tile_y as i64 as u64).wrapping_mul(0x94D0_49BB_1331_11EB);
    // splitmix64 finalizer
    h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 31;
    (h >> 11) as f64 / (1u64 << 53) as f64
}
