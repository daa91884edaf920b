//! Biome classification from elevation, temperature, and moisture.

use loam_blocks::BlockType;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiomeType {
    Ocean,
    Beach,
    Scorched,
    Bare,
    Tundra,
    Snow,
    TemperateDesert,
    Shrubland,
    Taiga,
    Grassland,
    TemperateDeciduousForest,
    TemperateRainforest,
    SubtropicalDesert,
    TropicalSeasonalForest,
    TropicalRainforest,
}

/// Static per-biome terrain and surface settings.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BiomeConfig {
    pub surface: BlockType,
    pub subsurface: BlockType,
    pub height_multiplier: f32,
    /// Offset from sea level, in blocks.
    pub base_height: f32,
    /// Chance per eligible column of starting a tree.
    pub tree_density: f32,
}

const fn cfg(
    surface: BlockType,
    subsurface: BlockType,
    height_multiplier: f32,
    base_height: f32,
    tree_density: f32,
) -> BiomeConfig {
    BiomeConfig {
        surface,
        subsurface,
        height_multiplier,
        base_height,
        tree_density,
    }
}

// Elevation bands.
const OCEAN_BELOW: f32 = 0.10;
const BEACH_BELOW: f32 = 0.15;
const PEAKS_ABOVE: f32 = 0.80;
const HIGHLANDS_ABOVE: f32 = 0.60;
// Temperature bands shared by the peak and lowland tables.
const COLD_BELOW: f32 = 0.35;
const WARM_BELOW: f32 = 0.65;

impl BiomeType {
    pub const ALL: [BiomeType; 15] = [
        BiomeType::Ocean,
        BiomeType::Beach,
        BiomeType::Scorched,
        BiomeType::Bare,
        BiomeType::Tundra,
        BiomeType::Snow,
        BiomeType::TemperateDesert,
        BiomeType::Shrubland,
        BiomeType::Taiga,
        BiomeType::Grassland,
        BiomeType::TemperateDeciduousForest,
        BiomeType::TemperateRainforest,
        BiomeType::SubtropicalDesert,
        BiomeType::TropicalSeasonalForest,
        BiomeType::TropicalRainforest,
    ];

    pub fn config(self) -> BiomeConfig {
        use BlockType as B;
        match self {
            BiomeType::Ocean => cfg(B::Sand, B::Gravel, 0.4, -14.0, 0.0),
            BiomeType::Beach => cfg(B::Sand, B::Sand, 0.2, 1.0, 0.0),
            BiomeType::Scorched => cfg(B::Gravel, B::Stone, 1.4, 30.0, 0.0),
            BiomeType::Bare => cfg(B::Stone, B::Stone, 1.3, 28.0, 0.0),
            BiomeType::Tundra => cfg(B::Snow, B::Dirt, 1.2, 26.0, 0.005),
            BiomeType::Snow => cfg(B::Snow, B::Stone, 1.5, 32.0, 0.0),
            BiomeType::TemperateDesert => cfg(B::Sand, B::Sand, 0.6, 10.0, 0.0),
            BiomeType::Shrubland => cfg(B::Grass, B::Dirt, 0.8, 12.0, 0.01),
            BiomeType::Taiga => cfg(B::Grass, B::Dirt, 1.0, 14.0, 0.05),
            BiomeType::Grassland => cfg(B::Grass, B::Dirt, 0.5, 6.0, 0.005),
            BiomeType::TemperateDeciduousForest => cfg(B::Grass, B::Dirt, 0.8, 8.0, 0.06),
            BiomeType::TemperateRainforest => cfg(B::Grass, B::Dirt, 0.9, 8.0, 0.08),
            BiomeType::SubtropicalDesert => cfg(B::RedSand, B::Sand, 0.5, 4.0, 0.0),
            BiomeType::TropicalSeasonalForest => cfg(B::Grass, B::Dirt, 0.7, 6.0, 0.05),
            BiomeType::TropicalRainforest => cfg(B::Grass, B::Dirt, 0.8, 6.0, 0.10),
        }
    }

    #[inline]
    pub fn is_desert(self) -> bool {
        matches!(
            self,
            BiomeType::TemperateDesert | BiomeType::SubtropicalDesert | BiomeType::Scorched
        )
    }
}

/// Fixed threshold table. All inputs are expected in `[0, 1]`.
pub fn determine_biome(elevation: f32, temperature: f32, moisture: f32) -> BiomeType {
    if elevation < OCEAN_BELOW {
        return BiomeType::Ocean;
    }
    if elevation < BEACH_BELOW {
        return BiomeType::Beach;
    }
    if elevation > PEAKS_ABOVE {
        return if temperature < 0.3 {
            BiomeType::Snow
        } else if temperature < 0.6 {
            BiomeType::Tundra
        } else if temperature < 0.8 {
            BiomeType::Bare
        } else {
            BiomeType::Scorched
        };
    }
    if elevation > HIGHLANDS_ABOVE || temperature < COLD_BELOW {
        return if moisture < 0.33 {
            BiomeType::TemperateDesert
        } else if moisture < 0.66 {
            BiomeType::Shrubland
        } else {
            BiomeType::Taiga
        };
    }
    if temperature < WARM_BELOW {
        if moisture < 0.16 {
            BiomeType::TemperateDesert
        } else if moisture < 0.50 {
            BiomeType::Grassland
        } else if moisture < 0.83 {
            BiomeType::TemperateDeciduousForest
        } else {
            BiomeType::TemperateRainforest
        }
    } else if moisture < 0.16 {
        BiomeType::SubtropicalDesert
    } else if moisture < 0.33 {
        BiomeType::Grassland
    } else if moisture < 0.66 {
        BiomeType::TropicalSeasonalForest
    } else {
        BiomeType::TropicalRainforest
    }
}

/// Per-chunk climate reading plus the biome settings it resolved to.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BiomeSample {
    pub biome: BiomeType,
    pub temperature: f32,
    pub moisture: f32,
    pub elevation: f32,
    pub surface_block: BlockType,
    pub subsurface_block: BlockType,
    pub height_multiplier: f32,
    pub base_height: f32,
    pub tree_density: f32,
}

impl BiomeSample {
    pub fn from_climate(elevation: f32, temperature: f32, moisture: f32) -> Self {
        let elevation = elevation.clamp(0.0, 1.0);
        let temperature = temperature.clamp(0.0, 1.0);
        let moisture = moisture.clamp(0.0, 1.0);
        let biome = determine_biome(elevation, temperature, moisture);
        let c = biome.config();
        Self {
            biome,
            temperature,
            moisture,
            elevation,
            surface_block: c.surface,
            subsurface_block: c.subsurface,
            height_multiplier: c.height_multiplier,
            base_height: c.base_height,
            tree_density: c.tree_density,
        }
    }

    /// Used by steps that run without a biome reading: temperate grassland.
    pub fn fallback() -> Self {
        Self::from_climate(0.4, 0.5, 0.4)
    }
}
