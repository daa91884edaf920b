//! World sizing, noise sampling, biomes, and worldgen parameters.
#![forbid(unsafe_code)]

pub mod biome;
pub mod noise;
pub mod voxel;
pub mod worldgen;

pub use biome::{BiomeConfig, BiomeSample, BiomeType, determine_biome};
pub use noise::{DomainWarp, Fractal, FractalMode, NoiseField, NoiseKind, NoiseParams};
pub use voxel::{CHUNK_HEIGHT, CHUNK_SIZE, ChunkCoord, NoiseSource, World};
pub use worldgen::{WorldGenConfig, WorldGenParams, load_params_from_path};
