pub mod chunk_coord;
pub mod noise_source;
pub mod world;

pub use chunk_coord::ChunkCoord;
pub use noise_source::NoiseSource;
pub use world::World;

/// Horizontal chunk edge length in blocks.
pub const CHUNK_SIZE: usize = 16;
/// Fixed column height of every chunk.
pub const CHUNK_HEIGHT: usize = 128;
