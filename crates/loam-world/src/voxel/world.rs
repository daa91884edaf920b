use std::sync::Arc;

use crate::worldgen::WorldGenParams;

use super::{CHUNK_HEIGHT, CHUNK_SIZE, ChunkCoord, NoiseSource};

/// Process-wide seed, chunk dimensions, and worldgen parameters.
pub struct World {
    pub chunk_size_x: usize,
    pub chunk_size_y: usize,
    pub chunk_size_z: usize,
    pub seed: i32,
    pub gen_params: Arc<WorldGenParams>,
}

impl World {
    pub fn new(seed: i32, params: WorldGenParams) -> Self {
        Self::with_dims(CHUNK_SIZE, CHUNK_HEIGHT, CHUNK_SIZE, seed, params)
    }

    /// Non-standard chunk sizes; mostly useful for small test worlds.
    pub fn with_dims(sx: usize, sy: usize, sz: usize, seed: i32, params: WorldGenParams) -> Self {
        Self {
            chunk_size_x: sx,
            chunk_size_y: sy,
            chunk_size_z: sz,
            seed,
            gen_params: Arc::new(params),
        }
    }

    #[inline]
    pub fn sea_level(&self) -> i32 {
        self.gen_params.sea_level(self.chunk_size_y)
    }

    #[inline]
    pub fn chunk_of_world(&self, wx: i32, wz: i32) -> ChunkCoord {
        debug_assert_eq!(self.chunk_size_x, self.chunk_size_z);
        ChunkCoord::containing(wx, wz, self.chunk_size_x)
    }

    #[inline]
    pub fn chunk_origin(&self, coord: ChunkCoord) -> (i32, i32) {
        (
            coord.cx * self.chunk_size_x as i32,
            coord.cz * self.chunk_size_z as i32,
        )
    }

    pub fn make_noise_source(&self) -> NoiseSource {
        NoiseSource::new(self.seed, &self.gen_params)
    }
}
