//! Chunk buffer and the chunk generation pipeline.
#![forbid(unsafe_code)]

mod buf;
mod error;
mod pipeline;
pub mod steps;
mod store;

pub use buf::ChunkBuf;
pub use error::GenerationError;
pub use pipeline::{GenerationPipeline, GenerationStep, GeneratorContext, StepTiming};
pub use store::{CellPos, ChunkStore};

use loam_world::{BiomeSample, ChunkCoord, NoiseSource, World};

#[derive(Clone, Debug)]
pub struct ChunkGenerateResult {
    pub buf: ChunkBuf,
    pub biome: Option<BiomeSample>,
    pub timings: Vec<StepTiming>,
}

/// Generate one chunk with the given pipeline and a noise source built for `world`.
pub fn generate_chunk_buffer(
    world: &World,
    coord: ChunkCoord,
    noise: &NoiseSource,
    pipeline: &GenerationPipeline,
) -> Result<ChunkGenerateResult, GenerationError> {
    let mut ctx = GeneratorContext::new(world, coord, noise);
    let timings = pipeline.run(&mut ctx)?;
    Ok(ChunkGenerateResult {
        buf: ctx.buf,
        biome: ctx.biome,
        timings,
    })
}
