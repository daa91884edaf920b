use std::time::Instant;

use loam_world::{BiomeSample, ChunkCoord, NoiseSource, World, WorldGenParams};

use crate::error::GenerationError;
use crate::steps::{BiomeStep, CaveStep, TerrainStep, TreeStep};
use crate::ChunkBuf;

/// Per-chunk state threaded through the pipeline. The grid is owned here
/// until the pipeline hands it back.
pub struct GeneratorContext<'a> {
    pub buf: ChunkBuf,
    pub coord: ChunkCoord,
    pub seed: i32,
    pub noise: &'a NoiseSource,
    pub params: &'a WorldGenParams,
    /// Written by the biome step; later steps fall back to a default when unset.
    pub biome: Option<BiomeSample>,
}

impl<'a> GeneratorContext<'a> {
    pub fn new(world: &'a World, coord: ChunkCoord, noise: &'a NoiseSource) -> Self {
        Self {
            buf: ChunkBuf::new(
                coord,
                world.chunk_size_x,
                world.chunk_size_y,
                world.chunk_size_z,
            ),
            coord,
            seed: world.seed,
            noise,
            params: world.gen_params.as_ref(),
            biome: None,
        }
    }

    /// Wrap an existing grid, e.g. to run a single step against hand-built terrain.
    pub fn with_buf(
        buf: ChunkBuf,
        seed: i32,
        noise: &'a NoiseSource,
        params: &'a WorldGenParams,
    ) -> Self {
        Self {
            coord: buf.coord,
            buf,
            seed,
            noise,
            params,
            biome: None,
        }
    }

    #[inline]
    pub fn origin(&self) -> (i32, i32) {
        (
            self.coord.cx * self.buf.sx as i32,
            self.coord.cz * self.buf.sz as i32,
        )
    }

    #[inline]
    pub fn biome_or_default(&self) -> BiomeSample {
        self.biome.unwrap_or_else(BiomeSample::fallback)
    }

    #[inline]
    pub fn sea_level(&self) -> i32 {
        self.params
            .sea_level(self.buf.sy)
            .min(self.buf.sy as i32 - 1)
    }
}

/// One stateless stage of chunk generation.
pub trait GenerationStep: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(&self, ctx: &mut GeneratorContext<'_>) -> Result<(), GenerationError>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StepTiming {
    pub step: &'static str,
    pub micros: u64,
}

/// Fixed, ordered list of generation steps.
pub struct GenerationPipeline {
    steps: Vec<Box<dyn GenerationStep>>,
}

impl Default for GenerationPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl GenerationPipeline {
    pub fn empty() -> Self {
        Self { steps: Vec::new() }
    }

    /// Biome, terrain, caves, trees.
    pub fn standard() -> Self {
        Self::empty()
            .with_step(BiomeStep)
            .with_step(TerrainStep)
            .with_step(CaveStep)
            .with_step(TreeStep)
    }

    pub fn with_step(mut self, step: impl GenerationStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order. The first failure aborts the rest.
    pub fn run(&self, ctx: &mut GeneratorContext<'_>) -> Result<Vec<StepTiming>, GenerationError> {
        let mut timings = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let t0 = Instant::now();
            step.execute(ctx)
                .map_err(|e| e.in_step(step.name(), ctx.coord))?;
            let micros = t0.elapsed().as_micros().min(u128::from(u64::MAX)) as u64;
            log::trace!(
                target: "gen",
                "chunk {} step {} took {}us",
                ctx.coord,
                step.name(),
                micros
            );
            timings.push(StepTiming {
                step: step.name(),
                micros,
            });
        }
        Ok(timings)
    }
}
