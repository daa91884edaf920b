use loam_world::BiomeSample;

use crate::error::GenerationError;
use crate::pipeline::{GenerationStep, GeneratorContext};

/// Classifies the chunk's climate at its horizontal center. Writes no blocks.
pub struct BiomeStep;

impl GenerationStep for BiomeStep {
    fn name(&self) -> &'static str {
        "biome"
    }

    fn execute(&self, ctx: &mut GeneratorContext<'_>) -> Result<(), GenerationError> {
        let (ox, oz) = ctx.origin();
        let cx = ox as f32 + ctx.buf.sx as f32 * 0.5;
        let cz = oz as f32 + ctx.buf.sz as f32 * 0.5;
        let (elevation, temperature, moisture) = ctx.noise.climate(cx, cz);
        ctx.biome = Some(BiomeSample::from_climate(elevation, temperature, moisture));
        Ok(())
    }
}
