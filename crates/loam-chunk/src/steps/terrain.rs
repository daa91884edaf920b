use loam_blocks::BlockType;
use loam_world::{BiomeSample, NoiseSource, WorldGenParams};

use crate::error::GenerationError;
use crate::pipeline::{GenerationStep, GeneratorContext};

/// Fills every column: bedrock, subsurface, surface, then air or sea water.
pub struct TerrainStep;

/// Surface height of a world column, clamped to `[1, sy - 1]`.
pub fn column_height(
    noise: &NoiseSource,
    params: &WorldGenParams,
    biome: &BiomeSample,
    wx: i32,
    wz: i32,
    sy: usize,
) -> usize {
    let n = noise.terrain.get_2d(wx as f32, wz as f32);
    let sea = params.sea_level(sy) as f32;
    let h = sea + biome.base_height + n * params.height_amplitude * biome.height_multiplier;
    (h.round() as i32).clamp(1, sy as i32 - 1) as usize
}

impl GenerationStep for TerrainStep {
    fn name(&self) -> &'static str {
        "terrain"
    }

    fn execute(&self, ctx: &mut GeneratorContext<'_>) -> Result<(), GenerationError> {
        let (sx, sy, sz) = (ctx.buf.sx, ctx.buf.sy, ctx.buf.sz);
        if sx == 0 || sz == 0 || sy < 2 {
            return Err(GenerationError::InvalidDimensions { sx, sy, sz });
        }
        let biome = ctx.biome_or_default();
        let sea = if ctx.params.water_enable {
            Some(ctx.sea_level())
        } else {
            None
        };
        let (ox, oz) = ctx.origin();
        for z in 0..sz {
            for x in 0..sx {
                let h = column_height(
                    ctx.noise,
                    ctx.params,
                    &biome,
                    ox + x as i32,
                    oz + z as i32,
                    sy,
                );
                for y in 0..sy {
                    let kind = if y == 0 {
                        BlockType::Bedrock
                    } else if y < h {
                        biome.subsurface_block
                    } else if y == h {
                        biome.surface_block
                    } else if sea.is_some_and(|s| y as i32 <= s) {
                        BlockType::Water
                    } else {
                        BlockType::Air
                    };
                    ctx.buf.set_local(x, y, z, kind);
                }
            }
        }
        Ok(())
    }
}
