use loam_blocks::BlockType;

use crate::error::GenerationError;
use crate::pipeline::{GenerationStep, GeneratorContext};

/// Carves noise-thresholded pockets out of solid ground.
///
/// Every carve decision reads the pre-carve grid only, so the result does not
/// depend on visit order. Bedrock and water are never touched, nor is a block
/// sitting directly under water.
pub struct CaveStep;

#[inline]
fn carvable(kind: Option<BlockType>) -> bool {
    matches!(kind, Some(k) if k.is_solid() && k != BlockType::Bedrock)
}

impl GenerationStep for CaveStep {
    fn name(&self) -> &'static str {
        "caves"
    }

    fn execute(&self, ctx: &mut GeneratorContext<'_>) -> Result<(), GenerationError> {
        let p = ctx.params;
        if !p.carvers_enable {
            return Ok(());
        }
        let (sx, sy, sz) = (ctx.buf.sx, ctx.buf.sy, ctx.buf.sz);
        let (ox, oz) = ctx.origin();
        let min_y = p.cave_min_y.max(1) as usize;
        let mut carve = Vec::new();
        for z in 0..sz {
            for x in 0..sx {
                let Some(top) = ctx.buf.top_solid(x, z) else {
                    continue;
                };
                let ceiling = top as i32 - p.cave_surface_margin;
                let wx = (ox + x as i32) as f32;
                let wz = (oz + z as i32) as f32;
                for y in min_y..sy {
                    if y as i32 > ceiling {
                        break;
                    }
                    let i = ctx.buf.idx(x, y, z);
                    if !carvable(ctx.buf.kind_at(i)) {
                        continue;
                    }
                    if y + 1 < sy && ctx.buf.kind_local(x, y + 1, z) == Some(BlockType::Water) {
                        continue;
                    }
                    let n = ctx.noise.caves.get_3d(wx, y as f32 * p.cave_y_scale, wz);
                    if n > p.cave_threshold {
                        carve.push(i);
                    }
                }
            }
        }
        if !carve.is_empty() {
            log::trace!(target: "gen", "chunk {} carved {} cells", ctx.coord, carve.len());
        }
        for i in carve {
            ctx.buf.set_at(i, BlockType::Air);
        }
        Ok(())
    }
}
