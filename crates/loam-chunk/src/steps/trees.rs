use loam_blocks::BlockType;

use crate::ChunkBuf;
use crate::error::GenerationError;
use crate::pipeline::{GenerationStep, GeneratorContext};

const HEIGHT_SALT: u32 = 0x5bd1_e995;

/// Places trunks and leaf canopies on eligible surface columns.
///
/// Columns within `tree_edge_margin` of a chunk edge are skipped so a tree
/// never needs data from a neighbor chunk, and columns without headroom for
/// the tallest trunk plus canopy are skipped rather than clipped.
pub struct TreeStep;

fn hash2(ix: i32, iz: i32, seed: u32) -> u32 {
    let mut h = (ix as u32).wrapping_mul(0x85eb_ca6b)
        ^ (iz as u32).wrapping_mul(0xc2b2_ae35)
        ^ seed.wrapping_mul(0x27d4_eb2d);
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846c_a68b);
    h ^= h >> 16;
    h
}

#[inline]
fn rand01(seed: u32, ix: i32, iz: i32) -> f32 {
    (hash2(ix, iz, seed) & 0x00FF_FFFF) as f32 / 16_777_216.0
}

impl GenerationStep for TreeStep {
    fn name(&self) -> &'static str {
        "trees"
    }

    fn execute(&self, ctx: &mut GeneratorContext<'_>) -> Result<(), GenerationError> {
        let p = ctx.params;
        if p.trunk_min < 1 || p.trunk_max < p.trunk_min {
            return Err(GenerationError::InvalidParams(format!(
                "tree heights must satisfy 1 <= min <= max, got {}..={}",
                p.trunk_min, p.trunk_max
            )));
        }
        let biome = ctx.biome_or_default();
        if biome.tree_density <= 0.0 {
            return Ok(());
        }
        let (sx, sy, sz) = (ctx.buf.sx, ctx.buf.sy, ctx.buf.sz);
        let margin = p.tree_edge_margin as usize;
        if sx <= margin * 2 || sz <= margin * 2 {
            return Ok(());
        }
        let (ox, oz) = ctx.origin();
        let seed = ctx.seed as u32;
        let span = (p.trunk_max - p.trunk_min + 1) as u32;
        let mut placed = 0usize;
        for z in margin..sz - margin {
            for x in margin..sx - margin {
                let Some(surf) = ctx.buf.top_non_air(x, z) else {
                    continue;
                };
                if ctx.buf.kind_local(x, surf, z) != Some(biome.surface_block) {
                    continue;
                }
                if surf as i32 + p.trunk_max + p.canopy_margin >= sy as i32 {
                    continue;
                }
                let wx = ox + x as i32;
                let wz = oz + z as i32;
                if rand01(seed, wx, wz) >= biome.tree_density {
                    continue;
                }
                let height = p.trunk_min as usize + (hash2(wx, wz, seed ^ HEIGHT_SALT) % span) as usize;
                place_tree(&mut ctx.buf, x, surf, z, height, p.leaf_radius);
                placed += 1;
            }
        }
        if placed > 0 {
            log::trace!(target: "gen", "chunk {} placed {} trees", ctx.coord, placed);
        }
        Ok(())
    }
}

fn place_tree(buf: &mut ChunkBuf, x: usize, surf: usize, z: usize, height: usize, leaf_r: i32) {
    let top = surf + height;
    for y in surf + 1..=top {
        if matches!(
            buf.kind_local(x, y, z),
            None | Some(BlockType::Air) | Some(BlockType::Leaves)
        ) {
            buf.set_local(x, y, z, BlockType::Wood);
        }
    }
    let (xi, ti, zi) = (x as i32, top as i32, z as i32);
    for dy in -2i32..=1 {
        let r = if dy < 0 { leaf_r } else { (leaf_r - 1).max(0) };
        for dz in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dz == 0 && dy <= 0 {
                    continue;
                }
                // Round off the corners of the upper layers.
                if r > 0 && dy >= 0 && dx.abs() == r && dz.abs() == r {
                    continue;
                }
                let Some(i) = buf.in_bounds(xi + dx, ti + dy, zi + dz) else {
                    continue;
                };
                if matches!(buf.kind_at(i), None | Some(BlockType::Air)) {
                    buf.set_at(i, BlockType::Leaves);
                }
            }
        }
    }
}
