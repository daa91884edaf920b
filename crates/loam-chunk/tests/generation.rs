use loam_blocks::BlockType;
use loam_chunk::steps::{BiomeStep, CaveStep, TerrainStep, TreeStep};
use loam_chunk::{
    ChunkBuf, GenerationError, GenerationPipeline, GenerationStep, GeneratorContext,
    generate_chunk_buffer,
};
use loam_world::{BiomeSample, BiomeType, ChunkCoord, NoiseSource, World, WorldGenParams};
use proptest::prelude::*;

fn generate(seed: i32, coord: ChunkCoord) -> ChunkBuf {
    let world = World::new(seed, WorldGenParams::default());
    let noise = world.make_noise_source();
    generate_chunk_buffer(&world, coord, &noise, &GenerationPipeline::standard())
        .unwrap()
        .buf
}

fn forest() -> BiomeSample {
    let mut b = BiomeSample::from_climate(0.5, 0.9, 0.9);
    assert_eq!(b.biome, BiomeType::TropicalRainforest);
    b.tree_density = 1.0;
    b
}

/// Flat test chunk: bedrock, dirt up to `surface - 1`, `top` at `surface`, air above.
fn flat(sx: usize, sy: usize, sz: usize, surface: usize, top: BlockType) -> ChunkBuf {
    ChunkBuf::from_fn(ChunkCoord::new(0, 0), sx, sy, sz, |_, y, _| {
        Some(if y == 0 {
            BlockType::Bedrock
        } else if y < surface {
            BlockType::Dirt
        } else if y == surface {
            top
        } else {
            BlockType::Air
        })
    })
}

fn wood_runs(buf: &ChunkBuf) -> Vec<(usize, usize, usize, usize)> {
    let mut runs = Vec::new();
    for z in 0..buf.sz {
        for x in 0..buf.sx {
            let mut y = 0;
            while y < buf.sy {
                if buf.kind_local(x, y, z) == Some(BlockType::Wood) {
                    let start = y;
                    while y < buf.sy && buf.kind_local(x, y, z) == Some(BlockType::Wood) {
                        y += 1;
                    }
                    runs.push((x, z, start, y - start));
                } else {
                    y += 1;
                }
            }
        }
    }
    runs
}

fn leaves_near(buf: &ChunkBuf, x: usize, top: usize, z: usize) -> bool {
    for dy in -2i32..=2 {
        for dz in -2i32..=2 {
            for dx in -2i32..=2 {
                if let Some(i) = buf.in_bounds(x as i32 + dx, top as i32 + dy, z as i32 + dz) {
                    if buf.kind_at(i) == Some(BlockType::Leaves) {
                        return true;
                    }
                }
            }
        }
    }
    false
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    // Two runs with the same seed and position are identical, ids included
    #[test]
    fn generation_is_deterministic(seed in any::<i32>(), cx in -2000i32..2000, cz in -2000i32..2000) {
        let c = ChunkCoord::new(cx, cz);
        prop_assert_eq!(generate(seed, c), generate(seed, c));
    }

    // Bedrock floor survives every step
    #[test]
    fn bedrock_floor_is_complete(seed in any::<i32>(), cx in -2000i32..2000, cz in -2000i32..2000) {
        let buf = generate(seed, ChunkCoord::new(cx, cz));
        for z in 0..buf.sz { for x in 0..buf.sx {
            prop_assert_eq!(buf.kind_local(x, 0, z), Some(BlockType::Bedrock));
        }}
        prop_assert_eq!(buf.count_kind(BlockType::Bedrock), buf.sx * buf.sz);
    }

    // Different seeds at one position produce different grids
    #[test]
    fn seeds_change_the_grid(seed in any::<i32>(), cx in -2000i32..2000, cz in -2000i32..2000) {
        let c = ChunkCoord::new(cx, cz);
        let a = generate(seed, c);
        let b = generate(seed.wrapping_add(1), c);
        prop_assert!(a.blocks.iter().zip(&b.blocks).any(|(p, q)| p.map(|e| e.kind) != q.map(|e| e.kind)));
    }

    // Every trunk has a valid height and a canopy around its top
    #[test]
    fn trees_are_well_formed(seed in any::<i32>(), cx in -200i32..200, cz in -200i32..200) {
        let params = WorldGenParams::default();
        let buf = generate(seed, ChunkCoord::new(cx, cz));
        for (x, z, start, len) in wood_runs(&buf) {
            prop_assert!(len as i32 >= params.trunk_min && len as i32 <= params.trunk_max);
            prop_assert!(leaves_near(&buf, x, start + len - 1, z));
        }
    }
}

#[test]
fn end_to_end_seed_12345() {
    let first = generate(12345, ChunkCoord::new(0, 0));
    let counts = first.kind_counts();
    assert!(counts.contains_key(&BlockType::Bedrock));
    assert!(
        [BlockType::Dirt, BlockType::Grass, BlockType::Stone]
            .iter()
            .any(|k| counts.contains_key(k))
    );
    let again = generate(12345, ChunkCoord::new(0, 0));
    assert_eq!(again.kind_counts(), counts);
    assert!(first.blocks.iter().all(Option::is_some));
}

#[test]
fn standard_order_is_biome_terrain_caves_trees() {
    let p = GenerationPipeline::standard();
    assert_eq!(p.step_names(), vec!["biome", "terrain", "caves", "trees"]);
}

#[test]
fn biome_step_writes_no_blocks() {
    let world = World::new(7, WorldGenParams::default());
    let noise = world.make_noise_source();
    let mut ctx = GeneratorContext::new(&world, ChunkCoord::new(3, -4), &noise);
    BiomeStep.execute(&mut ctx).unwrap();
    let first = ctx.biome;
    assert!(first.is_some());
    assert!(ctx.buf.blocks.iter().all(Option::is_none));
    BiomeStep.execute(&mut ctx).unwrap();
    assert_eq!(ctx.biome, first);
}

#[test]
fn terrain_without_biome_uses_fallback() {
    let world = World::new(7, WorldGenParams::default());
    let noise = world.make_noise_source();
    let mut ctx = GeneratorContext::new(&world, ChunkCoord::new(0, 0), &noise);
    TerrainStep.execute(&mut ctx).unwrap();
    let fallback = BiomeSample::fallback();
    let sea = world.sea_level() as usize;
    for z in 0..ctx.buf.sz {
        for x in 0..ctx.buf.sx {
            assert_eq!(ctx.buf.kind_local(x, 0, z), Some(BlockType::Bedrock));
            let top = ctx.buf.top_solid(x, z).unwrap();
            assert_eq!(ctx.buf.kind_local(x, top, z), Some(fallback.surface_block));
            for y in 1..top {
                assert_eq!(ctx.buf.kind_local(x, y, z), Some(fallback.subsurface_block));
            }
            for y in top + 1..ctx.buf.sy {
                let expect = if y <= sea { BlockType::Water } else { BlockType::Air };
                assert_eq!(ctx.buf.kind_local(x, y, z), Some(expect));
            }
        }
    }
}

#[test]
fn terrain_rejects_degenerate_chunks() {
    let world = World::with_dims(4, 1, 4, 1, WorldGenParams::default());
    let noise = world.make_noise_source();
    let err = generate_chunk_buffer(
        &world,
        ChunkCoord::new(0, 0),
        &noise,
        &GenerationPipeline::standard(),
    )
    .unwrap_err();
    assert_eq!(err.step(), Some("terrain"));
    assert!(matches!(
        err,
        GenerationError::Step { ref source, .. }
            if matches!(**source, GenerationError::InvalidDimensions { sy: 1, .. })
    ));
}

#[test]
fn caves_never_touch_bedrock_or_water() {
    let mut params = WorldGenParams::default();
    params.cave_threshold = -1.0;
    params.cave_surface_margin = 0;
    let world = World::new(99, params);
    let noise = world.make_noise_source();
    let mut ctx = GeneratorContext::new(&world, ChunkCoord::new(-5, 8), &noise);
    ctx.biome = Some(BiomeSample::from_climate(0.05, 0.5, 0.5));
    TerrainStep.execute(&mut ctx).unwrap();
    let before = ctx.buf.clone();
    CaveStep.execute(&mut ctx).unwrap();

    assert_eq!(
        ctx.buf.count_kind(BlockType::Water),
        before.count_kind(BlockType::Water)
    );
    for i in 0..before.len() {
        match before.kind_at(i) {
            Some(BlockType::Bedrock) | Some(BlockType::Water) => {
                assert_eq!(ctx.buf.kind_at(i), before.kind_at(i))
            }
            _ => {}
        }
    }
    // Seabed directly under water stays sealed.
    for z in 0..before.sz {
        for x in 0..before.sx {
            let top = before.top_solid(x, z).unwrap();
            if before.kind_local(x, top + 1, z) == Some(BlockType::Water) {
                assert_eq!(ctx.buf.kind_local(x, top, z), before.kind_local(x, top, z));
            }
        }
    }
}

#[test]
fn cave_carving_is_idempotent() {
    let world = World::new(4242, WorldGenParams::default());
    let noise = world.make_noise_source();
    let mut ctx = GeneratorContext::new(&world, ChunkCoord::new(1, 1), &noise);
    BiomeStep.execute(&mut ctx).unwrap();
    TerrainStep.execute(&mut ctx).unwrap();
    CaveStep.execute(&mut ctx).unwrap();
    let once = ctx.buf.clone();
    CaveStep.execute(&mut ctx).unwrap();
    assert_eq!(ctx.buf, once);
}

#[test]
fn trees_skip_surface_at_top_boundary() {
    let noise = NoiseSource::new(1, &WorldGenParams::default());
    let params = WorldGenParams::default();
    let sy = 32;
    let buf = flat(16, sy, 16, sy - 1, BlockType::Grass);
    let mut ctx = GeneratorContext::with_buf(buf, 1, &noise, &params);
    ctx.biome = Some(forest());
    TreeStep.execute(&mut ctx).unwrap();
    assert_eq!(ctx.buf.count_kind(BlockType::Wood), 0);
    assert_eq!(ctx.buf.count_kind(BlockType::Leaves), 0);
}

#[test]
fn trees_need_full_headroom() {
    let noise = NoiseSource::new(1, &WorldGenParams::default());
    let params = WorldGenParams::default();
    let sy = 32;
    let tight = sy - (params.trunk_max + params.canopy_margin) as usize;
    let mut ctx = GeneratorContext::with_buf(
        flat(16, sy, 16, tight, BlockType::Grass),
        1,
        &noise,
        &params,
    );
    ctx.biome = Some(forest());
    TreeStep.execute(&mut ctx).unwrap();
    assert_eq!(ctx.buf.count_kind(BlockType::Wood), 0);

    let mut ctx = GeneratorContext::with_buf(
        flat(16, sy, 16, tight - 1, BlockType::Grass),
        1,
        &noise,
        &params,
    );
    ctx.biome = Some(forest());
    TreeStep.execute(&mut ctx).unwrap();
    assert!(ctx.buf.count_kind(BlockType::Wood) > 0);
}

#[test]
fn trees_respect_edge_margin_and_shape() {
    let noise = NoiseSource::new(3, &WorldGenParams::default());
    let params = WorldGenParams::default();
    let mut ctx = GeneratorContext::with_buf(
        flat(16, 40, 16, 10, BlockType::Grass),
        3,
        &noise,
        &params,
    );
    ctx.biome = Some(forest());
    TreeStep.execute(&mut ctx).unwrap();
    let runs = wood_runs(&ctx.buf);
    assert!(!runs.is_empty());
    let m = params.tree_edge_margin as usize;
    for (x, z, start, len) in runs {
        assert!(x >= m && x < 16 - m && z >= m && z < 16 - m);
        assert_eq!(start, 11);
        assert!(len as i32 >= params.trunk_min && len as i32 <= params.trunk_max);
        assert!(leaves_near(&ctx.buf, x, start + len - 1, z));
    }
}

#[test]
fn no_trees_under_water() {
    let noise = NoiseSource::new(5, &WorldGenParams::default());
    let params = WorldGenParams::default();
    let buf = ChunkBuf::from_fn(ChunkCoord::new(0, 0), 16, 40, 16, |_, y, _| {
        Some(match y {
            0 => BlockType::Bedrock,
            1..=9 => BlockType::Dirt,
            10 => BlockType::Grass,
            11..=20 => BlockType::Water,
            _ => BlockType::Air,
        })
    });
    let mut ctx = GeneratorContext::with_buf(buf, 5, &noise, &params);
    ctx.biome = Some(forest());
    TreeStep.execute(&mut ctx).unwrap();
    assert_eq!(ctx.buf.count_kind(BlockType::Wood), 0);
    assert_eq!(ctx.buf.count_kind(BlockType::Leaves), 0);
}

#[test]
fn desert_places_no_trees() {
    let noise = NoiseSource::new(5, &WorldGenParams::default());
    let params = WorldGenParams::default();
    let mut ctx = GeneratorContext::with_buf(
        flat(16, 40, 16, 10, BlockType::Sand),
        5,
        &noise,
        &params,
    );
    ctx.biome = Some(BiomeSample::from_climate(0.5, 0.5, 0.05));
    assert_eq!(ctx.biome.map(|b| b.biome), Some(BiomeType::TemperateDesert));
    TreeStep.execute(&mut ctx).unwrap();
    assert_eq!(ctx.buf.count_kind(BlockType::Wood), 0);
}

#[test]
fn bad_tree_heights_abort_the_pipeline() {
    let mut params = WorldGenParams::default();
    params.trunk_min = 7;
    params.trunk_max = 3;
    let world = World::new(1, params);
    let noise = world.make_noise_source();
    let err = generate_chunk_buffer(
        &world,
        ChunkCoord::new(0, 0),
        &noise,
        &GenerationPipeline::standard(),
    )
    .unwrap_err();
    assert_eq!(err.step(), Some("trees"));
}

#[test]
fn failing_step_stops_later_steps() {
    struct Boom;
    impl GenerationStep for Boom {
        fn name(&self) -> &'static str {
            "boom"
        }
        fn execute(&self, _: &mut GeneratorContext<'_>) -> Result<(), GenerationError> {
            Err(GenerationError::InvalidParams("boom".into()))
        }
    }
    let world = World::with_dims(8, 32, 8, 1, WorldGenParams::default());
    let noise = world.make_noise_source();
    let pipeline = GenerationPipeline::empty()
        .with_step(BiomeStep)
        .with_step(Boom)
        .with_step(TerrainStep);
    let mut ctx = GeneratorContext::new(&world, ChunkCoord::new(0, 0), &noise);
    let err = pipeline.run(&mut ctx).unwrap_err();
    assert_eq!(err.step(), Some("boom"));
    assert!(ctx.biome.is_some());
    assert!(ctx.buf.blocks.iter().all(Option::is_none));
}
