use loam_world::noise::{sample_2d, sample_3d};
use loam_world::{DomainWarp, Fractal, FractalMode, NoiseField, NoiseKind, NoiseParams};
use proptest::prelude::*;

fn kind() -> impl Strategy<Value = NoiseKind> {
    prop_oneof![
        Just(NoiseKind::Value),
        Just(NoiseKind::Perlin),
        Just(NoiseKind::OpenSimplex2),
    ]
}

fn params() -> impl Strategy<Value = NoiseParams> {
    (
        kind(),
        0.001f32..0.2,
        prop_oneof![
            Just(FractalMode::None),
            Just(FractalMode::Fbm),
            Just(FractalMode::Ridged)
        ],
        1u32..=6,
        1.5f32..3.0,
        0.2f32..0.8,
        any::<bool>(),
    )
        .prop_map(|(kind, frequency, mode, octaves, lacunarity, gain, warp)| {
            let p = NoiseParams::new(kind, frequency).with_fractal(Fractal {
                mode,
                octaves,
                lacunarity,
                gain,
            });
            if warp { p.with_warp(DomainWarp::default()) } else { p }
        })
}

fn coord() -> impl Strategy<Value = f32> {
    -10_000.0f32..10_000.0
}

proptest! {
    // Same seed, coordinates, and params give the same value
    #[test]
    fn samples_are_reproducible(seed in any::<i32>(), p in params(), x in coord(), y in coord(), z in coord()) {
        prop_assert_eq!(sample_2d(seed, x, z, &p), sample_2d(seed, x, z, &p));
        prop_assert_eq!(sample_3d(seed, x, y, z, &p), sample_3d(seed, x, y, z, &p));
        let field = NoiseField::new(seed, &p);
        prop_assert_eq!(field.get_2d(x, z), sample_2d(seed, x, z, &p));
        prop_assert_eq!(field.get_3d(x, y, z), sample_3d(seed, x, y, z, &p));
    }

    // Output stays inside [-1, 1]
    #[test]
    fn samples_are_bounded(seed in any::<i32>(), p in params(), x in coord(), y in coord(), z in coord()) {
        let a = sample_2d(seed, x, z, &p);
        let b = sample_3d(seed, x, y, z, &p);
        prop_assert!((-1.0..=1.0).contains(&a));
        prop_assert!((-1.0..=1.0).contains(&b));
    }

    // Building another seed's field in between does not disturb this one
    #[test]
    fn fields_do_not_share_state(seed in any::<i32>(), other in any::<i32>(), p in params(), x in coord(), z in coord()) {
        let field = NoiseField::new(seed, &p);
        let before = field.get_2d(x, z);
        let noisy = NoiseField::new(other, &p);
        let _ = noisy.get_2d(z, x);
        prop_assert_eq!(field.get_2d(x, z), before);
    }
}

#[test]
fn different_seeds_give_different_fields() {
    let p = NoiseParams::default();
    let a = NoiseField::new(1, &p);
    let b = NoiseField::new(2, &p);
    let differs = (0..128).any(|i| {
        let x = i as f32 * 7.1;
        a.get_2d(x, -x) != b.get_2d(x, -x)
    });
    assert!(differs);
}
