//! Seeded coherent noise with fractal accumulation and optional domain warp.
//!
//! Every sampler is a pure function of `(seed, coordinates, params)`. Fractal
//! octaves are accumulated here on top of a single-octave `FastNoiseLite`
//! generator so the octave count, lacunarity, and gain behave the same for
//! every base noise kind.

use fastnoise_lite::{FastNoiseLite, NoiseType};
use serde::Deserialize;

// Per-octave coordinate shift so stacked octaves do not line up at the origin.
const OCTAVE_SHIFT: f32 = 19.19;
// Per-axis offsets into the warp field; each axis reads an uncorrelated slice.
const WARP_SHIFT_X: (f32, f32, f32) = (0.0, 0.0, 0.0);
const WARP_SHIFT_Y: (f32, f32, f32) = (113.5, 61.9, -27.3);
const WARP_SHIFT_Z: (f32, f32, f32) = (-48.1, 207.7, 91.4);
const WARP_SEED_SALT: i32 = 0x2F6B_1D43;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    Value,
    Perlin,
    #[serde(alias = "simplex")]
    OpenSimplex2,
}

impl NoiseKind {
    fn noise_type(self) -> NoiseType {
        match self {
            NoiseKind::Value => NoiseType::Value,
            NoiseKind::Perlin => NoiseType::Perlin,
            NoiseKind::OpenSimplex2 => NoiseType::OpenSimplex2,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalMode {
    None,
    Fbm,
    Ridged,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct Fractal {
    #[serde(default = "default_fractal_mode")]
    pub mode: FractalMode,
    #[serde(default = "default_octaves")]
    pub octaves: u32,
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f32,
    #[serde(default = "default_gain")]
    pub gain: f32,
}
fn default_fractal_mode() -> FractalMode {
    FractalMode::Fbm
}
fn default_octaves() -> u32 {
    4
}
fn default_lacunarity() -> f32 {
    2.0
}
fn default_gain() -> f32 {
    0.5
}
impl Default for Fractal {
    fn default() -> Self {
        Self {
            mode: default_fractal_mode(),
            octaves: default_octaves(),
            lacunarity: default_lacunarity(),
            gain: default_gain(),
        }
    }
}

impl Fractal {
    pub fn fbm(octaves: u32) -> Self {
        Self {
            octaves,
            ..Self::default()
        }
    }

    pub fn single() -> Self {
        Self {
            mode: FractalMode::None,
            octaves: 1,
            ..Self::default()
        }
    }

    #[inline]
    fn effective_octaves(&self) -> u32 {
        match self.mode {
            FractalMode::None => 1,
            FractalMode::Fbm | FractalMode::Ridged => self.octaves.max(1),
        }
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct DomainWarp {
    #[serde(default = "default_warp_amp")]
    pub amplitude: f32,
    #[serde(default = "default_warp_freq")]
    pub frequency: f32,
}
fn default_warp_amp() -> f32 {
    12.0
}
fn default_warp_freq() -> f32 {
    0.012
}
impl Default for DomainWarp {
    fn default() -> Self {
        Self {
            amplitude: default_warp_amp(),
            frequency: default_warp_freq(),
        }
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct NoiseParams {
    #[serde(default = "default_kind")]
    pub kind: NoiseKind,
    #[serde(default = "default_frequency")]
    pub frequency: f32,
    #[serde(default)]
    pub fractal: Fractal,
    #[serde(default)]
    pub warp: Option<DomainWarp>,
}
fn default_kind() -> NoiseKind {
    NoiseKind::OpenSimplex2
}
fn default_frequency() -> f32 {
    0.01
}
impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            frequency: default_frequency(),
            fractal: Fractal::default(),
            warp: None,
        }
    }
}

impl NoiseParams {
    pub fn new(kind: NoiseKind, frequency: f32) -> Self {
        Self {
            kind,
            frequency,
            fractal: Fractal::single(),
            warp: None,
        }
    }

    pub fn with_fractal(mut self, fractal: Fractal) -> Self {
        self.fractal = fractal;
        self
    }

    pub fn with_warp(mut self, warp: DomainWarp) -> Self {
        self.warp = Some(warp);
        self
    }
}

/// Prebuilt sampler for one `(seed, params)` pair.
pub struct NoiseField {
    base: FastNoiseLite,
    warp: Option<(FastNoiseLite, f32)>,
    fractal: Fractal,
}

impl NoiseField {
    pub fn new(seed: i32, params: &NoiseParams) -> Self {
        let mut base = FastNoiseLite::with_seed(seed);
        base.set_noise_type(Some(params.kind.noise_type()));
        base.set_frequency(Some(params.frequency));
        let warp = params.warp.map(|w| {
            let mut n = FastNoiseLite::with_seed(seed ^ WARP_SEED_SALT);
            n.set_noise_type(Some(NoiseType::OpenSimplex2));
            n.set_frequency(Some(w.frequency));
            (n, w.amplitude)
        });
        Self {
            base,
            warp,
            fractal: params.fractal,
        }
    }

    /// Sample at a horizontal position. Output is in `[-1, 1]`.
    pub fn get_2d(&self, x: f32, z: f32) -> f32 {
        let (x, z) = match &self.warp {
            Some((w, amp)) => (
                x + w.get_noise_2d(x + WARP_SHIFT_X.0, z + WARP_SHIFT_X.2) * amp,
                z + w.get_noise_2d(x + WARP_SHIFT_Z.0, z + WARP_SHIFT_Z.2) * amp,
            ),
            None => (x, z),
        };
        let octaves = self.fractal.effective_octaves();
        let mut sum = 0.0f32;
        let mut norm = 0.0f32;
        let mut amp = 1.0f32;
        let mut freq = 1.0f32;
        for i in 0..octaves {
            let shift = i as f32 * OCTAVE_SHIFT;
            let n = self.base.get_noise_2d(x * freq + shift, z * freq - shift);
            sum += self.shape(n) * amp;
            norm += amp;
            amp *= self.fractal.gain;
            freq *= self.fractal.lacunarity;
        }
        finish(sum, norm)
    }

    /// Sample at a 3D position. Output is in `[-1, 1]`.
    pub fn get_3d(&self, x: f32, y: f32, z: f32) -> f32 {
        let (x, y, z) = match &self.warp {
            Some((w, amp)) => {
                let dx = w.get_noise_3d(x + WARP_SHIFT_X.0, y + WARP_SHIFT_X.1, z + WARP_SHIFT_X.2);
                let dy = w.get_noise_3d(x + WARP_SHIFT_Y.0, y + WARP_SHIFT_Y.1, z + WARP_SHIFT_Y.2);
                let dz = w.get_noise_3d(x + WARP_SHIFT_Z.0, y + WARP_SHIFT_Z.1, z + WARP_SHIFT_Z.2);
                (x + dx * amp, y + dy * amp, z + dz * amp)
            }
            None => (x, y, z),
        };
        let octaves = self.fractal.effective_octaves();
        let mut sum = 0.0f32;
        let mut norm = 0.0f32;
        let mut amp = 1.0f32;
        let mut freq = 1.0f32;
        for i in 0..octaves {
            let shift = i as f32 * OCTAVE_SHIFT;
            let n = self
                .base
                .get_noise_3d(x * freq + shift, y * freq + shift, z * freq - shift);
            sum += self.shape(n) * amp;
            norm += amp;
            amp *= self.fractal.gain;
            freq *= self.fractal.lacunarity;
        }
        finish(sum, norm)
    }

    #[inline]
    fn shape(&self, n: f32) -> f32 {
        match self.fractal.mode {
            FractalMode::Ridged => 1.0 - 2.0 * n.abs(),
            FractalMode::None | FractalMode::Fbm => n,
        }
    }
}

#[inline]
fn finish(sum: f32, norm: f32) -> f32 {
    if norm > 0.0 {
        (sum / norm).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// One-shot 2D sample. Prefer a cached `NoiseField` in hot loops.
pub fn sample_2d(seed: i32, x: f32, z: f32, params: &NoiseParams) -> f32 {
    NoiseField::new(seed, params).get_2d(x, z)
}

/// One-shot 3D sample. Prefer a cached `NoiseField` in hot loops.
pub fn sample_3d(seed: i32, x: f32, y: f32, z: f32, params: &NoiseParams) -> f32 {
    NoiseField::new(seed, params).get_3d(x, y, z)
}

/// Map a `[-1, 1]` sample onto `[0, 1]`.
#[inline]
pub fn to_unit(n: f32) -> f32 {
    ((n + 1.0) * 0.5).clamp(0.0, 1.0)
}
