use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

use crate::noise::{DomainWarp, Fractal, FractalMode, NoiseKind, NoiseParams};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default)]
    pub height: Height,
    #[serde(default)]
    pub water: Water,
    #[serde(default)]
    pub climate: Climate,
    #[serde(default)]
    pub carvers: Carvers,
    #[serde(default)]
    pub trees: Trees,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Height {
    #[serde(default = "default_height_amplitude")]
    pub amplitude: f32,
    #[serde(default = "default_height_noise")]
    pub noise: NoiseParams,
}
fn default_height_amplitude() -> f32 {
    24.0
}
fn default_height_noise() -> NoiseParams {
    NoiseParams::new(NoiseKind::OpenSimplex2, 0.008).with_fractal(Fractal::fbm(4))
}
impl Default for Height {
    fn default() -> Self {
        Self {
            amplitude: default_height_amplitude(),
            noise: default_height_noise(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Water {
    #[serde(default = "default_water_enable")]
    pub enable: bool,
    #[serde(default = "default_water_level_ratio")]
    pub level_ratio: f32,
}
fn default_water_enable() -> bool {
    true
}
fn default_water_level_ratio() -> f32 {
    0.375
}
impl Default for Water {
    fn default() -> Self {
        Self {
            enable: default_water_enable(),
            level_ratio: default_water_level_ratio(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Climate {
    #[serde(default = "default_elevation_noise")]
    pub elevation: NoiseParams,
    #[serde(default = "default_temperature_noise")]
    pub temperature: NoiseParams,
    #[serde(default = "default_moisture_noise")]
    pub moisture: NoiseParams,
    /// Stretch applied to raw samples before mapping to `[0, 1]`, so the
    /// outer bands (ocean, peaks) actually occur.
    #[serde(default = "default_climate_contrast")]
    pub contrast: f32,
}
fn default_elevation_noise() -> NoiseParams {
    NoiseParams::new(NoiseKind::OpenSimplex2, 0.0015).with_fractal(Fractal::fbm(3))
}
fn default_temperature_noise() -> NoiseParams {
    NoiseParams::new(NoiseKind::OpenSimplex2, 0.002).with_fractal(Fractal::fbm(2))
}
fn default_moisture_noise() -> NoiseParams {
    NoiseParams::new(NoiseKind::OpenSimplex2, 0.0025).with_fractal(Fractal::fbm(2))
}
fn default_climate_contrast() -> f32 {
    1.6
}
impl Default for Climate {
    fn default() -> Self {
        Self {
            elevation: default_elevation_noise(),
            temperature: default_temperature_noise(),
            moisture: default_moisture_noise(),
            contrast: default_climate_contrast(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Carvers {
    #[serde(default = "default_carvers_enable")]
    pub enable: bool,
    #[serde(default = "default_cave_noise")]
    pub noise: NoiseParams,
    #[serde(default = "default_cave_threshold")]
    pub threshold: f32,
    #[serde(default = "default_cave_y_scale")]
    pub y_scale: f32,
    #[serde(default = "default_cave_min_y")]
    pub min_y: i32,
    #[serde(default = "default_cave_surface_margin")]
    pub surface_margin: i32,
}
fn default_carvers_enable() -> bool {
    true
}
fn default_cave_noise() -> NoiseParams {
    NoiseParams::new(NoiseKind::OpenSimplex2, 0.045)
        .with_fractal(Fractal {
            mode: FractalMode::Fbm,
            octaves: 2,
            lacunarity: 2.0,
            gain: 0.5,
        })
        .with_warp(DomainWarp {
            amplitude: 6.0,
            frequency: 0.02,
        })
}
fn default_cave_threshold() -> f32 {
    0.55
}
fn default_cave_y_scale() -> f32 {
    1.6
}
fn default_cave_min_y() -> i32 {
    2
}
fn default_cave_surface_margin() -> i32 {
    4
}
impl Default for Carvers {
    fn default() -> Self {
        Self {
            enable: default_carvers_enable(),
            noise: default_cave_noise(),
            threshold: default_cave_threshold(),
            y_scale: default_cave_y_scale(),
            min_y: default_cave_min_y(),
            surface_margin: default_cave_surface_margin(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Trees {
    #[serde(default = "default_trunk_min")]
    pub min_height: i32,
    #[serde(default = "default_trunk_max")]
    pub max_height: i32,
    #[serde(default = "default_canopy_margin")]
    pub canopy_margin: i32,
    #[serde(default = "default_edge_margin")]
    pub edge_margin: i32,
    #[serde(default = "default_leaf_radius")]
    pub leaf_radius: i32,
}
fn default_trunk_min() -> i32 {
    4
}
fn default_trunk_max() -> i32 {
    6
}
fn default_canopy_margin() -> i32 {
    2
}
fn default_edge_margin() -> i32 {
    2
}
fn default_leaf_radius() -> i32 {
    2
}
impl Default for Trees {
    fn default() -> Self {
        Self {
            min_height: default_trunk_min(),
            max_height: default_trunk_max(),
            canopy_margin: default_canopy_margin(),
            edge_margin: default_edge_margin(),
            leaf_radius: default_leaf_radius(),
        }
    }
}

/// Flattened, ready-to-sample worldgen parameters.
#[derive(Clone, Debug)]
pub struct WorldGenParams {
    pub height_amplitude: f32,
    pub height_noise: NoiseParams,
    pub water_enable: bool,
    pub water_level_ratio: f32,
    pub elevation_noise: NoiseParams,
    pub temperature_noise: NoiseParams,
    pub moisture_noise: NoiseParams,
    pub climate_contrast: f32,
    pub carvers_enable: bool,
    pub cave_noise: NoiseParams,
    pub cave_threshold: f32,
    pub cave_y_scale: f32,
    pub cave_min_y: i32,
    pub cave_surface_margin: i32,
    pub trunk_min: i32,
    pub trunk_max: i32,
    pub canopy_margin: i32,
    pub tree_edge_margin: i32,
    pub leaf_radius: i32,
}

impl Default for WorldGenParams {
    fn default() -> Self {
        Self::from_config(&WorldGenConfig::default())
    }
}

impl WorldGenParams {
    pub fn from_config(cfg: &WorldGenConfig) -> Self {
        Self {
            height_amplitude: cfg.height.amplitude.max(0.0),
            height_noise: cfg.height.noise,
            water_enable: cfg.water.enable,
            water_level_ratio: cfg.water.level_ratio.clamp(0.0, 1.0),
            elevation_noise: cfg.climate.elevation,
            temperature_noise: cfg.climate.temperature,
            moisture_noise: cfg.climate.moisture,
            climate_contrast: cfg.climate.contrast.max(0.0),
            carvers_enable: cfg.carvers.enable,
            cave_noise: cfg.carvers.noise,
            cave_threshold: cfg.carvers.threshold,
            cave_y_scale: cfg.carvers.y_scale,
            cave_min_y: cfg.carvers.min_y.max(1),
            cave_surface_margin: cfg.carvers.surface_margin.max(0),
            trunk_min: cfg.trees.min_height,
            trunk_max: cfg.trees.max_height,
            canopy_margin: cfg.trees.canopy_margin.max(0),
            tree_edge_margin: cfg.trees.edge_margin.max(0),
            leaf_radius: cfg.trees.leaf_radius.max(0),
        }
    }

    /// Sea level for a chunk of height `sy`.
    #[inline]
    pub fn sea_level(&self, sy: usize) -> i32 {
        (sy as f32 * self.water_level_ratio).round() as i32
    }
}

pub fn load_params_from_path(path: &Path) -> Result<WorldGenParams, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let cfg: WorldGenConfig = toml::from_str(&s)?;
    Ok(WorldGenParams::from_config(&cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: WorldGenConfig = toml::from_str("").unwrap();
        let p = WorldGenParams::from_config(&cfg);
        assert_eq!(p.trunk_min, 4);
        assert_eq!(p.trunk_max, 6);
        assert_eq!(p.sea_level(128), 48);
        assert!(p.carvers_enable);
        assert!(p.cave_noise.warp.is_some());
    }

    #[test]
    fn partial_sections_override_only_named_fields() {
        let src = r#"
            [water]
            level_ratio = 0.5

            [trees]
            max_height = 9

            [carvers]
            enable = false

            [height.noise]
            kind = "perlin"
            frequency = 0.02

            [height.noise.fractal]
            mode = "ridged"
            octaves = 3
        "#;
        let cfg: WorldGenConfig = toml::from_str(src).unwrap();
        let p = WorldGenParams::from_config(&cfg);
        assert_eq!(p.sea_level(64), 32);
        assert_eq!(p.trunk_min, 4);
        assert_eq!(p.trunk_max, 9);
        assert!(!p.carvers_enable);
        assert_eq!(p.height_noise.kind, NoiseKind::Perlin);
        assert_eq!(p.height_noise.fractal.mode, FractalMode::Ridged);
        assert_eq!(p.height_noise.fractal.octaves, 3);
        assert_eq!(p.height_noise.fractal.gain, 0.5);
    }
}
