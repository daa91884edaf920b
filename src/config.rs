use std::fs;
use std::path::{Path, PathBuf};

use loam_fluid::FluidConfig;
use loam_runtime::StreamConfig;
use loam_world::{CHUNK_HEIGHT, CHUNK_SIZE, WorldGenParams, load_params_from_path};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to load worldgen params from {}: {message}", path.display())]
    WorldGen { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub world: WorldSection,
    #[serde(default)]
    pub stream: StreamConfig,
    /// Overrides `stream.fluid` when present.
    #[serde(default)]
    pub fluid: Option<FluidConfig>,
    #[serde(default)]
    pub run: RunSection,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorldSection {
    #[serde(default = "default_seed")]
    pub seed: i32,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_height")]
    pub chunk_height: usize,
    /// Worldgen TOML; built-in defaults when unset.
    #[serde(default)]
    pub worldgen: Option<PathBuf>,
}
fn default_seed() -> i32 {
    1337
}
fn default_chunk_size() -> usize {
    CHUNK_SIZE
}
fn default_chunk_height() -> usize {
    CHUNK_HEIGHT
}
impl Default for WorldSection {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            chunk_size: default_chunk_size(),
            chunk_height: default_chunk_height(),
            worldgen: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RunSection {
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Observer speed along +X, in blocks per tick.
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f32,
    #[serde(default = "default_rebuilds_per_tick")]
    pub rebuilds_per_tick: usize,
    /// Generation threads; 0 generates on the main thread.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Drop a water block at the observer every N ticks; 0 disables.
    #[serde(default = "default_water_every")]
    pub water_every: u64,
    #[serde(default = "default_stats_every")]
    pub stats_every: u64,
}
fn default_ticks() -> u64 {
    600
}
fn default_walk_speed() -> f32 {
    0.5
}
fn default_rebuilds_per_tick() -> usize {
    8
}
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(3)
}
fn default_water_every() -> u64 {
    60
}
fn default_stats_every() -> u64 {
    100
}
impl Default for RunSection {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            walk_speed: default_walk_speed(),
            rebuilds_per_tick: default_rebuilds_per_tick(),
            workers: default_workers(),
            water_every: default_water_every(),
            stats_every: default_stats_every(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(src: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut cfg: AppConfig = toml::from_str(src).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(fluid) = cfg.fluid {
            cfg.stream.fluid = fluid;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&src, path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.chunk_size == 0 {
            return Err(ConfigError::Invalid("world.chunk_size must be positive".into()));
        }
        if self.world.chunk_height < 2 {
            return Err(ConfigError::Invalid("world.chunk_height must be at least 2".into()));
        }
        if self.stream.generation_radius < 0 {
            return Err(ConfigError::Invalid(format!(
                "stream.generation_radius must not be negative, got {}",
                self.stream.generation_radius
            )));
        }
        if self.stream.evict_margin < 0 {
            return Err(ConfigError::Invalid(format!(
                "stream.evict_margin must not be negative, got {}",
                self.stream.evict_margin
            )));
        }
        Ok(())
    }

    pub fn worldgen_params(&self) -> Result<WorldGenParams, ConfigError> {
        match &self.world.worldgen {
            None => Ok(WorldGenParams::default()),
            Some(path) => load_params_from_path(path).map_err(|e| ConfigError::WorldGen {
                path: path.clone(),
                message: e.to_string(),
            }),
        }
    }
}
