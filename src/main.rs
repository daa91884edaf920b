mod config;
mod sim;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::LevelFilter;
use loam_chunk::GenerationPipeline;
use loam_runtime::{ChunkProvider, LocalProvider, WorkerProvider, WorldStreamer};

use crate::config::AppConfig;
use crate::sim::{Simulation, world_from};

#[derive(Parser, Debug)]
#[command(name = "loam", about = "Stream, light, and flood a procedural voxel world without a window")]
struct Cli {
    /// TOML config; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<i32>,
    /// Generation radius in chunks.
    #[arg(long)]
    radius: Option<i32>,
    #[arg(long)]
    ticks: Option<u64>,
    /// Generation threads; 0 generates on the main thread.
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(seed) = cli.seed {
        cfg.world.seed = seed;
    }
    if let Some(radius) = cli.radius {
        cfg.stream.generation_radius = radius;
    }
    if let Some(ticks) = cli.ticks {
        cfg.run.ticks = ticks;
    }
    if let Some(workers) = cli.workers {
        cfg.run.workers = workers;
    }
    cfg.validate()?;

    let params = cfg.worldgen_params()?;
    let world = world_from(cfg.world.seed, cfg.world.chunk_size, cfg.world.chunk_height, params);
    let pipeline = Arc::new(GenerationPipeline::standard());
    log::info!(
        "seed={} chunk={}x{}x{} radius={} steps={:?}",
        world.seed,
        world.chunk_size_x,
        world.chunk_size_y,
        world.chunk_size_z,
        cfg.stream.generation_radius,
        pipeline.step_names()
    );

    let provider: Box<dyn ChunkProvider> = if cfg.run.workers == 0 {
        Box::new(LocalProvider::new(world.clone(), pipeline))
    } else {
        Box::new(WorkerProvider::new(world.clone(), pipeline, cfg.run.workers)?)
    };
    let streamer = WorldStreamer::new(world, cfg.stream.clone(), provider);
    let summary = Simulation::new(streamer, cfg.run.clone()).run();

    let s = summary.stats;
    log::info!(
        "ran {} ticks in {:.2?}: live={} requested={} admitted={} evicted={} failed={} rebuilt={} edits={} water_drops={} fluid_cells={}",
        summary.ticks,
        summary.elapsed,
        summary.live,
        s.requested,
        s.admitted,
        summary.evicted,
        s.failed,
        summary.rebuilt,
        s.edits,
        summary.water_drops,
        s.fluid_cells
    );
    Ok(())
}
