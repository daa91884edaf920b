//! Headless driver: walks an observer through the world and keeps the
//! streamer, fluids, and rebuild queue ticking.

use std::sync::Arc;
use std::time::{Duration, Instant};

use loam_blocks::BlockType;
use loam_chunk::ChunkBuf;
use loam_runtime::{ChunkProvider, ChunkSink, StreamStats, WorldStreamer};
use loam_world::{ChunkCoord, World, WorldGenParams};

use crate::config::RunSection;

/// Stands in for a mesher: counts what it would rebuild.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub rebuilt: u64,
    pub evicted: u64,
    pub solid_blocks: u64,
}

impl ChunkSink for CountingSink {
    fn on_chunk_dirty(&mut self, coord: ChunkCoord, buf: &ChunkBuf) {
        let solid = buf.blocks.iter().flatten().filter(|b| b.kind.is_solid()).count();
        log::trace!(target: "stream", "rebuild {} ({} solid)", coord, solid);
        self.rebuilt += 1;
        self.solid_blocks += solid as u64;
    }

    fn on_chunk_evicted(&mut self, coord: ChunkCoord) {
        log::trace!(target: "stream", "evict {}", coord);
        self.evicted += 1;
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub ticks: u64,
    pub live: usize,
    pub stats: StreamStats,
    pub rebuilt: u64,
    pub evicted: u64,
    pub water_drops: u64,
    pub elapsed: Duration,
}

pub struct Simulation<P: ChunkProvider> {
    streamer: WorldStreamer<P>,
    sink: CountingSink,
    run: RunSection,
    water_drops: u64,
}

impl<P: ChunkProvider> Simulation<P> {
    pub fn new(streamer: WorldStreamer<P>, run: RunSection) -> Self {
        Self {
            streamer,
            sink: CountingSink::default(),
            run,
            water_drops: 0,
        }
    }

    #[inline]
    pub fn streamer(&self) -> &WorldStreamer<P> {
        &self.streamer
    }

    fn observer_at(&self, tick: u64) -> (f32, f32) {
        let x = tick as f32 * self.run.walk_speed;
        let z = (tick as f32 * 0.01).sin() * 24.0;
        (x, z)
    }

    /// Place water one block above the highest non-air block at the column,
    /// unless that block is already water.
    fn drop_water(&mut self, wx: i32, wz: i32) -> bool {
        let sy = self.streamer.world().chunk_size_y as i32;
        let surface = (0..sy).rev().find_map(|y| {
            self.streamer
                .block_at_world(wx, y, wz)
                .filter(|k| *k != BlockType::Air)
                .map(|k| (y, k))
        });
        let Some((y, kind)) = surface else {
            return false;
        };
        if kind == BlockType::Water || y + 1 >= sy {
            return false;
        }
        self.streamer.set_block_world(wx, y + 1, wz, BlockType::Water)
    }

    pub fn tick(&mut self, tick: u64) {
        let (x, z) = self.observer_at(tick);
        self.streamer.update_streaming(x, z, &mut self.sink);
        self.streamer.admit_pending_chunks();
        if self.run.water_every > 0
            && tick % self.run.water_every == 0
            && self.drop_water(x.floor() as i32 + 3, z.floor() as i32)
        {
            self.water_drops += 1;
        }
        self.streamer.step_fluids(tick);
        self.streamer
            .process_rebuild_queue(self.run.rebuilds_per_tick, &mut self.sink);

        if self.run.stats_every > 0 && tick % self.run.stats_every == 0 {
            let s = self.streamer.stats();
            log::info!(
                target: "stream",
                "tick {} at ({:.1}, {:.1}): live={} pending={} admitted={} evicted={} failed={} rebuild_backlog={} fluid_queue={}",
                tick,
                x,
                z,
                self.streamer.live_count(),
                self.streamer.pending_count(),
                s.admitted,
                s.evicted,
                s.failed,
                self.streamer.rebuild_backlog(),
                self.streamer.fluid_pending()
            );
        }
    }

    /// Admit outstanding results until none are pending or `timeout` passes.
    pub fn settle(&mut self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while self.streamer.pending_count() > 0 && Instant::now() < deadline {
            if self.streamer.admit_pending_chunks() == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        self.streamer.process_rebuild_queue(usize::MAX, &mut self.sink);
    }

    pub fn run(mut self) -> RunSummary {
        let t0 = Instant::now();
        for tick in 0..self.run.ticks {
            self.tick(tick);
        }
        self.settle(Duration::from_secs(10));
        RunSummary {
            ticks: self.run.ticks,
            live: self.streamer.live_count(),
            stats: self.streamer.stats(),
            rebuilt: self.sink.rebuilt,
            evicted: self.sink.evicted,
            water_drops: self.water_drops,
            elapsed: t0.elapsed(),
        }
    }
}

pub fn world_from(
    seed: i32,
    chunk_size: usize,
    chunk_height: usize,
    params: WorldGenParams,
) -> Arc<World> {
    Arc::new(World::with_dims(chunk_size, chunk_height, chunk_size, seed, params))
}
