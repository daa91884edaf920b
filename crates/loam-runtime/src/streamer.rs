//! Live-chunk registry and the streaming state machine around it.
//!
//! A coordinate is Unloaded, Pending (requested, result not yet admitted) or
//! Live. Live chunks carry a dirty flag that is set by admission, edits,
//! relighting and fluid flow, and cleared when the rebuild queue hands the
//! chunk to the sink.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crossbeam_channel::{Receiver, Sender, unbounded};
use hashbrown::{HashMap, HashSet};
use loam_blocks::BlockType;
use loam_chunk::{CellPos, ChunkBuf, ChunkStore};
use loam_fluid::{FluidConfig, FluidSystem, FluidTick};
use loam_lighting::{DEFAULT_MAX_ITERATIONS, calculate_cross_chunk_lighting, calculate_initial_sunlight};
use loam_world::{ChunkCoord, World};
use serde::Deserialize;

use crate::provider::{ChunkProvider, GenOut};

/// Receives chunk lifecycle notifications, typically a mesher or renderer.
/// `on_chunk_dirty` may be called again for a chunk it has already seen.
pub trait ChunkSink {
    fn on_chunk_dirty(&mut self, coord: ChunkCoord, buf: &ChunkBuf);
    fn on_chunk_evicted(&mut self, coord: ChunkCoord);
}

/// Sink that ignores everything.
#[derive(Default)]
pub struct NullSink;

impl ChunkSink for NullSink {
    fn on_chunk_dirty(&mut self, _coord: ChunkCoord, _buf: &ChunkBuf) {}
    fn on_chunk_evicted(&mut self, _coord: ChunkCoord) {}
}

#[derive(Clone, Debug)]
pub struct LiveChunk {
    pub buf: ChunkBuf,
    pub dirty: bool,
}

#[derive(Default)]
pub struct LiveChunks {
    map: HashMap<ChunkCoord, LiveChunk>,
}

impl LiveChunks {
    #[inline]
    pub fn get(&self, coord: ChunkCoord) -> Option<&LiveChunk> {
        self.map.get(&coord)
    }

    #[inline]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.map.contains_key(&coord)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.map.keys().copied()
    }

    pub fn dirty_count(&self) -> usize {
        self.map.values().filter(|c| c.dirty).count()
    }

    /// Set the dirty flag, queueing a rebuild on the clean to dirty edge.
    fn mark_dirty(&mut self, coord: ChunkCoord, rebuild_tx: &Sender<ChunkCoord>) -> bool {
        let Some(entry) = self.map.get_mut(&coord) else {
            return false;
        };
        if entry.dirty {
            return false;
        }
        entry.dirty = true;
        let _ = rebuild_tx.send(coord);
        true
    }
}

impl ChunkStore for LiveChunks {
    fn chunk(&self, coord: ChunkCoord) -> Option<&ChunkBuf> {
        self.map.get(&coord).map(|c| &c.buf)
    }

    fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut ChunkBuf> {
        self.map.get_mut(&coord).map(|c| &mut c.buf)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StreamConfig {
    /// Chebyshev radius, in chunks, kept generated around the observer.
    #[serde(default = "default_generation_radius")]
    pub generation_radius: i32,
    /// Extra chunks kept beyond the radius before eviction.
    #[serde(default)]
    pub evict_margin: i32,
    #[serde(default = "default_light_max_iterations")]
    pub light_max_iterations: usize,
    /// Relight a new chunk together with its live face neighbors.
    #[serde(default = "default_relight_neighbors_on_admit")]
    pub relight_neighbors_on_admit: bool,
    #[serde(default)]
    pub fluid: FluidConfig,
}
fn default_generation_radius() -> i32 {
    4
}
fn default_light_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}
fn default_relight_neighbors_on_admit() -> bool {
    true
}
impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            generation_radius: default_generation_radius(),
            evict_margin: 0,
            light_max_iterations: default_light_max_iterations(),
            relight_neighbors_on_admit: default_relight_neighbors_on_admit(),
            fluid: FluidConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Largest Chebyshev distance a live chunk may sit from the observer.
    #[inline]
    pub fn keep_radius(&self) -> i32 {
        self.generation_radius.max(0) + self.evict_margin.max(0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub requested: u64,
    pub admitted: u64,
    pub discarded_live: u64,
    pub discarded_out_of_range: u64,
    pub failed: u64,
    pub evicted: u64,
    pub rebuilds: u64,
    pub edits: u64,
    pub edits_rejected: u64,
    pub fluid_cells: u64,
}

fn read_registry(reg: &RwLock<LiveChunks>) -> RwLockReadGuard<'_, LiveChunks> {
    reg.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_registry(reg: &RwLock<LiveChunks>) -> RwLockWriteGuard<'_, LiveChunks> {
    reg.write().unwrap_or_else(PoisonError::into_inner)
}

/// `coord` plus whichever face neighbors share the face `(x, z)` lies on.
fn boundary_set(coord: ChunkCoord, x: usize, z: usize, sx: usize, sz: usize) -> Vec<ChunkCoord> {
    let mut out = vec![coord];
    if x == 0 {
        out.push(coord.offset(-1, 0));
    }
    if x + 1 == sx {
        out.push(coord.offset(1, 0));
    }
    if z == 0 {
        out.push(coord.offset(0, -1));
    }
    if z + 1 == sz {
        out.push(coord.offset(0, 1));
    }
    out
}

/// Owns the live chunks around one observer.
///
/// All mutation happens on the thread that owns the streamer; other threads
/// read through [`WorldStreamer::registry`]. Generation results cross over
/// exactly once, through the provider's reply channel.
pub struct WorldStreamer<P: ChunkProvider> {
    world: Arc<World>,
    cfg: StreamConfig,
    provider: P,
    registry: Arc<RwLock<LiveChunks>>,
    pending: HashSet<ChunkCoord>,
    res_tx: Sender<GenOut>,
    res_rx: Receiver<GenOut>,
    rebuild_tx: Sender<ChunkCoord>,
    rebuild_rx: Receiver<ChunkCoord>,
    fluid: FluidSystem,
    center: Option<ChunkCoord>,
    next_job_id: u64,
    stats: StreamStats,
}

impl<P: ChunkProvider> WorldStreamer<P> {
    pub fn new(world: Arc<World>, cfg: StreamConfig, provider: P) -> Self {
        let (res_tx, res_rx) = unbounded();
        let (rebuild_tx, rebuild_rx) = unbounded();
        let fluid = FluidSystem::new(
            cfg.fluid,
            world.chunk_size_x,
            world.chunk_size_y,
            world.chunk_size_z,
        );
        Self {
            world,
            cfg,
            provider,
            registry: Arc::new(RwLock::new(LiveChunks::default())),
            pending: HashSet::new(),
            res_tx,
            res_rx,
            rebuild_tx,
            rebuild_rx,
            fluid,
            center: None,
            next_job_id: 0,
            stats: StreamStats::default(),
        }
    }

    #[inline]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[inline]
    pub fn config(&self) -> &StreamConfig {
        &self.cfg
    }

    #[inline]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Shared read handle on the live chunks.
    pub fn registry(&self) -> Arc<RwLock<LiveChunks>> {
        Arc::clone(&self.registry)
    }

    #[inline]
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    #[inline]
    pub fn center(&self) -> Option<ChunkCoord> {
        self.center
    }

    pub fn is_live(&self, coord: ChunkCoord) -> bool {
        read_registry(&self.registry).contains(coord)
    }

    #[inline]
    pub fn is_pending(&self, coord: ChunkCoord) -> bool {
        self.pending.contains(&coord)
    }

    pub fn live_count(&self) -> usize {
        read_registry(&self.registry).len()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn fluid_pending(&self) -> usize {
        self.fluid.pending_len()
    }

    pub fn block_at_world(&self, wx: i32, wy: i32, wz: i32) -> Option<BlockType> {
        let coord = self.world.chunk_of_world(wx, wz);
        let reg = read_registry(&self.registry);
        reg.chunk(coord)?.get_world(wx, wy, wz).map(|b| b.kind)
    }

    /// Ask the provider for `coord` unless it is already live or pending.
    pub fn request_chunk(&mut self, coord: ChunkCoord) -> bool {
        if self.pending.contains(&coord) || self.is_live(coord) {
            return false;
        }
        self.pending.insert(coord);
        let job_id = self.next_job_id;
        self.next_job_id += 1;
        self.stats.requested += 1;
        log::trace!(target: "stream", "request {} job={}", coord, job_id);
        self.provider.request(coord, job_id, self.res_tx.clone());
        true
    }

    /// Move every finished generation result into the registry. Returns how
    /// many chunks became live.
    pub fn admit_pending_chunks(&mut self) -> usize {
        let ready: Vec<GenOut> = self.res_rx.try_iter().collect();
        let mut admitted = 0;
        for out in ready {
            let coord = out.coord;
            self.pending.remove(&coord);
            let generated = match out.result {
                Ok(generated) => generated,
                Err(e) => {
                    self.stats.failed += 1;
                    log::warn!(target: "stream", "generation failed for chunk {}: {}", coord, e);
                    continue;
                }
            };
            if self.is_live(coord) {
                self.stats.discarded_live += 1;
                log::debug!(target: "stream", "chunk {} already live; dropping job {}", coord, out.job_id);
                continue;
            }
            let keep = self.cfg.keep_radius();
            if self.center.is_some_and(|center| center.chebyshev(coord) > keep) {
                self.stats.discarded_out_of_range += 1;
                log::debug!(target: "stream", "chunk {} left range before admission", coord);
                continue;
            }

            let mut buf = generated.buf;
            calculate_initial_sunlight(&mut buf);
            let mut reg = write_registry(&self.registry);
            reg.map.insert(coord, LiveChunk { buf, dirty: false });
            reg.mark_dirty(coord, &self.rebuild_tx);
            if self.cfg.relight_neighbors_on_admit {
                let mut set = vec![coord];
                set.extend(coord.face_neighbors().into_iter().filter(|c| reg.contains(*c)));
                if set.len() > 1 {
                    let report =
                        calculate_cross_chunk_lighting(&mut *reg, &set, self.cfg.light_max_iterations);
                    for c in report.changed {
                        reg.mark_dirty(c, &self.rebuild_tx);
                    }
                }
            }
            drop(reg);
            self.stats.admitted += 1;
            admitted += 1;
            log::debug!(
                target: "stream",
                "admitted chunk {} (gen {}ms, {:?})",
                coord,
                out.t_gen_ms,
                generated.biome.map(|b| b.biome)
            );
        }
        admitted
    }

    /// Track an observer at world position `(wx, wz)`. Does nothing unless the
    /// observer entered a different chunk since the last call; otherwise
    /// requests every missing chunk in range and evicts the ones outside it.
    /// Returns whether the observer chunk changed.
    pub fn update_streaming(&mut self, wx: f32, wz: f32, sink: &mut dyn ChunkSink) -> bool {
        let coord = self
            .world
            .chunk_of_world(wx.floor() as i32, wz.floor() as i32);
        if self.center == Some(coord) {
            return false;
        }
        self.center = Some(coord);

        let r = self.cfg.generation_radius.max(0);
        let mut wanted: Vec<ChunkCoord> = (-r..=r)
            .flat_map(|dz| (-r..=r).map(move |dx| coord.offset(dx, dz)))
            .collect();
        wanted.sort_by_key(|c| c.distance_sq(coord));
        let mut requested = 0;
        for c in wanted {
            if self.request_chunk(c) {
                requested += 1;
            }
        }

        let keep = self.cfg.keep_radius();
        let evicted = {
            let mut reg = write_registry(&self.registry);
            let far: Vec<ChunkCoord> = reg.coords().filter(|c| c.chebyshev(coord) > keep).collect();
            for c in &far {
                reg.map.remove(c);
            }
            far
        };
        for &c in &evicted {
            self.fluid.forget_chunk(c);
            sink.on_chunk_evicted(c);
        }
        self.stats.evicted += evicted.len() as u64;
        log::debug!(
            target: "stream",
            "observer entered {}: requested {}, evicted {}",
            coord,
            requested,
            evicted.len()
        );
        true
    }

    /// Write `kind` at local `(x, y, z)` of a live chunk. Marks the chunk and
    /// any neighbor sharing the touched face dirty, relights that set (plus
    /// whatever neighbors the light change reaches), and
    /// queues the cell and its six neighbors for fluid updates. Returns false
    /// for out-of-bounds positions and chunks that aren't live.
    pub fn apply_block_edit(&mut self, coord: ChunkCoord, x: i32, y: i32, z: i32, kind: BlockType) -> bool {
        let (sx, sy, sz) = (
            self.world.chunk_size_x,
            self.world.chunk_size_y,
            self.world.chunk_size_z,
        );
        if x < 0 || y < 0 || z < 0 || x as usize >= sx || y as usize >= sy || z as usize >= sz {
            self.stats.edits_rejected += 1;
            log::debug!(target: "stream", "edit out of bounds: {} ({}, {}, {})", coord, x, y, z);
            return false;
        }
        let (x, y, z) = (x as usize, y as usize, z as usize);
        let mut reg = write_registry(&self.registry);
        let Some(buf) = reg.chunk_mut(coord) else {
            self.stats.edits_rejected += 1;
            return false;
        };
        buf.set_local(x, y, z, kind);

        let affected = boundary_set(coord, x, z, sx, sz);
        for &c in &affected {
            reg.mark_dirty(c, &self.rebuild_tx);
        }
        let report = calculate_cross_chunk_lighting(&mut *reg, &affected, self.cfg.light_max_iterations);
        for c in report.changed {
            reg.mark_dirty(c, &self.rebuild_tx);
        }
        drop(reg);

        self.fluid.enqueue_around(CellPos::new(coord, x, y, z));
        self.stats.edits += 1;
        true
    }

    /// [`Self::apply_block_edit`] addressed by world coordinates.
    pub fn set_block_world(&mut self, wx: i32, wy: i32, wz: i32, kind: BlockType) -> bool {
        let coord = self.world.chunk_of_world(wx, wz);
        let (ox, oz) = self.world.chunk_origin(coord);
        self.apply_block_edit(coord, wx - ox, wy, wz - oz, kind)
    }

    /// Advance fluids one tick, then mark and relight every chunk they touched.
    pub fn step_fluids(&mut self, tick: u64) -> FluidTick {
        let (sx, sz) = (self.world.chunk_size_x, self.world.chunk_size_z);
        let mut reg = write_registry(&self.registry);
        let out = self.fluid.update(tick, &mut *reg);
        if out.changed.is_empty() {
            return out;
        }
        let mut seen = HashSet::new();
        let mut affected = Vec::new();
        for cell in &out.changed {
            for c in boundary_set(cell.coord, cell.x, cell.z, sx, sz) {
                if seen.insert(c) && reg.contains(c) {
                    affected.push(c);
                }
            }
        }
        for &c in &affected {
            reg.mark_dirty(c, &self.rebuild_tx);
        }
        let report = calculate_cross_chunk_lighting(&mut *reg, &affected, self.cfg.light_max_iterations);
        for c in report.changed {
            reg.mark_dirty(c, &self.rebuild_tx);
        }
        self.stats.fluid_cells += out.changed.len() as u64;
        out
    }

    /// Hand at most `max_per_tick` dirty chunks to `sink`, clearing their flag.
    ///
    /// The write lock is only held to clear the flag; the sink sees the chunk
    /// under a read lock so other readers of the registry are not held up.
    pub fn process_rebuild_queue(&mut self, max_per_tick: usize, sink: &mut dyn ChunkSink) -> usize {
        let mut done = 0;
        while done < max_per_tick {
            let Ok(coord) = self.rebuild_rx.try_recv() else {
                break;
            };
            let claimed = match write_registry(&self.registry).map.get_mut(&coord) {
                Some(entry) if entry.dirty => {
                    entry.dirty = false;
                    true
                }
                // Evicted, or already rebuilt through an older entry.
                _ => false,
            };
            if !claimed {
                continue;
            }
            let reg = read_registry(&self.registry);
            if let Some(entry) = reg.get(coord) {
                sink.on_chunk_dirty(coord, &entry.buf);
            }
            done += 1;
        }
        self.stats.rebuilds += done as u64;
        done
    }

    /// Live chunks still waiting for a rebuild.
    pub fn rebuild_backlog(&self) -> usize {
        read_registry(&self.registry).dirty_count()
    }
}
