//! Queued water spread across loaded chunks.
#![forbid(unsafe_code)]

use std::collections::VecDeque;

use hashbrown::HashSet;
use loam_blocks::BlockType;
use loam_chunk::{CellPos, ChunkStore};
use loam_world::ChunkCoord;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct FluidConfig {
    /// Lateral steps water may travel from its source before it stops spreading.
    #[serde(default = "default_max_spread")]
    pub max_spread: u8,
    /// Queue entries evaluated per `update` call.
    #[serde(default = "default_cells_per_tick")]
    pub cells_per_tick: usize,
}
fn default_max_spread() -> u8 {
    7
}
fn default_cells_per_tick() -> usize {
    4096
}
impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            max_spread: default_max_spread(),
            cells_per_tick: default_cells_per_tick(),
        }
    }
}

/// Outcome of one [`FluidSystem::update`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FluidTick {
    pub tick: u64,
    pub processed: usize,
    /// Cells put back because a flow target sits in a chunk that isn't loaded.
    pub deferred: usize,
    /// Cells turned from Air into Water, in the order they changed.
    pub changed: Vec<CellPos>,
}

impl FluidTick {
    /// Distinct chunks touched by `changed`.
    pub fn changed_chunks(&self) -> Vec<ChunkCoord> {
        let mut seen = HashSet::new();
        self.changed
            .iter()
            .map(|c| c.coord)
            .filter(|c| seen.insert(*c))
            .collect()
    }
}

const LATERAL: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

pub struct FluidSystem {
    cfg: FluidConfig,
    sx: usize,
    sy: usize,
    sz: usize,
    queue: VecDeque<CellPos>,
    queued: HashSet<CellPos>,
}

impl FluidSystem {
    pub fn new(cfg: FluidConfig, sx: usize, sy: usize, sz: usize) -> Self {
        Self {
            cfg,
            sx,
            sy,
            sz,
            queue: VecDeque::new(),
            queued: HashSet::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &FluidConfig {
        &self.cfg
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_queued(&self, cell: CellPos) -> bool {
        self.queued.contains(&cell)
    }

    /// Queue a cell given in `coord`-local coordinates, which may fall outside
    /// that chunk horizontally. Cells above or below the world are ignored.
    /// Returns false when nothing was added.
    pub fn enqueue(&mut self, coord: ChunkCoord, x: i32, y: i32, z: i32) -> bool {
        let Some(cell) = CellPos::new(coord, 0, 0, 0).step(x, y, z, self.sx, self.sy, self.sz) else {
            return false;
        };
        self.push(cell)
    }

    pub fn enqueue_cell(&mut self, cell: CellPos) -> bool {
        if cell.y >= self.sy || cell.x >= self.sx || cell.z >= self.sz {
            return false;
        }
        self.push(cell)
    }

    pub fn enqueue_many(&mut self, cells: impl IntoIterator<Item = CellPos>) -> usize {
        cells.into_iter().filter(|c| self.enqueue_cell(*c)).count()
    }

    /// Queue `cell` and its six face neighbors.
    pub fn enqueue_around(&mut self, cell: CellPos) -> usize {
        let (sx, sy, sz) = (self.sx, self.sy, self.sz);
        let mut n = usize::from(self.enqueue_cell(cell));
        for nb in cell.face_neighbors(sx, sy, sz) {
            n += usize::from(self.push(nb));
        }
        n
    }

    /// Drop queued cells in `coord`. Used when a chunk is evicted.
    pub fn forget_chunk(&mut self, coord: ChunkCoord) -> usize {
        let before = self.queue.len();
        self.queue.retain(|c| c.coord != coord);
        self.queued.retain(|c| c.coord != coord);
        before - self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.queued.clear();
    }

    fn push(&mut self, cell: CellPos) -> bool {
        if !self.queued.insert(cell) {
            return false;
        }
        self.queue.push_back(cell);
        true
    }

    /// Evaluate up to `cells_per_tick` cells that were queued before this call.
    ///
    /// Water falls into Air directly below if it can. Water resting on anything
    /// other than Air or Water spreads into lateral Air neighbors while its
    /// spread distance is under `max_spread`. Cells that change during the call
    /// are evaluated on the next one, so water advances one layer per tick.
    pub fn update<S: ChunkStore + ?Sized>(&mut self, tick: u64, store: &mut S) -> FluidTick {
        let (sx, sy, sz) = (self.sx, self.sy, self.sz);
        let budget = self.queue.len().min(self.cfg.cells_per_tick);
        let mut out = FluidTick {
            tick,
            ..FluidTick::default()
        };
        let mut fresh: Vec<CellPos> = Vec::new();
        let mut fresh_set: HashSet<CellPos> = HashSet::new();
        let mut retry: Vec<CellPos> = Vec::new();

        for _ in 0..budget {
            let Some(cell) = self.queue.pop_front() else {
                break;
            };
            self.queued.remove(&cell);
            if fresh_set.contains(&cell) {
                continue;
            }
            out.processed += 1;

            let Some(buf) = store.chunk(cell.coord) else {
                log::debug!(target: "fluid", "dropping {:?}: chunk {} not loaded", cell, cell.coord);
                continue;
            };
            let src = buf.idx(cell.x, cell.y, cell.z);
            if buf.kind_at(src) != Some(BlockType::Water) {
                continue;
            }
            let dist = buf.flow_distance(src);

            if let Some(below) = cell.step(0, -1, 0, sx, sy, sz) {
                let bi = buf.idx(below.x, below.y, below.z);
                match buf.kind_at(bi) {
                    Some(BlockType::Air) => {
                        if let Some(buf) = store.chunk_mut(below.coord) {
                            buf.set_at(bi, BlockType::Water);
                            buf.set_flow_distance(bi, dist);
                        }
                        out.changed.push(below);
                        fresh_set.insert(below);
                        fresh.push(below);
                        continue;
                    }
                    Some(BlockType::Water) => continue,
                    _ => {}
                }
            }

            if dist >= self.cfg.max_spread {
                continue;
            }
            let mut blocked = false;
            for (dx, dz) in LATERAL {
                let Some(next) = cell.step(dx, 0, dz, sx, sy, sz) else {
                    continue;
                };
                let Some(nbuf) = store.chunk_mut(next.coord) else {
                    blocked = true;
                    continue;
                };
                let ni = nbuf.idx(next.x, next.y, next.z);
                match nbuf.kind_at(ni) {
                    Some(BlockType::Air) => {
                        nbuf.set_at(ni, BlockType::Water);
                        nbuf.set_flow_distance(ni, dist + 1);
                        out.changed.push(next);
                        fresh_set.insert(next);
                        fresh.push(next);
                    }
                    // Flowing water reached sooner by this path: shorten it and
                    // let it spread again.
                    Some(BlockType::Water) if nbuf.flow_distance(ni) > dist + 1 => {
                        nbuf.set_flow_distance(ni, dist + 1);
                        retry.push(next);
                    }
                    _ => {}
                }
            }
            if blocked {
                out.deferred += 1;
                retry.push(cell);
            }
        }

        for cell in retry {
            self.push(cell);
        }
        for cell in fresh {
            self.push(cell);
            for nb in cell.face_neighbors(sx, sy, sz) {
                self.push(nb);
            }
        }

        if !out.changed.is_empty() || out.deferred > 0 {
            log::trace!(
                target: "fluid",
                "tick {}: processed={} changed={} deferred={} pending={}",
                tick,
                out.processed,
                out.changed.len(),
                out.deferred,
                self.queue.len()
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashMap;
    use loam_chunk::ChunkBuf;

    type Store = HashMap<ChunkCoord, ChunkBuf>;

    fn floor_chunk(coord: ChunkCoord, sx: usize, sy: usize, sz: usize) -> ChunkBuf {
        ChunkBuf::from_fn(coord, sx, sy, sz, |_, y, _| {
            Some(if y == 0 { BlockType::Stone } else { BlockType::Air })
        })
    }

    fn system(max_spread: u8) -> FluidSystem {
        FluidSystem::new(
            FluidConfig {
                max_spread,
                cells_per_tick: 4096,
            },
            8,
            6,
            8,
        )
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: FluidConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, FluidConfig::default());
        assert_eq!(cfg.max_spread, 7);
    }

    #[test]
    fn falls_before_spreading() {
        let c = ChunkCoord::new(0, 0);
        let mut store = Store::new();
        let mut buf = floor_chunk(c, 8, 6, 8);
        buf.set_local(3, 3, 3, BlockType::Water);
        store.insert(c, buf);
        let mut fluid = system(4);
        assert!(fluid.enqueue(c, 3, 3, 3));

        let t = fluid.update(1, &mut store);
        assert_eq!(t.changed, vec![CellPos::new(c, 3, 2, 3)]);
        assert_eq!(store[&c].kind_local(2, 3, 3), Some(BlockType::Air));

        let t = fluid.update(2, &mut store);
        assert!(t.changed.contains(&CellPos::new(c, 3, 1, 3)));
        assert_eq!(t.changed.len(), 1);
    }

    #[test]
    fn spreads_sideways_on_a_floor() {
        let c = ChunkCoord::new(0, 0);
        let mut store = Store::new();
        let mut buf = floor_chunk(c, 8, 6, 8);
        buf.set_local(3, 1, 3, BlockType::Water);
        store.insert(c, buf);
        let mut fluid = system(4);
        fluid.enqueue(c, 3, 1, 3);

        let t = fluid.update(1, &mut store);
        assert_eq!(t.changed.len(), 4);
        let b = &store[&c];
        for (x, z) in [(2, 3), (4, 3), (3, 2), (3, 4)] {
            assert_eq!(b.kind_local(x, 1, z), Some(BlockType::Water));
            assert_eq!(b.flow_distance(b.idx(x, 1, z)), 1);
        }
    }

    #[test]
    fn only_air_is_flooded() {
        let c = ChunkCoord::new(0, 0);
        let mut buf = ChunkBuf::new(c, 3, 3, 3);
        for (x, y, z) in [(1, 0, 1), (0, 1, 1), (1, 1, 0)] {
            buf.set_local(x, y, z, BlockType::Leaves);
        }
        buf.set_local(2, 1, 1, BlockType::Air);
        buf.set_local(1, 1, 1, BlockType::Water);
        // (1, 1, 2) stays empty, which is not Air.
        let mut store = Store::new();
        store.insert(c, buf);
        let mut fluid = FluidSystem::new(FluidConfig::default(), 3, 3, 3);
        fluid.enqueue(c, 1, 1, 1);
        let t = fluid.update(1, &mut store);
        assert_eq!(t.changed, vec![CellPos::new(c, 2, 1, 1)]);
        assert_eq!(store[&c].kind_local(1, 1, 2), None);
        assert_eq!(store[&c].kind_local(1, 0, 1), Some(BlockType::Leaves));
    }

    #[test]
    fn spread_is_bounded() {
        let c = ChunkCoord::new(0, 0);
        let mut store = Store::new();
        let mut buf = floor_chunk(c, 16, 4, 16);
        buf.set_local(8, 1, 8, BlockType::Water);
        store.insert(c, buf);
        let mut fluid = FluidSystem::new(
            FluidConfig {
                max_spread: 3,
                cells_per_tick: 64,
            },
            16,
            4,
            16,
        );
        fluid.enqueue(c, 8, 1, 8);
        for tick in 0..200 {
            if fluid.pending_len() == 0 {
                break;
            }
            fluid.update(tick, &mut store);
        }
        assert_eq!(fluid.pending_len(), 0);
        let b = &store[&c];
        let mut wet = 0;
        for z in 0..16 {
            for x in 0..16 {
                if b.kind_local(x, 1, z) == Some(BlockType::Water) {
                    wet += 1;
                    let d = (x as i32 - 8).abs() + (z as i32 - 8).abs();
                    assert!(d <= 3, "water at ({x}, {z})");
                    assert_eq!(b.flow_distance(b.idx(x, 1, z)) as i32, d);
                }
            }
        }
        assert_eq!(wet, 25);
        assert_eq!(b.count_kind(BlockType::Water), 25);
    }

    #[test]
    fn edge_flow_waits_for_neighbor_chunk() {
        let a = ChunkCoord::new(0, 0);
        let b = ChunkCoord::new(1, 0);
        let mut store = Store::new();
        let mut buf = floor_chunk(a, 8, 6, 8);
        buf.set_local(7, 1, 4, BlockType::Water);
        store.insert(a, buf);
        let mut fluid = system(4);
        fluid.enqueue(a, 7, 1, 4);

        let t = fluid.update(1, &mut store);
        assert_eq!(t.deferred, 1);
        assert_eq!(t.changed.len(), 3);
        assert!(fluid.is_queued(CellPos::new(a, 7, 1, 4)));

        store.insert(b, floor_chunk(b, 8, 6, 8));
        let mut reached = false;
        for tick in 2..6 {
            let t = fluid.update(tick, &mut store);
            reached |= t.changed.contains(&CellPos::new(b, 0, 1, 4));
        }
        assert!(reached);
        assert_eq!(store[&b].kind_local(0, 1, 4), Some(BlockType::Water));
    }

    #[test]
    fn cells_in_missing_chunks_are_dropped() {
        let mut store = Store::new();
        let mut fluid = system(4);
        fluid.enqueue(ChunkCoord::new(5, 5), 1, 1, 1);
        let t = fluid.update(1, &mut store);
        assert_eq!(t.processed, 1);
        assert_eq!(fluid.pending_len(), 0);
    }

    #[test]
    fn enqueue_normalizes_and_coalesces() {
        let mut fluid = system(4);
        let c = ChunkCoord::new(0, 0);
        assert!(fluid.enqueue(c, -1, 2, 3));
        assert!(fluid.is_queued(CellPos::new(ChunkCoord::new(-1, 0), 7, 2, 3)));
        assert!(!fluid.enqueue(ChunkCoord::new(-1, 0), 7, 2, 3));
        assert!(!fluid.enqueue(c, 0, -1, 0));
        assert!(!fluid.enqueue(c, 0, 6, 0));
        assert_eq!(fluid.pending_len(), 1);
        assert_eq!(fluid.forget_chunk(ChunkCoord::new(-1, 0)), 1);
        assert_eq!(fluid.pending_len(), 0);
    }

    #[test]
    fn update_respects_cell_budget() {
        let c = ChunkCoord::new(0, 0);
        let mut store = Store::new();
        store.insert(c, floor_chunk(c, 8, 6, 8));
        let mut fluid = FluidSystem::new(
            FluidConfig {
                max_spread: 4,
                cells_per_tick: 2,
            },
            8,
            6,
            8,
        );
        for x in 0..5 {
            fluid.enqueue(c, x, 3, 0);
        }
        let t = fluid.update(1, &mut store);
        assert_eq!(t.processed, 2);
        assert_eq!(fluid.pending_len(), 3);
    }
}
