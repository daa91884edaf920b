//! Sunlight and cross-chunk light relaxation.
#![forbid(unsafe_code)]

use std::collections::VecDeque;

use hashbrown::HashSet;
use loam_blocks::{BlockType, Opacity};
use loam_chunk::{ChunkBuf, ChunkStore};
use loam_world::ChunkCoord;

pub const MAX_LIGHT: u8 = 15;

/// Guard for [`calculate_cross_chunk_lighting`] when callers have no preference.
pub const DEFAULT_MAX_ITERATIONS: usize = 16;

#[inline]
fn opacity_of(kind: Option<BlockType>) -> Opacity {
    kind.map_or(Opacity::Clear, BlockType::opacity)
}

/// Light leaving a chunk through each lateral face.
///
/// X faces are indexed `y * sz + z`, Z faces `y * sx + x`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightBorders {
    pub xn: Vec<u8>,
    pub xp: Vec<u8>,
    pub zn: Vec<u8>,
    pub zp: Vec<u8>,
}

impl LightBorders {
    pub fn new(sx: usize, sy: usize, sz: usize) -> Self {
        Self {
            xn: vec![0; sy * sz],
            xp: vec![0; sy * sz],
            zn: vec![0; sy * sx],
            zp: vec![0; sy * sx],
        }
    }

    pub fn from_buf(buf: &ChunkBuf) -> Self {
        let (sx, sy, sz) = (buf.sx, buf.sy, buf.sz);
        let mut b = Self::new(sx, sy, sz);
        for y in 0..sy {
            for z in 0..sz {
                b.xn[y * sz + z] = buf.light_local(0, y, z);
                b.xp[y * sz + z] = buf.light_local(sx - 1, y, z);
            }
            for x in 0..sx {
                b.zn[y * sx + x] = buf.light_local(x, y, 0);
                b.zp[y * sx + x] = buf.light_local(x, y, sz - 1);
            }
        }
        b
    }

    /// Neighbors of `coord` across every face whose plane differs from `other`.
    pub fn changed_neighbors(&self, other: &Self, coord: ChunkCoord) -> Vec<ChunkCoord> {
        let mut out = Vec::new();
        if self.xn != other.xn {
            out.push(coord.offset(-1, 0));
        }
        if self.xp != other.xp {
            out.push(coord.offset(1, 0));
        }
        if self.zn != other.zn {
            out.push(coord.offset(0, -1));
        }
        if self.zp != other.zp {
            out.push(coord.offset(0, 1));
        }
        out
    }
}

/// Light entering a chunk from each lateral neighbor. `None` means the
/// neighbor is not loaded and the face is treated as open sky.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NeighborBorders {
    pub xn: Option<Vec<u8>>,
    pub xp: Option<Vec<u8>>,
    pub zn: Option<Vec<u8>>,
    pub zp: Option<Vec<u8>>,
}

impl NeighborBorders {
    pub fn open_sky() -> Self {
        Self::default()
    }

    /// Each neighbor contributes the face touching `coord`: the -X neighbor
    /// its +X plane, and so on.
    pub fn from_store<S: ChunkStore + ?Sized>(store: &S, coord: ChunkCoord) -> Self {
        let plane = |dx: i32, dz: i32| store.chunk(coord.offset(dx, dz)).map(LightBorders::from_buf);
        Self {
            xn: plane(-1, 0).map(|b| b.xp),
            xp: plane(1, 0).map(|b| b.xn),
            zn: plane(0, -1).map(|b| b.zp),
            zp: plane(0, 1).map(|b| b.zn),
        }
    }
}

/// Compute the full light field for `buf` given its neighbors' border planes.
///
/// Pass one scans each column top-down: clear cells keep the level,
/// translucent cells subtract their attenuation, and the first opaque cell
/// drops the rest of the column to 0. Pass two is a BFS that spreads light
/// sideways and into overhangs, losing one level per step plus the entered
/// cell's attenuation, seeded by the scan and by the lateral faces.
pub fn compute_light(buf: &ChunkBuf, nb: &NeighborBorders) -> Vec<u8> {
    let (sx, sy, sz) = (buf.sx, buf.sy, buf.sz);
    let mut light = vec![0u8; buf.len()];
    if buf.is_empty() {
        return light;
    }
    let mut q: VecDeque<usize> = VecDeque::new();

    for z in 0..sz {
        for x in 0..sx {
            let mut level = MAX_LIGHT;
            for y in (0..sy).rev() {
                let i = buf.idx(x, y, z);
                match opacity_of(buf.kind_at(i)) {
                    Opacity::Clear => {}
                    Opacity::Translucent(a) => level = level.saturating_sub(a),
                    Opacity::Opaque => level = 0,
                }
                light[i] = level;
                if level > 1 {
                    q.push_back(i);
                }
            }
        }
    }

    let seed = |i: usize, incoming: u8, light: &mut [u8], q: &mut VecDeque<usize>| {
        let att = match opacity_of(buf.kind_at(i)) {
            Opacity::Opaque => return,
            Opacity::Translucent(a) => a,
            Opacity::Clear => 0,
        };
        let cand = incoming.saturating_sub(1 + att);
        if cand > light[i] {
            light[i] = cand;
            q.push_back(i);
        }
    };
    let from = |plane: &Option<Vec<u8>>, k: usize| plane.as_ref().map_or(MAX_LIGHT, |p| p[k]);
    for y in 0..sy {
        for z in 0..sz {
            seed(buf.idx(0, y, z), from(&nb.xn, y * sz + z), &mut light, &mut q);
            seed(buf.idx(sx - 1, y, z), from(&nb.xp, y * sz + z), &mut light, &mut q);
        }
        for x in 0..sx {
            seed(buf.idx(x, y, 0), from(&nb.zn, y * sx + x), &mut light, &mut q);
            seed(buf.idx(x, y, sz - 1), from(&nb.zp, y * sx + x), &mut light, &mut q);
        }
    }

    while let Some(i) = q.pop_front() {
        let level = light[i];
        if level <= 1 {
            continue;
        }
        let (x, y, z) = buf.coords_of(i);
        let (x, y, z) = (x as i32, y as i32, z as i32);
        for (dx, dy, dz) in [(-1, 0, 0), (1, 0, 0), (0, -1, 0), (0, 1, 0), (0, 0, -1), (0, 0, 1)] {
            let Some(j) = buf.in_bounds(x + dx, y + dy, z + dz) else {
                continue;
            };
            let att = match opacity_of(buf.kind_at(j)) {
                Opacity::Opaque => continue,
                Opacity::Translucent(a) => a,
                Opacity::Clear => 0,
            };
            let cand = level.saturating_sub(1 + att);
            if cand > light[j] {
                light[j] = cand;
                q.push_back(j);
            }
        }
    }
    light
}

/// Recompute `buf`'s light in place. Returns true if any value changed.
pub fn relight_chunk(buf: &mut ChunkBuf, nb: &NeighborBorders) -> bool {
    let light = compute_light(buf, nb);
    if light == buf.light {
        return false;
    }
    buf.light = light;
    true
}

/// Light a freshly generated chunk on its own, every lateral face open to the sky.
pub fn calculate_initial_sunlight(buf: &mut ChunkBuf) -> bool {
    relight_chunk(buf, &NeighborBorders::open_sky())
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LightingReport {
    pub iterations: usize,
    /// Chunks whose light changed at least once, in first-change order.
    pub changed: Vec<ChunkCoord>,
    pub converged: bool,
}

/// Relight `coords` against their current neighbors until nothing changes or
/// `max_iterations` passes have run.
///
/// When a relight changes a chunk's border plane, the loaded neighbor across
/// that face joins the set, so light that leaked through a now-sealed face is
/// withdrawn on both sides. Coordinates with no loaded chunk are skipped.
pub fn calculate_cross_chunk_lighting<S: ChunkStore + ?Sized>(
    store: &mut S,
    coords: &[ChunkCoord],
    max_iterations: usize,
) -> LightingReport {
    let mut members = HashSet::new();
    let mut set: Vec<ChunkCoord> = coords.iter().copied().filter(|c| members.insert(*c)).collect();
    let requested = set.len();
    let mut report = LightingReport::default();
    let mut changed = HashSet::new();
    for pass in 0..max_iterations.max(1) {
        let mut any = false;
        let mut k = 0;
        while k < set.len() {
            let c = set[k];
            k += 1;
            let Some(before) = store.chunk(c).map(LightBorders::from_buf) else {
                continue;
            };
            let nb = NeighborBorders::from_store(store, c);
            let Some(buf) = store.chunk_mut(c) else {
                continue;
            };
            if !relight_chunk(buf, &nb) {
                continue;
            }
            let after = LightBorders::from_buf(buf);
            any = true;
            if changed.insert(c) {
                report.changed.push(c);
            }
            for n in before.changed_neighbors(&after, c) {
                if store.chunk(n).is_some() && members.insert(n) {
                    set.push(n);
                }
            }
        }
        report.iterations = pass + 1;
        if !any {
            report.converged = true;
            break;
        }
    }
    if set.len() > requested {
        log::trace!(
            target: "light",
            "relight grew from {} to {} chunks",
            requested,
            set.len()
        );
    }
    if !report.converged {
        log::warn!(
            target: "light",
            "cross-chunk lighting over {} chunks did not settle after {} passes",
            set.len(),
            report.iterations
        );
    }
    report
}
