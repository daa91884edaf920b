use std::collections::BTreeMap;

use hashbrown::HashMap;
use loam_blocks::{BlockEntity, BlockType};
use loam_world::ChunkCoord;

/// Dense `sx * sy * sz` block grid for one chunk, plus per-block light.
///
/// `None` marks a cell that was never generated or was cleared; it is not the
/// same as an explicit `Air` block, though both are non-solid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkBuf {
    pub coord: ChunkCoord,
    pub sx: usize,
    pub sy: usize,
    pub sz: usize,
    pub blocks: Vec<Option<BlockEntity>>,
    pub light: Vec<u8>,
    // Spread distance of flowing water; sources have no entry.
    flow: HashMap<usize, u8>,
    next_id: u64,
}

impl ChunkBuf {
    pub fn new(coord: ChunkCoord, sx: usize, sy: usize, sz: usize) -> Self {
        let n = sx * sy * sz;
        Self {
            coord,
            sx,
            sy,
            sz,
            blocks: vec![None; n],
            light: vec![0; n],
            flow: HashMap::new(),
            next_id: 0,
        }
    }

    /// Build from a linear list of kinds; ids are assigned in index order.
    pub fn from_kinds_local(
        coord: ChunkCoord,
        sx: usize,
        sy: usize,
        sz: usize,
        kinds: Vec<Option<BlockType>>,
    ) -> Self {
        let mut buf = Self::new(coord, sx, sy, sz);
        let expect = buf.len();
        for (i, kind) in kinds.into_iter().take(expect).enumerate() {
            if let Some(kind) = kind {
                buf.set_at(i, kind);
            }
        }
        buf
    }

    pub fn from_fn(
        coord: ChunkCoord,
        sx: usize,
        sy: usize,
        sz: usize,
        fill: impl Fn(usize, usize, usize) -> Option<BlockType>,
    ) -> Self {
        let mut buf = Self::new(coord, sx, sy, sz);
        for y in 0..sy {
            for z in 0..sz {
                for x in 0..sx {
                    if let Some(kind) = fill(x, y, z) {
                        buf.set_local(x, y, z, kind);
                    }
                }
            }
        }
        buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sx * self.sy * self.sz
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.sz + z) * self.sx + x
    }

    #[inline]
    pub fn coords_of(&self, idx: usize) -> (usize, usize, usize) {
        let x = idx % self.sx;
        let z = (idx / self.sx) % self.sz;
        let y = idx / (self.sx * self.sz);
        (x, y, z)
    }

    /// Index for signed local coordinates, or `None` when outside the grid.
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        if x < 0 || y < 0 || z < 0 {
            return None;
        }
        let (x, y, z) = (x as usize, y as usize, z as usize);
        if x >= self.sx || y >= self.sy || z >= self.sz {
            return None;
        }
        Some(self.idx(x, y, z))
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> Option<BlockEntity> {
        self.blocks[self.idx(x, y, z)]
    }

    #[inline]
    pub fn kind_local(&self, x: usize, y: usize, z: usize) -> Option<BlockType> {
        self.kind_at(self.idx(x, y, z))
    }

    #[inline]
    pub fn kind_at(&self, idx: usize) -> Option<BlockType> {
        self.blocks[idx].map(|b| b.kind)
    }

    /// Place a block, stamping it with the next per-chunk id.
    pub fn set_at(&mut self, idx: usize, kind: BlockType) -> BlockEntity {
        let entity = BlockEntity::new(self.next_id, kind);
        self.next_id += 1;
        self.blocks[idx] = Some(entity);
        self.flow.remove(&idx);
        entity
    }

    #[inline]
    pub fn set_local(&mut self, x: usize, y: usize, z: usize, kind: BlockType) -> BlockEntity {
        let i = self.idx(x, y, z);
        self.set_at(i, kind)
    }

    pub fn clear_local(&mut self, x: usize, y: usize, z: usize) {
        let i = self.idx(x, y, z);
        self.blocks[i] = None;
        self.flow.remove(&i);
    }

    /// Id the next placed block will receive.
    #[inline]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    #[inline]
    pub fn light_local(&self, x: usize, y: usize, z: usize) -> u8 {
        self.light[self.idx(x, y, z)]
    }

    #[inline]
    pub fn flow_distance(&self, idx: usize) -> u8 {
        self.flow.get(&idx).copied().unwrap_or(0)
    }

    pub fn set_flow_distance(&mut self, idx: usize, dist: u8) {
        if dist == 0 {
            self.flow.remove(&idx);
        } else {
            self.flow.insert(idx, dist);
        }
    }

    #[inline]
    pub fn contains_world(&self, wx: i32, wy: i32, wz: i32) -> bool {
        self.world_to_local(wx, wy, wz).is_some()
    }

    pub fn world_to_local(&self, wx: i32, wy: i32, wz: i32) -> Option<(usize, usize, usize)> {
        let base_x = self.coord.cx * self.sx as i32;
        let base_z = self.coord.cz * self.sz as i32;
        if wy < 0 || wy >= self.sy as i32 {
            return None;
        }
        if wx < base_x || wx >= base_x + self.sx as i32 || wz < base_z || wz >= base_z + self.sz as i32
        {
            return None;
        }
        Some(((wx - base_x) as usize, wy as usize, (wz - base_z) as usize))
    }

    #[inline]
    pub fn get_world(&self, wx: i32, wy: i32, wz: i32) -> Option<BlockEntity> {
        let (x, y, z) = self.world_to_local(wx, wy, wz)?;
        self.get_local(x, y, z)
    }

    /// Highest cell in the column holding anything other than air.
    pub fn top_non_air(&self, x: usize, z: usize) -> Option<usize> {
        (0..self.sy)
            .rev()
            .find(|&y| matches!(self.kind_local(x, y, z), Some(k) if k != BlockType::Air))
    }

    /// Highest solid cell in the column.
    pub fn top_solid(&self, x: usize, z: usize) -> Option<usize> {
        (0..self.sy)
            .rev()
            .find(|&y| matches!(self.kind_local(x, y, z), Some(k) if k.is_solid()))
    }

    #[inline]
    pub fn has_non_air(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| matches!(b, Some(e) if !e.is_air()))
    }

    pub fn count_kind(&self, kind: BlockType) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Some(e) if e.kind == kind))
            .count()
    }

    /// Multiset of placed block kinds.
    pub fn kind_counts(&self) -> BTreeMap<BlockType, usize> {
        let mut out = BTreeMap::new();
        for b in self.blocks.iter().flatten() {
            *out.entry(b.kind).or_insert(0) += 1;
        }
        out
    }
}
