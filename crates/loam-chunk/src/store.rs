use std::collections::HashMap as StdHashMap;
use std::hash::BuildHasher;

use hashbrown::HashMap;
use loam_world::ChunkCoord;

use crate::ChunkBuf;

/// Lookup of live chunks by coordinate. Neighbors are always a fresh lookup.
pub trait ChunkStore {
    fn chunk(&self, coord: ChunkCoord) -> Option<&ChunkBuf>;
    fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut ChunkBuf>;
}

impl<S: BuildHasher> ChunkStore for HashMap<ChunkCoord, ChunkBuf, S> {
    fn chunk(&self, coord: ChunkCoord) -> Option<&ChunkBuf> {
        self.get(&coord)
    }

    fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut ChunkBuf> {
        self.get_mut(&coord)
    }
}

impl<S: BuildHasher> ChunkStore for StdHashMap<ChunkCoord, ChunkBuf, S> {
    fn chunk(&self, coord: ChunkCoord) -> Option<&ChunkBuf> {
        self.get(&coord)
    }

    fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut ChunkBuf> {
        self.get_mut(&coord)
    }
}

/// A block position addressed as chunk + local coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellPos {
    pub coord: ChunkCoord,
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl CellPos {
    #[inline]
    pub fn new(coord: ChunkCoord, x: usize, y: usize, z: usize) -> Self {
        Self { coord, x, y, z }
    }

    /// Step by a signed local offset, carrying across horizontal chunk edges.
    /// Returns `None` when the result leaves the vertical range.
    pub fn step(self, dx: i32, dy: i32, dz: i32, sx: usize, sy: usize, sz: usize) -> Option<Self> {
        let y = self.y as i32 + dy;
        if y < 0 || y >= sy as i32 {
            return None;
        }
        let x = self.x as i32 + dx;
        let z = self.z as i32 + dz;
        let (sxi, szi) = (sx as i32, sz as i32);
        let coord = self.coord.offset(x.div_euclid(sxi), z.div_euclid(szi));
        Some(Self {
            coord,
            x: x.rem_euclid(sxi) as usize,
            y: y as usize,
            z: z.rem_euclid(szi) as usize,
        })
    }

    /// The six face-adjacent cells that stay inside the vertical range.
    pub fn face_neighbors(self, sx: usize, sy: usize, sz: usize) -> impl Iterator<Item = CellPos> {
        const DIRS: [(i32, i32, i32); 6] = [
            (0, 1, 0),
            (0, -1, 0),
            (-1, 0, 0),
            (1, 0, 0),
            (0, 0, -1),
            (0, 0, 1),
        ];
        DIRS.into_iter()
            .filter_map(move |(dx, dy, dz)| self.step(dx, dy, dz, sx, sy, sz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_carries_into_neighbor_chunks() {
        let c = ChunkCoord::new(2, -3);
        let p = CellPos::new(c, 0, 5, 15);
        assert_eq!(
            p.step(-1, 0, 0, 16, 32, 16),
            Some(CellPos::new(ChunkCoord::new(1, -3), 15, 5, 15))
        );
        assert_eq!(
            p.step(0, 0, 1, 16, 32, 16),
            Some(CellPos::new(ChunkCoord::new(2, -2), 0, 5, 0))
        );
        assert_eq!(p.step(0, 0, -1, 16, 32, 16), Some(CellPos::new(c, 0, 5, 14)));
    }

    #[test]
    fn step_rejects_vertical_overflow() {
        let c = ChunkCoord::new(0, 0);
        assert_eq!(CellPos::new(c, 3, 0, 3).step(0, -1, 0, 16, 32, 16), None);
        assert_eq!(CellPos::new(c, 3, 31, 3).step(0, 1, 0, 16, 32, 16), None);
        assert_eq!(CellPos::new(c, 3, 0, 3).face_neighbors(16, 32, 16).count(), 5);
    }
}
