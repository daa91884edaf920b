use std::fmt;

use serde::{Deserialize, Serialize};

/// Chunk origin in chunk units on the horizontal plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    /// Chebyshev distance in chunk units.
    #[inline]
    pub fn chebyshev(self, other: Self) -> i32 {
        (self.cx - other.cx).abs().max((self.cz - other.cz).abs())
    }

    #[inline]
    pub fn distance_sq(self, other: Self) -> i64 {
        let dx = i64::from(self.cx) - i64::from(other.cx);
        let dz = i64::from(self.cz) - i64::from(other.cz);
        dx * dx + dz * dz
    }

    /// The four chunks sharing a vertical face with this one (-X, +X, -Z, +Z).
    #[inline]
    pub fn face_neighbors(self) -> [ChunkCoord; 4] {
        [
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(0, -1),
            self.offset(0, 1),
        ]
    }

    /// Chunk containing the world column (wx, wz) for the given horizontal size.
    #[inline]
    pub fn containing(wx: i32, wz: i32, size: usize) -> Self {
        let s = size as i32;
        Self {
            cx: wx.div_euclid(s),
            cz: wz.div_euclid(s),
        }
    }

    /// World-space position of the chunk's minimum corner.
    #[inline]
    pub fn origin(self, size: usize) -> (i32, i32) {
        (self.cx * size as i32, self.cz * size as i32)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.cx, self.cz)
    }
}

impl From<(i32, i32)> for ChunkCoord {
    #[inline]
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkCoord> for (i32, i32) {
    #[inline]
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cz)
    }
}
