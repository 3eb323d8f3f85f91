use serde::{Deserialize, Serialize};

use crate::chunk::CHUNK_SIZE;

/// Horizontal chunk position; chunks span the full world height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    /// Chunk containing the world block column `(bx, bz)`.
    #[inline]
    pub const fn from_block(bx: i32, bz: i32) -> Self {
        Self {
            cx: bx >> 4,
            cz: bz >> 4,
        }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    /// World block coordinates of local column (0, 0).
    #[inline]
    pub const fn block_origin(self) -> (i32, i32) {
        (self.cx * CHUNK_SIZE as i32, self.cz * CHUNK_SIZE as i32)
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dz * dz
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkCoord> for (i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cz)
    }
}
