use std::fmt;

use cartograph_blocks::types::Block;

use crate::chunk_coord::ChunkCoord;

pub const CHUNK_SIZE: usize = 16;
pub const COLUMNS: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Skylight reported above the top of a chunk that has a sky.
pub const FULL_LIGHT: u8 = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkError {
    /// The chunk was unloaded (or never loaded) while it was being read.
    Missing(ChunkCoord),
    OutOfBounds { x: i32, y: i32, z: i32 },
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkError::Missing(c) => write!(f, "chunk ({}, {}) is not available", c.cx, c.cz),
            ChunkError::OutOfBounds { x, y, z } => {
                write!(f, "local position ({x}, {y}, {z}) is outside the chunk")
            }
        }
    }
}

impl std::error::Error for ChunkError {}

/// Which biome color a tinted block asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BiomeTint {
    Grass,
    Foliage,
    Water,
}

impl BiomeTint {
    #[inline]
    fn slot(self) -> usize {
        match self {
            BiomeTint::Grass => 0,
            BiomeTint::Foliage => 1,
            BiomeTint::Water => 2,
        }
    }
}

/// Read access to one 16 x H x 16 column of terrain.
///
/// Local `x`/`z` are in `0..16`. Reads can fail when the chunk goes away
/// mid-render; callers treat that as a bad column rather than a fatal error.
pub trait TerrainChunk: Send + Sync {
    fn coord(&self) -> ChunkCoord;

    /// Block at a local position. Positions above or below the world are air.
    fn block(&self, x: usize, y: i32, z: usize) -> Result<Block, ChunkError>;

    /// One above the highest non-air block in the column, or -1 when the
    /// column holds nothing at all.
    fn precipitation_height(&self, x: usize, z: usize) -> Result<i32, ChunkError>;

    fn can_see_sky(&self, x: usize, y: i32, z: usize) -> Result<bool, ChunkError>;

    /// Stored light level (0..=15) at a local position.
    fn saved_light(&self, x: usize, y: i32, z: usize) -> Result<u8, ChunkError>;

    fn world_height(&self) -> i32;

    /// True for dimensions without a sky (nether-like, end-like).
    fn has_no_sky(&self) -> bool;

    /// Biome color multiplier for a column, if the chunk tracks biomes.
    fn biome_tint(&self, _x: usize, _z: usize, _kind: BiomeTint) -> Result<Option<u32>, ChunkError> {
        Ok(None)
    }
}

/// In-memory chunk with per-voxel light and an incrementally maintained
/// precipitation heightmap.
#[derive(Clone, Debug)]
pub struct ChunkBuf {
    pub coord: ChunkCoord,
    pub sy: usize,
    pub blocks: Vec<Block>,
    light: Vec<u8>,
    heightmap: Vec<i32>,
    no_sky: bool,
    tints: [Option<u32>; 3],
    detached: bool,
}

impl ChunkBuf {
    /// Empty (all air) chunk of height `sy`, fully lit.
    pub fn new(coord: ChunkCoord, sy: usize) -> Self {
        Self {
            coord,
            sy,
            blocks: vec![Block::AIR; COLUMNS * sy],
            light: vec![FULL_LIGHT; COLUMNS * sy],
            heightmap: vec![-1; COLUMNS],
            no_sky: false,
            tints: [None; 3],
            detached: false,
        }
    }

    pub fn from_blocks_local(coord: ChunkCoord, sy: usize, blocks: Vec<Block>) -> Self {
        let mut buf = ChunkBuf::new(coord, sy);
        let mut b = blocks;
        b.resize(COLUMNS * sy, Block::AIR);
        buf.blocks = b;
        buf.recompute_heightmap();
        buf
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * CHUNK_SIZE + z) * CHUNK_SIZE + x
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> Block {
        self.blocks[self.idx(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, block: Block) {
        let i = self.idx(x, y, z);
        self.blocks[i] = block;
        let col = z * CHUNK_SIZE + x;
        let top = self.heightmap[col];
        if block != Block::AIR {
            if y as i32 + 1 > top {
                self.heightmap[col] = y as i32 + 1;
            }
        } else if y as i32 + 1 == top {
            self.heightmap[col] = self.scan_column(x, z);
        }
    }

    /// Fills `y0..=y1` of a column with `block`.
    pub fn fill_column(&mut self, x: usize, z: usize, y0: usize, y1: usize, block: Block) {
        let y1 = y1.min(self.sy.saturating_sub(1));
        for y in y0..=y1 {
            self.set(x, y, z, block);
        }
    }

    /// Fills `y0..=y1` of every column with `block`.
    pub fn fill_layers(&mut self, y0: usize, y1: usize, block: Block) {
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                self.fill_column(x, z, y0, y1, block);
            }
        }
    }

    #[inline]
    pub fn light_local(&self, x: usize, y: usize, z: usize) -> u8 {
        self.light[self.idx(x, y, z)]
    }

    pub fn set_light(&mut self, x: usize, y: usize, z: usize, level: u8) {
        let i = self.idx(x, y, z);
        self.light[i] = level.min(FULL_LIGHT);
    }

    pub fn fill_light(&mut self, level: u8) {
        self.light.fill(level.min(FULL_LIGHT));
    }

    /// Straight-down skylight: full light until the first opaque block, dark below.
    pub fn fill_sky_light(&mut self, opaque: impl Fn(Block) -> bool) {
        let sky = if self.no_sky { 0 } else { FULL_LIGHT };
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let mut level = sky;
                for y in (0..self.sy).rev() {
                    let i = self.idx(x, y, z);
                    self.light[i] = level;
                    if opaque(self.blocks[i]) {
                        level = 0;
                    }
                }
            }
        }
    }

    pub fn set_no_sky(&mut self, no_sky: bool) {
        self.no_sky = no_sky;
    }

    pub fn set_biome_tint(&mut self, kind: BiomeTint, color: Option<u32>) {
        self.tints[kind.slot()] = color;
    }

    /// Marks the chunk as gone; every read afterwards reports `Missing`.
    pub fn detach(&mut self) {
        self.detached = true;
    }

    #[inline]
    pub fn has_non_air(&self) -> bool {
        self.blocks.iter().any(|b| *b != Block::AIR)
    }

    fn recompute_heightmap(&mut self) {
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                self.heightmap[z * CHUNK_SIZE + x] = self.scan_column(x, z);
            }
        }
    }

    fn scan_column(&self, x: usize, z: usize) -> i32 {
        (0..self.sy)
            .rev()
            .find(|y| self.get_local(x, *y, z) != Block::AIR)
            .map(|y| y as i32 + 1)
            .unwrap_or(-1)
    }

    #[inline]
    fn check(&self, x: usize, y: i32, z: usize) -> Result<(), ChunkError> {
        if self.detached {
            return Err(ChunkError::Missing(self.coord));
        }
        if x >= CHUNK_SIZE || z >= CHUNK_SIZE {
            return Err(ChunkError::OutOfBounds {
                x: x as i32,
                y,
                z: z as i32,
            });
        }
        Ok(())
    }
}

impl TerrainChunk for ChunkBuf {
    fn coord(&self) -> ChunkCoord {
        self.coord
    }

    fn block(&self, x: usize, y: i32, z: usize) -> Result<Block, ChunkError> {
        self.check(x, y, z)?;
        if y < 0 || y >= self.sy as i32 {
            return Ok(Block::AIR);
        }
        Ok(self.get_local(x, y as usize, z))
    }

    fn precipitation_height(&self, x: usize, z: usize) -> Result<i32, ChunkError> {
        self.check(x, 0, z)?;
        Ok(self.heightmap[z * CHUNK_SIZE + x])
    }

    fn can_see_sky(&self, x: usize, y: i32, z: usize) -> Result<bool, ChunkError> {
        self.check(x, y, z)?;
        Ok(!self.no_sky && y >= self.heightmap[z * CHUNK_SIZE + x])
    }

    fn saved_light(&self, x: usize, y: i32, z: usize) -> Result<u8, ChunkError> {
        self.check(x, y, z)?;
        if y < 0 {
            return Ok(0);
        }
        if y >= self.sy as i32 {
            return Ok(if self.no_sky { 0 } else { FULL_LIGHT });
        }
        Ok(self.light[self.idx(x, y as usize, z)])
    }

    fn world_height(&self) -> i32 {
        self.sy as i32
    }

    fn has_no_sky(&self) -> bool {
        self.no_sky
    }

    fn biome_tint(&self, x: usize, z: usize, kind: BiomeTint) -> Result<Option<u32>, ChunkError> {
        self.check(x, 0, z)?;
        Ok(self.tints[kind.slot()])
    }
}
