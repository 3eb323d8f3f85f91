use std::fmt;

use cartograph_world::ChunkError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderError {
    /// Terrain read failed; the column is painted as a bad block.
    Chunk(ChunkError),
    /// A stratum reached compositing without colors.
    UncoloredStratum { x: usize, y: i32, z: usize },
    /// Underground rendering was asked for without a vertical slice.
    SliceRequired,
    SliceOutOfRange { slice: i32, world_height: i32 },
}

impl RenderError {
    /// Column-level failures; anything else aborts the chunk.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RenderError::Chunk(_))
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Chunk(e) => write!(f, "{e}"),
            RenderError::UncoloredStratum { x, y, z } => {
                write!(f, "stratum at ({x}, {y}, {z}) was composited before being colored")
            }
            RenderError::SliceRequired => write!(f, "underground rendering needs a vertical slice"),
            RenderError::SliceOutOfRange {
                slice,
                world_height,
            } => write!(f, "slice {slice} is outside a world {world_height} blocks tall"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Chunk(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ChunkError> for RenderError {
    fn from(e: ChunkError) -> Self {
        RenderError::Chunk(e)
    }
}
