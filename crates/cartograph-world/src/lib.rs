//! Chunk access for the map renderers: coordinates, the terrain chunk
//! abstraction, an in-memory chunk buffer, and a noise-based demo generator.
#![forbid(unsafe_code)]

pub mod chunk;
pub mod chunk_coord;
pub mod map_type;
pub mod store;
pub mod worldgen;

pub use chunk::{BiomeTint, ChunkBuf, ChunkError, TerrainChunk, CHUNK_SIZE, COLUMNS};
pub use chunk_coord::ChunkCoord;
pub use map_type::{Dimension, MapKind, MapType, SliceBounds};
pub use store::{ChunkListener, ChunkSource, ChunkStore};
pub use worldgen::{WorldGenConfig, WorldGenerator};
