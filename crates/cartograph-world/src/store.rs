use hashbrown::HashMap;
use std::sync::{Arc, RwLock};

use crate::chunk::TerrainChunk;
use crate::chunk_coord::ChunkCoord;

/// Neighbor lookup used when a computation crosses a chunk edge.
pub trait ChunkSource: Send + Sync {
    fn chunk(&self, coord: ChunkCoord) -> Option<Arc<dyn TerrainChunk>>;
}

/// Notified after a chunk leaves a [`ChunkStore`].
pub trait ChunkListener: Send + Sync {
    fn chunk_unloaded(&self, coord: ChunkCoord);
}

/// Loaded chunks keyed by coordinate, with unload notification.
#[derive(Default)]
pub struct ChunkStore {
    chunks: RwLock<HashMap<ChunkCoord, Arc<dyn TerrainChunk>>>,
    listeners: RwLock<Vec<Arc<dyn ChunkListener>>>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, chunk: Arc<dyn TerrainChunk>) -> Option<Arc<dyn TerrainChunk>> {
        let coord = chunk.coord();
        let prev = self.chunks.write().unwrap().insert(coord, chunk);
        if prev.is_some() {
            self.notify(coord);
        }
        prev
    }

    /// Drops a chunk and tells every listener to forget it.
    pub fn unload(&self, coord: ChunkCoord) -> Option<Arc<dyn TerrainChunk>> {
        let removed = self.chunks.write().unwrap().remove(&coord);
        if removed.is_some() {
            log::debug!(target: "world", "unloaded chunk ({}, {})", coord.cx, coord.cz);
            self.notify(coord);
        }
        removed
    }

    pub fn add_listener(&self, listener: Arc<dyn ChunkListener>) {
        self.listeners.write().unwrap().push(listener);
    }

    pub fn len(&self) -> usize {
        self.chunks.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loaded coordinates in a stable order.
    pub fn coords(&self) -> Vec<ChunkCoord> {
        let mut v: Vec<ChunkCoord> = self.chunks.read().unwrap().keys().copied().collect();
        v.sort();
        v
    }

    fn notify(&self, coord: ChunkCoord) {
        let listeners = self.listeners.read().unwrap().clone();
        for l in listeners {
            l.chunk_unloaded(coord);
        }
    }
}

impl ChunkSource for ChunkStore {
    fn chunk(&self, coord: ChunkCoord) -> Option<Arc<dyn TerrainChunk>> {
        self.chunks.read().unwrap().get(&coord).cloned()
    }
}
