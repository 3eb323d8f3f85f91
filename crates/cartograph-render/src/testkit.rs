use std::sync::Arc;

use cartograph_blocks::{Block, BlockRegistry};
use cartograph_world::{ChunkBuf, ChunkCoord, ChunkStore};

pub(crate) fn registry() -> Arc<BlockRegistry> {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    Arc::new(BlockRegistry::load_from_path(root.join("../../assets/blocks.toml")).unwrap())
}

pub(crate) fn block(reg: &BlockRegistry, name: &str) -> Block {
    reg.block_by_name(name).unwrap()
}

/// Every column gets the same `(name, y0, y1)` layers, lit from above.
pub(crate) fn layered(reg: &BlockRegistry, coord: ChunkCoord, sy: usize, layers: &[(&str, usize, usize)]) -> ChunkBuf {
    let mut buf = ChunkBuf::new(coord, sy);
    for (name, y0, y1) in layers {
        buf.fill_layers(*y0, *y1, block(reg, name));
    }
    buf.fill_sky_light(|b| reg.resolve(b).light_opacity >= 15);
    buf
}

pub(crate) fn store_with(chunks: impl IntoIterator<Item = ChunkBuf>) -> ChunkStore {
    let store = ChunkStore::new();
    for c in chunks {
        store.insert(Arc::new(c));
    }
    store
}
