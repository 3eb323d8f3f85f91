use cartograph_blocks::registry::BlockRegistry;
use cartograph_blocks::types::Block;
use cartograph_world::{
    ChunkBuf, ChunkCoord, Dimension, SliceBounds, TerrainChunk, WorldGenConfig, WorldGenerator, CHUNK_SIZE,
};
use proptest::prelude::*;

fn load_registry() -> BlockRegistry {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    BlockRegistry::load_from_path(root.join("../../assets/blocks.toml")).unwrap()
}

fn scan(c: &ChunkBuf, x: usize, z: usize) -> i32 {
    (0..c.sy)
        .rev()
        .find(|y| c.get_local(x, *y, z) != Block::AIR)
        .map(|y| y as i32 + 1)
        .unwrap_or(-1)
}

proptest! {
    #[test]
    fn heightmap_matches_a_full_scan(
        edits in prop::collection::vec((0usize..CHUNK_SIZE, 0usize..48, 0usize..CHUNK_SIZE, any::<bool>()), 0..200)
    ) {
        let mut c = ChunkBuf::new(ChunkCoord::new(0, 0), 48);
        for (x, y, z, solid) in edits {
            let block = if solid { Block::new(1, 0) } else { Block::AIR };
            c.set(x, y, z, block);
        }
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                prop_assert_eq!(c.precipitation_height(x, z), Ok(scan(&c, x, z)));
            }
        }
    }

    #[test]
    fn slice_bounds_stay_ordered(
        slice in prop_oneof![-4i32..40, any::<i32>()],
        world_height in 1i32..512,
    ) {
        match SliceBounds::for_slice(slice, world_height) {
            Some(b) => {
                prop_assert!(slice >= 0);
                prop_assert_eq!(b.min, slice * CHUNK_SIZE as i32);
                prop_assert!(b.min < b.max);
                prop_assert!(b.max - b.min <= CHUNK_SIZE as i32 - 1 || b.max == b.min + 2);
                prop_assert!(slice <= SliceBounds::slice_count(world_height));
            }
            None => prop_assert!(slice
                .checked_mul(CHUNK_SIZE as i32)
                .is_none_or(|min| slice < 0 || min > world_height)),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn generation_is_deterministic(seed in any::<i32>(), cx in -50i32..50, cz in -50i32..50) {
        let reg = load_registry();
        let generator = WorldGenerator::new(seed, WorldGenConfig::default(), &reg).unwrap();
        let coord = ChunkCoord::new(cx, cz);
        for dim in [Dimension::Overworld, Dimension::Nether, Dimension::End] {
            let a = generator.generate(coord, dim, &reg);
            let b = generator.generate(coord, dim, &reg);
            prop_assert_eq!(&a.blocks, &b.blocks);
            prop_assert_eq!(a.coord(), coord);
            prop_assert_eq!(a.has_no_sky(), !dim.has_sky());
        }
    }
}
