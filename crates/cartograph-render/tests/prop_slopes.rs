use std::sync::Arc;

use cartograph_blocks::BlockRegistry;
use cartograph_render::cache::RenderCaches;
use cartograph_render::config::{CacheLimits, MappingOptions, SlopeRange, SlopeShading};
use cartograph_render::height::{HeightResolver, SurfaceHeights, TopoHeights};
use cartograph_render::slope::{SlopeEstimator, TopoSlopeEstimator};
use cartograph_world::{ChunkBuf, ChunkCoord, ChunkStore, CHUNK_SIZE, COLUMNS};
use proptest::prelude::*;

fn load_registry() -> Arc<BlockRegistry> {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    Arc::new(BlockRegistry::load_from_path(root.join("../../assets/blocks.toml")).unwrap())
}

fn terrain(reg: &BlockRegistry, tops: &[usize]) -> ChunkBuf {
    let stone = reg.block_by_name("stone").unwrap();
    let mut buf = ChunkBuf::new(ChunkCoord::new(0, 0), 64);
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            let top = tops[z * CHUNK_SIZE + x];
            if top > 0 {
                buf.fill_column(x, z, 0, top - 1, stone);
            }
        }
    }
    buf
}

fn shading() -> impl Strategy<Value = SlopeShading> {
    (0.05f32..1.0, 1.0f32..3.0, 0.1f32..2.0, 0.1f32..2.0, 0.5f32..1.5, 0.5f32..1.5).prop_map(
        |(min, max, pd, pu, sd, su)| SlopeShading {
            min,
            max,
            primary_down: pd,
            primary_up: pu,
            secondary_down: sd,
            secondary_up: su,
        },
    )
}

proptest! {
    #[test]
    fn surface_slopes_are_finite_and_clamped(
        tops in prop::collection::vec(0usize..64, COLUMNS),
        shading in shading(),
        antialias in any::<bool>(),
    ) {
        let reg = load_registry();
        let chunk = terrain(&reg, &tops);
        let store = ChunkStore::new();
        let caches = RenderCaches::new("prop", &CacheLimits::default());
        let strategy = SurfaceHeights::new(Arc::clone(&reg), &MappingOptions::default());
        let heights = HeightResolver::new(&strategy, &caches, &store, None);
        let estimator = SlopeEstimator::new(shading, antialias);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let s = estimator.slope(&heights, &caches, &chunk, x, z);
                prop_assert!(s.is_finite());
                prop_assert!(s >= shading.min && s <= shading.max, "slope {s} outside {}..{}", shading.min, shading.max);
            }
        }
    }

    #[test]
    fn shade_never_leaves_the_range(primary in -10.0f32..10.0, secondary in proptest::option::of(-10.0f32..10.0)) {
        let est = SlopeEstimator::new(SlopeShading::surface(), true);
        let s = est.shade(primary, secondary);
        prop_assert!((0.2..=1.7).contains(&s));
    }

    #[test]
    fn topo_slopes_stay_in_range(tops in prop::collection::vec(0usize..64, COLUMNS)) {
        let reg = load_registry();
        let chunk = terrain(&reg, &tops);
        let store = ChunkStore::new();
        let caches = RenderCaches::new("prop", &CacheLimits::default());
        let strategy = TopoHeights::new(Arc::clone(&reg));
        let heights = HeightResolver::new(&strategy, &caches, &store, None);
        let range = SlopeRange::default();
        let estimator = TopoSlopeEstimator::new(range);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let s = estimator.slope(&heights, &caches, &chunk, x, z);
                prop_assert!(s.is_finite());
                prop_assert!(s >= range.min && s <= range.max);
            }
        }
    }

    #[test]
    fn one_band_step_is_flat(h in 16i32..240, which in 0usize..4, up in any::<bool>()) {
        let est = TopoSlopeEstimator::new(SlopeRange::default());
        let band = h & !7;
        let mut n = [band; 4];
        n[which] = if up { band + 8 } else { band - 8 };
        prop_assert_eq!(est.banded(band, n), 1.0);
    }
}
