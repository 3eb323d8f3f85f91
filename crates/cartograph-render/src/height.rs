//! Per-mode height resolution.
//!
//! Surface, slice and topo heights are separate walks with deliberately
//! different rules; they share only the caching in [`HeightResolver`].

use std::sync::Arc;

use cartograph_blocks::{BlockDesc, BlockFlags, BlockRegistry};
use cartograph_world::{ChunkCoord, ChunkError, ChunkSource, SliceBounds, TerrainChunk, CHUNK_SIZE};

use crate::cache::{ColumnProperties, GridKey, PropValue, RenderCaches, WATER_HEIGHT};
use crate::config::MappingOptions;
use crate::log_once::log_once;

#[inline]
pub(crate) fn desc_at(
    registry: &BlockRegistry,
    chunk: &dyn TerrainChunk,
    x: usize,
    y: i32,
    z: usize,
) -> Result<Arc<BlockDesc>, ChunkError> {
    Ok(registry.resolve(chunk.block(x, y, z)?))
}

/// Walks down from `y` past transparent roofs, air and invisible blocks.
///
/// `None` when nothing visible remains at or below `y`.
pub fn top_block(
    registry: &BlockRegistry,
    chunk: &dyn TerrainChunk,
    x: usize,
    y: i32,
    z: usize,
) -> Result<Option<Arc<BlockDesc>>, ChunkError> {
    let mut y = y;
    while y >= 0 {
        let desc = desc_at(registry, chunk, x, y, z)?;
        if !(desc.is_transparent_roof() || desc.is_air() || desc.alpha <= 0.0) {
            return Ok(Some(desc));
        }
        y -= 1;
    }
    Ok(None)
}

/// One way of finding the "ground" of a column.
pub trait HeightStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(
        &self,
        chunk: &dyn TerrainChunk,
        x: usize,
        z: usize,
        bounds: Option<SliceBounds>,
        props: &ColumnProperties,
    ) -> Result<i32, ChunkError>;

    /// Height used when the walk fails: where it would have started.
    fn fallback(&self, chunk: &dyn TerrainChunk, x: usize, z: usize, bounds: Option<SliceBounds>) -> i32;
}

#[inline]
fn slice_or_world(chunk: &dyn TerrainChunk, bounds: Option<SliceBounds>) -> SliceBounds {
    bounds.unwrap_or(SliceBounds {
        slice: 0,
        min: 0,
        max: chunk.world_height(),
    })
}

/// Daylight surface: stops at water (or records it under bathymetry),
/// steps plants and shadowless blocks down a level.
pub struct SurfaceHeights {
    registry: Arc<BlockRegistry>,
    bathymetry: bool,
    plants: bool,
    crops: bool,
    plant_shadows: bool,
}

impl SurfaceHeights {
    pub fn new(registry: Arc<BlockRegistry>, mapping: &MappingOptions) -> Self {
        Self {
            registry,
            bathymetry: mapping.bathymetry,
            plants: mapping.plants,
            crops: mapping.crops,
            plant_shadows: mapping.plant_shadows,
        }
    }
}

impl HeightStrategy for SurfaceHeights {
    fn name(&self) -> &'static str {
        "surface"
    }

    fn resolve(
        &self,
        chunk: &dyn TerrainChunk,
        x: usize,
        z: usize,
        _bounds: Option<SliceBounds>,
        props: &ColumnProperties,
    ) -> Result<i32, ChunkError> {
        let reg = self.registry.as_ref();
        let mut y = chunk.precipitation_height(x, z)?.max(0);
        let mut block = desc_at(reg, chunk, x, y, z)?;
        let mut water_recorded = false;
        while y > 0 {
            if block.is_water() {
                if !self.bathymetry {
                    break;
                }
                if !water_recorded {
                    props.set(x, z, WATER_HEIGHT, PropValue::Int(y));
                    water_recorded = true;
                }
            } else if !block.is_air() {
                let mapped_plant = (self.plants && block.has_flag(BlockFlags::PLANT))
                    || (self.crops && block.has_flag(BlockFlags::CROP));
                if mapped_plant {
                    if !self.plant_shadows {
                        y -= 1;
                    }
                } else if !block.is_lava() && block.has_no_shadow() {
                    y -= 1;
                }
                break;
            }
            y -= 1;
            block = desc_at(reg, chunk, x, y, z)?;
        }
        Ok(y.max(0))
    }

    fn fallback(&self, chunk: &dyn TerrainChunk, x: usize, z: usize, _bounds: Option<SliceBounds>) -> i32 {
        chunk.precipitation_height(x, z).unwrap_or(0).max(0)
    }
}

/// Cave ceiling inside a slice: the first solid block with an opening above.
pub struct SliceHeights {
    registry: Arc<BlockRegistry>,
    bathymetry: bool,
}

impl SliceHeights {
    pub fn new(registry: Arc<BlockRegistry>, mapping: &MappingOptions) -> Self {
        Self {
            registry,
            bathymetry: mapping.bathymetry,
        }
    }
}

#[inline]
fn opens_above(above: &BlockDesc) -> bool {
    above.is_air() || above.has_transparency() || above.is_open_to_sky()
}

impl HeightStrategy for SliceHeights {
    fn name(&self) -> &'static str {
        "slice"
    }

    fn resolve(
        &self,
        chunk: &dyn TerrainChunk,
        x: usize,
        z: usize,
        bounds: Option<SliceBounds>,
        _props: &ColumnProperties,
    ) -> Result<i32, ChunkError> {
        let reg = self.registry.as_ref();
        let bounds = slice_or_world(chunk, bounds);
        let mut y = bounds.max - 1;
        let mut block = desc_at(reg, chunk, x, y, z)?;
        let mut above = desc_at(reg, chunk, x, y + 1, z)?;
        // A cavern open below the slice reports the slice floor
        while y > 0 && y > bounds.min {
            if !(self.bathymetry && block.is_water()) && opens_above(&above) && !block.is_air() {
                break;
            }
            y -= 1;
            above = block;
            block = desc_at(reg, chunk, x, y, z)?;
        }
        Ok(y.max(0))
    }

    fn fallback(&self, chunk: &dyn TerrainChunk, _x: usize, _z: usize, bounds: Option<SliceBounds>) -> i32 {
        slice_or_world(chunk, bounds).max
    }
}

/// Sky-less slice floor: lava is a hard stop, a slice with no opening at all
/// counts as solid and resolves to its top.
pub struct LavaFloorHeights {
    registry: Arc<BlockRegistry>,
}

impl LavaFloorHeights {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self { registry }
    }
}

impl HeightStrategy for LavaFloorHeights {
    fn name(&self) -> &'static str {
        "lava_floor"
    }

    fn resolve(
        &self,
        chunk: &dyn TerrainChunk,
        x: usize,
        z: usize,
        bounds: Option<SliceBounds>,
        _props: &ColumnProperties,
    ) -> Result<i32, ChunkError> {
        let reg = self.registry.as_ref();
        let bounds = slice_or_world(chunk, bounds);
        let mut y = bounds.max;
        let mut block = desc_at(reg, chunk, x, y, z)?;
        let mut above = desc_at(reg, chunk, x, (y + 1).min(bounds.max), z)?;
        while y > 0 {
            if block.is_lava() {
                break;
            }
            if opens_above(&above) {
                if !block.is_air() && !block.has_transparency() && !block.is_open_to_sky() {
                    break;
                }
            } else if y == bounds.min {
                y = bounds.max;
                break;
            }
            y -= 1;
            above = block;
            block = desc_at(reg, chunk, x, y, z)?;
        }
        Ok(y.max(0))
    }

    fn fallback(&self, chunk: &dyn TerrainChunk, _x: usize, _z: usize, bounds: Option<SliceBounds>) -> i32 {
        slice_or_world(chunk, bounds).max
    }
}

/// Topographic ground: stops at water and skips `no_topo` blocks.
pub struct TopoHeights {
    registry: Arc<BlockRegistry>,
}

impl TopoHeights {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self { registry }
    }
}

impl HeightStrategy for TopoHeights {
    fn name(&self) -> &'static str {
        "topo"
    }

    fn resolve(
        &self,
        chunk: &dyn TerrainChunk,
        x: usize,
        z: usize,
        _bounds: Option<SliceBounds>,
        _props: &ColumnProperties,
    ) -> Result<i32, ChunkError> {
        let reg = self.registry.as_ref();
        let mut y = chunk.precipitation_height(x, z)?.max(0);
        let mut block = desc_at(reg, chunk, x, y, z)?;
        while y > 0 {
            if block.is_water() {
                break;
            }
            if !block.is_air() && !block.has_flag(BlockFlags::NO_TOPO) {
                break;
            }
            y -= 1;
            block = desc_at(reg, chunk, x, y, z)?;
        }
        Ok(y.max(0))
    }

    fn fallback(&self, chunk: &dyn TerrainChunk, x: usize, z: usize, _bounds: Option<SliceBounds>) -> i32 {
        chunk.precipitation_height(x, z).unwrap_or(0).max(0)
    }
}

/// Cached, cross-chunk height lookup for one strategy and slice.
pub struct HeightResolver<'a> {
    strategy: &'a dyn HeightStrategy,
    caches: &'a RenderCaches,
    source: &'a dyn ChunkSource,
    bounds: Option<SliceBounds>,
}

impl<'a> HeightResolver<'a> {
    pub fn new(
        strategy: &'a dyn HeightStrategy,
        caches: &'a RenderCaches,
        source: &'a dyn ChunkSource,
        bounds: Option<SliceBounds>,
    ) -> Self {
        Self {
            strategy,
            caches,
            source,
            bounds,
        }
    }

    #[inline]
    pub fn slice(&self) -> Option<i32> {
        self.bounds.map(|b| b.slice)
    }

    #[inline]
    pub fn bounds(&self) -> Option<SliceBounds> {
        self.bounds
    }

    /// Resolved height, never negative. A chunk that vanished mid-walk yields
    /// the strategy's fallback without caching it.
    pub fn height(&self, chunk: &dyn TerrainChunk, x: usize, z: usize) -> i32 {
        self.try_height(chunk, x, z)
            .unwrap_or_else(|_| self.strategy.fallback(chunk, x, z, self.bounds).max(0))
    }

    /// Like [`height`](Self::height) but reports a missing chunk.
    pub fn try_height(&self, chunk: &dyn TerrainChunk, x: usize, z: usize) -> Result<i32, ChunkError> {
        let coord = chunk.coord();
        let grid = self.caches.heights.get_or_default(GridKey::new(coord, self.slice()));
        grid.get_or_try(x, z, || {
            let props = self.caches.props.get_or_default(GridKey::new(coord, None));
            match self.strategy.resolve(chunk, x, z, self.bounds, &props) {
                Ok(y) => Ok(y.max(0)),
                Err(err @ ChunkError::Missing(_)) => Err(err),
                Err(err) => {
                    log_once(
                        log::Level::Warn,
                        "render",
                        format!(
                            "couldn't resolve {} height at chunk ({}, {}) column {x},{z}: {err}",
                            self.strategy.name(),
                            coord.cx,
                            coord.cz
                        ),
                    );
                    Ok(self.strategy.fallback(chunk, x, z, self.bounds).max(0))
                }
            }
        })
    }

    /// Height of the column `(dx, dz)` away, following into neighbor chunks.
    /// Unavailable neighbors report `default`.
    pub fn height_at_offset(&self, chunk: &dyn TerrainChunk, x: usize, z: usize, dx: i32, dz: i32, default: i32) -> i32 {
        let coord = chunk.coord();
        let (ox, oz) = coord.block_origin();
        let bx = ox + x as i32 + dx;
        let bz = oz + z as i32 + dz;
        let target = ChunkCoord::from_block(bx, bz);
        let lx = bx.rem_euclid(CHUNK_SIZE as i32) as usize;
        let lz = bz.rem_euclid(CHUNK_SIZE as i32) as usize;
        if target == coord {
            return self.try_height(chunk, lx, lz).unwrap_or(default);
        }
        match self.source.chunk(target) {
            Some(neighbor) => self.try_height(neighbor.as_ref(), lx, lz).unwrap_or(default),
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheLimits;
    use crate::testkit::{block, layered, registry, store_with};

    fn origin() -> ChunkCoord {
        ChunkCoord::new(0, 0)
    }

    fn resolve(strategy: &dyn HeightStrategy, chunk: &dyn TerrainChunk, bounds: Option<SliceBounds>) -> i32 {
        let props = ColumnProperties::default();
        strategy.resolve(chunk, 3, 3, bounds, &props).unwrap()
    }

    #[test]
    fn surface_stops_on_first_solid_block() {
        let reg = registry();
        let chunk = layered(&reg, origin(), 32, &[("stone", 0, 9)]);
        let s = SurfaceHeights::new(reg, &MappingOptions::default());
        assert_eq!(resolve(&s, &chunk, None), 9);
    }

    #[test]
    fn plants_step_down_unless_they_cast_shadows() {
        let reg = registry();
        let chunk = layered(&reg, origin(), 32, &[("dirt", 0, 9), ("tall_grass", 10, 10)]);
        let mut mapping = MappingOptions::default();
        let hidden = SurfaceHeights::new(Arc::clone(&reg), &mapping);
        assert_eq!(resolve(&hidden, &chunk, None), 9);

        mapping.plants = true;
        let mapped = SurfaceHeights::new(Arc::clone(&reg), &mapping);
        assert_eq!(resolve(&mapped, &chunk, None), 9);

        mapping.plant_shadows = true;
        let shadowed = SurfaceHeights::new(reg, &mapping);
        assert_eq!(resolve(&shadowed, &chunk, None), 10);
    }

    #[test]
    fn bathymetry_records_water_surface_once() {
        let reg = registry();
        let chunk = layered(&reg, origin(), 32, &[("stone", 0, 5), ("water", 6, 10)]);
        let mut mapping = MappingOptions::default();
        let plain = SurfaceHeights::new(Arc::clone(&reg), &mapping);
        assert_eq!(resolve(&plain, &chunk, None), 10);

        mapping.bathymetry = true;
        let deep = SurfaceHeights::new(reg, &mapping);
        let props = ColumnProperties::default();
        assert_eq!(deep.resolve(&chunk, 3, 3, None, &props), Ok(5));
        assert_eq!(props.get_i32(3, 3, WATER_HEIGHT), Some(10));
    }

    #[test]
    fn slice_finds_floor_of_cavern() {
        let reg = registry();
        let chunk = layered(&reg, origin(), 64, &[("stone", 0, 63), ("air", 20, 25)]);
        let s = SliceHeights::new(reg, &MappingOptions::default());
        let bounds = SliceBounds::for_slice(1, 64);
        assert_eq!(resolve(&s, &chunk, bounds), 19);
    }

    #[test]
    fn solid_slice_resolves_to_its_floor() {
        let reg = registry();
        let chunk = layered(&reg, origin(), 64, &[("stone", 0, 63)]);
        let s = SliceHeights::new(reg, &MappingOptions::default());
        assert_eq!(resolve(&s, &chunk, SliceBounds::for_slice(1, 64)), 16);
    }

    #[test]
    fn cavern_below_the_slice_floor_stops_at_the_floor() {
        let reg = registry();
        let chunk = layered(&reg, origin(), 64, &[("stone", 0, 63), ("air", 10, 40)]);
        let s = SliceHeights::new(reg, &MappingOptions::default());
        assert_eq!(resolve(&s, &chunk, SliceBounds::for_slice(1, 64)), 16);
        // Slice 0 holds the cavern floor itself
        assert_eq!(resolve(&s, &chunk, SliceBounds::for_slice(0, 64)), 9);
    }

    #[test]
    fn lava_floor_stops_at_lava_and_treats_sealed_slices_as_solid() {
        let reg = registry();
        let mut chunk = layered(
            &reg,
            origin(),
            64,
            &[("netherrack", 0, 63), ("lava", 10, 10), ("air", 11, 40)],
        );
        chunk.set_no_sky(true);
        let s = LavaFloorHeights::new(reg);
        assert_eq!(resolve(&s, &chunk, SliceBounds::for_slice(1, 64)), 10);
        assert_eq!(resolve(&s, &chunk, SliceBounds::for_slice(3, 64)), 63);
    }

    #[test]
    fn topo_skips_no_topo_blocks() {
        let reg = registry();
        let chunk = layered(&reg, origin(), 32, &[("stone", 0, 9), ("torch", 10, 10)]);
        let s = TopoHeights::new(reg);
        assert_eq!(resolve(&s, &chunk, None), 9);
    }

    #[test]
    fn top_block_sees_through_glass() {
        let reg = registry();
        let chunk = layered(&reg, origin(), 32, &[("stone", 0, 9), ("glass", 10, 10)]);
        let top = top_block(&reg, &chunk, 0, 12, 0).unwrap().unwrap();
        assert_eq!(top.block, block(&reg, "stone"));
        let empty = layered(&reg, origin(), 32, &[]);
        assert!(top_block(&reg, &empty, 0, 12, 0).unwrap().is_none());
    }

    #[test]
    fn resolver_caches_and_reports_missing_chunks() {
        let reg = registry();
        let a = layered(&reg, origin(), 32, &[("stone", 0, 9)]);
        let mut gone = layered(&reg, ChunkCoord::new(1, 0), 32, &[("stone", 0, 20)]);
        gone.detach();
        let store = store_with([a.clone()]);
        let caches = RenderCaches::new("test", &CacheLimits::default());
        let strategy = SurfaceHeights::new(Arc::clone(&reg), &MappingOptions::default());
        let heights = HeightResolver::new(&strategy, &caches, &store, None);

        assert_eq!(heights.try_height(&a, 4, 4), Ok(9));
        let grid = caches.heights.get(GridKey::new(origin(), None)).unwrap();
        assert_eq!(grid.get(4, 4), Some(9));

        assert_eq!(heights.try_height(&gone, 0, 0), Err(ChunkError::Missing(ChunkCoord::new(1, 0))));
        let missing = caches.heights.get(GridKey::new(ChunkCoord::new(1, 0), None)).unwrap();
        assert_eq!(missing.get(0, 0), None);

        // West of x=0 is chunk (-1, 0), which isn't loaded
        assert_eq!(heights.height_at_offset(&a, 0, 4, -1, 0, 77), 77);
        assert_eq!(heights.height_at_offset(&a, 5, 4, -1, 0, 77), 9);
    }
}
