//! Contour-style elevation map. No strata: each column is a palette stop
//! for its 8-block band, shaded by how the band compares to its neighbors.

use std::sync::Arc;

use cartograph_blocks::BlockRegistry;
use cartograph_world::{ChunkSource, TerrainChunk};

use crate::cache::RenderCaches;
use crate::color::Rgb;
use crate::config::RenderConfig;
use crate::driver::{drive_columns, ColumnPaint, RenderOutcome};
use crate::error::RenderError;
use crate::height::{top_block, HeightResolver, TopoHeights};
use crate::paint::{ChunkPainter, PaintTargets};
use crate::slope::TopoSlopeEstimator;

const BAND_SHIFT: i32 = 3;

/// Shallow to deep is bottom to top of the world, darkest first.
pub const WATER_PALETTE: [Rgb; 14] = [
    Rgb::new(31, 40, 79),
    Rgb::new(31, 40, 79),
    Rgb::new(31, 40, 79),
    Rgb::new(31, 40, 79),
    Rgb::new(31, 40, 79),
    Rgb::new(38, 60, 106),
    Rgb::new(46, 80, 133),
    Rgb::new(53, 99, 160),
    Rgb::new(60, 119, 188),
    Rgb::new(72, 151, 211),
    Rgb::new(90, 185, 233),
    Rgb::new(95, 198, 242),
    Rgb::new(114, 202, 238),
    Rgb::new(141, 210, 239),
];

pub const LAND_PALETTE: [Rgb; 30] = [
    Rgb::new(10, 70, 90),
    Rgb::new(20, 80, 90),
    Rgb::new(30, 90, 100),
    Rgb::new(40, 100, 100),
    Rgb::new(50, 110, 100),
    Rgb::new(60, 120, 100),
    Rgb::new(70, 130, 100),
    Rgb::new(80, 140, 100),
    Rgb::new(90, 150, 100),
    Rgb::new(100, 167, 107),
    Rgb::new(172, 208, 165),
    Rgb::new(148, 191, 139),
    Rgb::new(168, 198, 143),
    Rgb::new(189, 204, 150),
    Rgb::new(209, 215, 171),
    Rgb::new(225, 228, 181),
    Rgb::new(239, 235, 192),
    Rgb::new(232, 225, 182),
    Rgb::new(222, 214, 163),
    Rgb::new(211, 202, 157),
    Rgb::new(202, 185, 130),
    Rgb::new(195, 167, 107),
    Rgb::new(185, 152, 90),
    Rgb::new(170, 135, 83),
    Rgb::new(172, 154, 124),
    Rgb::new(186, 174, 154),
    Rgb::new(202, 195, 184),
    Rgb::new(224, 222, 216),
    Rgb::new(245, 244, 242),
    Rgb::new(255, 255, 255),
];

/// Palette stop for height `y`, the palette spread over the whole world height.
pub fn palette_color(y: i32, world_height: i32, palette: &[Rgb]) -> Rgb {
    let last = palette.len().saturating_sub(1);
    let bands = (world_height >> BAND_SHIFT).max(1) as f32;
    let step = bands / last.max(1) as f32;
    let band = (y.max(0) >> BAND_SHIFT) as f32;
    let index = (band / step).floor();
    let index = if index.is_finite() { (index as usize).min(last) } else { 0 };
    palette[index]
}

pub struct TopoRenderer {
    registry: Arc<BlockRegistry>,
    heights: TopoHeights,
    slopes: TopoSlopeEstimator,
    caches: RenderCaches,
}

impl TopoRenderer {
    pub fn new(config: Arc<RenderConfig>, registry: Arc<BlockRegistry>) -> Self {
        Self {
            heights: TopoHeights::new(Arc::clone(&registry)),
            slopes: TopoSlopeEstimator::new(config.topo_shading),
            caches: RenderCaches::new("topo", &config.cache),
            registry,
        }
    }

    pub fn caches(&self) -> &RenderCaches {
        &self.caches
    }

    pub fn render(
        &self,
        source: &dyn ChunkSource,
        chunk: &dyn TerrainChunk,
        painter: &mut dyn ChunkPainter,
    ) -> Result<RenderOutcome, RenderError> {
        let _gate = self.caches.read_gate();
        let heights = HeightResolver::new(&self.heights, &self.caches, source, None);
        let world_height = chunk.world_height();
        let mut targets = PaintTargets::single(painter);
        drive_columns("topo", chunk, &mut targets, 0, |x, z, t| {
            let standard_y = heights.try_height(chunk, x, z)?.max(0);
            let roof_y = chunk.precipitation_height(x, z)?.max(0);
            if roof_y == 0 || standard_y == 0 {
                t.void(x, z);
                return Ok(ColumnPaint::Marker);
            }
            let Some(top) = top_block(&self.registry, chunk, x, standard_y, z)? else {
                t.bad(x, standard_y, z);
                return Ok(ColumnPaint::Bad);
            };
            let palette: &[Rgb] = if top.is_water() { &WATER_PALETTE } else { &LAND_PALETTE };
            let base = palette_color(standard_y, world_height, palette);
            let slope = self.slopes.slope(&heights, &self.caches, chunk, x, z);
            let color = if slope < 1.0 {
                base.brighten(slope)
            } else if slope > 1.0 {
                Rgb::DARK_GRAY
            } else {
                base
            };
            t.day.paint_block(x, z, color);
            Ok(ColumnPaint::Painted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::ChunkPixels;
    use crate::testkit::{block, layered, registry, store_with};
    use cartograph_world::ChunkCoord;

    #[test]
    fn palette_spans_the_world_height() {
        assert_eq!(palette_color(0, 256, &LAND_PALETTE), LAND_PALETTE[0]);
        assert_eq!(palette_color(255, 256, &LAND_PALETTE), LAND_PALETTE[28]);
        assert_eq!(palette_color(300, 256, &WATER_PALETTE), WATER_PALETTE[13]);
        assert_eq!(palette_color(-4, 256, &WATER_PALETTE), WATER_PALETTE[0]);
        // 32 bands over 29 steps
        assert_eq!(palette_color(64, 256, &LAND_PALETTE), LAND_PALETTE[7]);
    }

    #[test]
    fn flat_land_paints_its_band() {
        let reg = registry();
        let chunk = layered(&reg, ChunkCoord::new(0, 0), 128, &[("grass_block", 0, 63)]);
        let store = store_with([chunk.clone()]);
        let r = TopoRenderer::new(Arc::new(RenderConfig::default()), Arc::clone(&reg));
        let mut px = ChunkPixels::new();
        let out = r.render(&store, &chunk, &mut px).unwrap();
        assert_eq!(out.painted, 256);
        assert_eq!(px.get(8, 8), Some(palette_color(63, 128, &LAND_PALETTE)));
    }

    #[test]
    fn water_uses_the_water_palette() {
        let reg = registry();
        let chunk = layered(&reg, ChunkCoord::new(0, 0), 128, &[("sand", 0, 40), ("water", 41, 62)]);
        let store = store_with([chunk.clone()]);
        let r = TopoRenderer::new(Arc::new(RenderConfig::default()), Arc::clone(&reg));
        let mut px = ChunkPixels::new();
        r.render(&store, &chunk, &mut px).unwrap();
        assert_eq!(px.get(8, 8), Some(palette_color(62, 128, &WATER_PALETTE)));
    }

    #[test]
    fn cliff_tops_are_dark_gray_and_their_feet_shaded() {
        let reg = registry();
        let mut chunk = layered(&reg, ChunkCoord::new(0, 0), 128, &[("stone", 0, 10)]);
        let stone = block(&reg, "stone");
        for z in 0..16 {
            for x in 8..16 {
                chunk.fill_column(x, z, 11, 60, stone);
            }
        }
        let store = store_with([chunk.clone()]);
        let r = TopoRenderer::new(Arc::new(RenderConfig::default()), Arc::clone(&reg));
        let mut px = ChunkPixels::new();
        r.render(&store, &chunk, &mut px).unwrap();
        assert_eq!(px.get(8, 8), Some(Rgb::DARK_GRAY));
        let foot = palette_color(10, 128, &LAND_PALETTE);
        assert_eq!(px.get(7, 8), Some(foot.brighten((3.0 + 1.0 / 7.0) / 4.0)));
        assert_eq!(px.get(12, 8), Some(palette_color(60, 128, &LAND_PALETTE)));
    }
}
