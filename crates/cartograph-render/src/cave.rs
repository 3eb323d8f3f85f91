//! Underground slices for the overworld and the Nether.
//!
//! Only layers that are lit and face an opening above them are mapped, so
//! solid rock reads as black and caverns show their floors. When a surface
//! renderer is attached, its day image is painted first and the cave pass
//! dims or overwrites it column by column.

use std::sync::Arc;

use cartograph_blocks::{BlockDesc, BlockRegistry};
use cartograph_world::{ChunkError, ChunkSource, SliceBounds, TerrainChunk};

use crate::cache::{GridKey, RenderCaches};
use crate::colorizer::StratumColorizer;
use crate::config::RenderConfig;
use crate::driver::{drive_columns, ColumnPaint, RenderOutcome};
use crate::error::RenderError;
use crate::height::{desc_at, HeightResolver, HeightStrategy, LavaFloorHeights, SliceHeights};
use crate::lighting::{CaveLighting, ColorStrategy, NetherLighting};
use crate::paint::{ChunkPainter, PaintTargets};
use crate::slope::SlopeEstimator;
use crate::strata::Strata;
use crate::stratum::LAVA_LIGHT;
use crate::surface::{ColumnSpan, StrataBuilder, SurfaceRenderer};

/// First lit layers below an opening, from `top` down.
///
/// A sky-less column that holds nothing but lava still maps its lava.
pub struct CaveStrata {
    registry: Arc<BlockRegistry>,
}

impl CaveStrata {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self { registry }
    }
}

impl StrataBuilder for CaveStrata {
    fn build(
        &self,
        chunk: &dyn TerrainChunk,
        strata: &mut Strata,
        span: ColumnSpan,
        lighting: &dyn ColorStrategy,
        cfg: &RenderConfig,
    ) -> Result<(), ChunkError> {
        let reg = self.registry.as_ref();
        let transparency = cfg.mapping.transparency;
        let no_sky = chunk.has_no_sky();
        let ColumnSpan { x, z, top, base } = span;

        let mut lava: Option<Arc<BlockDesc>> = None;
        let mut y = top;
        while y > 0 {
            let block = desc_at(reg, chunk, x, y, z)?;
            if !block.is_air() {
                strata.set_blocks_found(true);
                let above = desc_at(reg, chunk, x, y + 1, z)?;
                // Single-block lava pockets don't count
                if block.is_lava() && above.is_lava() {
                    lava = Some(Arc::clone(&block));
                }
                if !(above.is_air() || above.is_open_to_sky()) {
                    break;
                }
                if no_sky || !chunk.can_see_sky(x, y + 1, z)? {
                    let light = lighting.slice_light_level(chunk, x, y, z, cfg)?;
                    if light > 0 {
                        let opaque = block.alpha >= 1.0;
                        strata.push(chunk, block, x, y, z, Some(light))?;
                        if opaque || !transparency {
                            break;
                        }
                    } else if y < base {
                        break;
                    }
                }
            }
            y -= 1;
        }

        if no_sky && strata.is_empty() {
            if let Some(lava) = lava {
                strata.push(chunk, lava, x, top, z, Some(LAVA_LIGHT))?;
            }
        }
        Ok(())
    }
}

/// Cave renderer; the Nether variant finds floors on lava and never
/// renders rooms fully dark.
pub struct CaveRenderer {
    name: &'static str,
    config: Arc<RenderConfig>,
    heights: Box<dyn HeightStrategy>,
    slopes: SlopeEstimator,
    lighting: Box<dyn ColorStrategy>,
    builder: Box<dyn StrataBuilder>,
    caches: RenderCaches,
    surface: Option<Arc<SurfaceRenderer>>,
    surface_above: bool,
}

impl CaveRenderer {
    /// Overworld caves. `surface` backs the slice with a day prepass.
    pub fn new(config: Arc<RenderConfig>, registry: Arc<BlockRegistry>, surface: Option<Arc<SurfaceRenderer>>) -> Self {
        let surface_above = config.mapping.surface_above_caves;
        Self {
            name: "cave",
            heights: Box::new(SliceHeights::new(Arc::clone(&registry), &config.mapping)),
            slopes: SlopeEstimator::new(config.cave_shading, config.mapping.antialiasing),
            lighting: Box::new(CaveLighting),
            builder: Box::new(CaveStrata::new(registry)),
            caches: RenderCaches::new("cave", &config.cache),
            surface,
            surface_above,
            config,
        }
    }

    pub fn nether(config: Arc<RenderConfig>, registry: Arc<BlockRegistry>) -> Self {
        Self {
            name: "nether",
            heights: Box::new(LavaFloorHeights::new(Arc::clone(&registry))),
            slopes: SlopeEstimator::new(config.cave_shading, config.mapping.antialiasing),
            lighting: Box::new(NetherLighting),
            builder: Box::new(CaveStrata::new(registry)),
            caches: RenderCaches::new("nether", &config.cache),
            surface: None,
            surface_above: false,
            config,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn caches(&self) -> &RenderCaches {
        &self.caches
    }

    /// Renders one vertical slice of `chunk` into `painter`.
    pub fn render(
        &self,
        source: &dyn ChunkSource,
        chunk: &dyn TerrainChunk,
        painter: &mut dyn ChunkPainter,
        slice: Option<i32>,
    ) -> Result<RenderOutcome, RenderError> {
        let slice = slice.ok_or(RenderError::SliceRequired)?;
        let world_height = chunk.world_height();
        let bounds = SliceBounds::for_slice(slice, world_height)
            .ok_or(RenderError::SliceOutOfRange { slice, world_height })?;

        let mut outcome = RenderOutcome::default();
        if let Some(surface) = self.prepass_surface(chunk) {
            let pre = surface.render_prepass(source, chunk, painter, bounds)?;
            if !pre.ok {
                let c = chunk.coord();
                log::debug!(target: "render", "surface prepass painted nothing for chunk ({}, {})", c.cx, c.cz);
            }
            outcome.merge(pre);
        }

        // Slice heights are recomputed on every render of the chunk, and the
        // neighbors shaded against its edges are stale with them
        let coord = chunk.coord();
        for dz in -1..=1 {
            for dx in -1..=1 {
                let key = GridKey::new(coord.offset(dx, dz), Some(slice));
                self.caches.heights.invalidate(key);
                self.caches.slopes.invalidate(key);
            }
        }

        let _gate = self.caches.read_gate();
        let heights = HeightResolver::new(self.heights.as_ref(), &self.caches, source, Some(bounds));
        let colorizer = self.lighting.colorizer(&self.config);
        let mut strata = Strata::new(self.name, self.config.strata.cave_depth);
        let mut targets = PaintTargets::single(painter);
        let cave = drive_columns(self.name, chunk, &mut targets, slice, |x, z, t| {
            strata.reset();
            self.column(&heights, &colorizer, &mut strata, chunk, x, z, t, bounds)
        })?;
        outcome.merge(cave);
        Ok(outcome)
    }

    fn prepass_surface(&self, chunk: &dyn TerrainChunk) -> Option<&SurfaceRenderer> {
        if !self.surface_above || chunk.has_no_sky() {
            return None;
        }
        self.surface.as_deref()
    }

    #[allow(clippy::too_many_arguments)]
    fn column(
        &self,
        heights: &HeightResolver<'_>,
        colorizer: &StratumColorizer,
        strata: &mut Strata,
        chunk: &dyn TerrainChunk,
        x: usize,
        z: usize,
        targets: &mut PaintTargets<'_, '_>,
        bounds: SliceBounds,
    ) -> Result<ColumnPaint, RenderError> {
        let dim = self.config.tweaks.cave_dim;
        let has_surface = self.surface.is_some();
        let resolved = heights.try_height(chunk, x, z)?;
        let ceiling = if chunk.has_no_sky() { bounds.max } else { resolved };

        if ceiling < bounds.min {
            if has_surface && self.surface_above {
                targets.dim(x, z, dim);
            } else {
                targets.black(x, z);
            }
            return Ok(ColumnPaint::Marker);
        }
        let y = ceiling.min(bounds.max);

        let span = ColumnSpan {
            x,
            z,
            top: resolved.min(y),
            base: bounds.min,
        };
        self.builder
            .build(chunk, strata, span, self.lighting.as_ref(), &self.config)?;

        if strata.is_empty() {
            if !has_surface {
                if strata.blocks_found() {
                    targets.black(x, z);
                } else {
                    targets.void(x, z);
                }
            } else if ceiling > bounds.max {
                if ceiling - y < 16 && self.surface_above {
                    targets.dim(x, z, dim);
                } else {
                    targets.black(x, z);
                }
            } else if self.surface_above {
                targets.dim(x, z, dim);
            } else {
                targets.black(x, z);
            }
            return Ok(ColumnPaint::Marker);
        }

        let Some(mut composite) = strata.composite(colorizer)? else {
            targets.bad(x, ceiling, z);
            return Ok(ColumnPaint::Bad);
        };
        if !composite.top.has_no_shadow() {
            let slope = self.slopes.slope(heights, &self.caches, chunk, x, z);
            composite.bevel(slope);
        }
        targets.day.paint_block(x, z, composite.colors.cave);
        Ok(ColumnPaint::Painted)
    }
}
