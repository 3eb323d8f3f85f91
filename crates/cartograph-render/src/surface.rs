//! Daylight and night surface maps, and the sky-less End variant.

use std::sync::Arc;

use cartograph_blocks::{BlockDesc, BlockFlags, BlockRegistry};
use cartograph_world::{ChunkError, ChunkSource, SliceBounds, TerrainChunk};

use crate::cache::{GridKey, RenderCaches, WATER_HEIGHT};
use crate::colorizer::StratumColorizer;
use crate::config::RenderConfig;
use crate::driver::{drive_columns, ColumnPaint, RenderOutcome};
use crate::error::RenderError;
use crate::height::{desc_at, top_block, HeightResolver, SurfaceHeights};
use crate::lighting::{ColorStrategy, EndLighting, SurfaceLighting};
use crate::paint::{ChunkPainter, PaintTargets};
use crate::slope::SlopeEstimator;
use crate::strata::Strata;

/// Vertical extent a strata walk covers for one column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnSpan {
    pub x: usize,
    pub z: usize,
    /// Where the walk starts.
    pub top: i32,
    /// Surface: the ground height. Caves: the slice floor.
    pub base: i32,
}

/// Collects the visible layers of a column into a [`Strata`].
pub trait StrataBuilder: Send + Sync {
    fn build(
        &self,
        chunk: &dyn TerrainChunk,
        strata: &mut Strata,
        span: ColumnSpan,
        lighting: &dyn ColorStrategy,
        cfg: &RenderConfig,
    ) -> Result<(), ChunkError>;
}

/// Transparent roofs between `top` and `base`, then everything from `base`
/// down to the first opaque layer.
pub struct SurfaceStrata {
    registry: Arc<BlockRegistry>,
}

impl SurfaceStrata {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self { registry }
    }
}

impl StrataBuilder for SurfaceStrata {
    fn build(
        &self,
        chunk: &dyn TerrainChunk,
        strata: &mut Strata,
        span: ColumnSpan,
        _lighting: &dyn ColorStrategy,
        cfg: &RenderConfig,
    ) -> Result<(), ChunkError> {
        let reg = self.registry.as_ref();
        let transparency = cfg.mapping.transparency;
        let ColumnSpan { x, z, top, base } = span;

        let mut roof_y = top;
        while roof_y > base {
            let block = desc_at(reg, chunk, x, roof_y, z)?;
            if !block.is_air() && block.is_transparent_roof() {
                strata.push(chunk, block, x, roof_y, z, None)?;
                if !transparency {
                    break;
                }
            }
            roof_y -= 1;
        }

        if transparency || strata.is_empty() {
            let mut y = base;
            while y >= 0 {
                let block = desc_at(reg, chunk, x, y, z)?;
                if !block.is_air() {
                    let opaque = block.alpha >= 1.0;
                    strata.push(chunk, block, x, y, z, None)?;
                    if opaque || !transparency {
                        break;
                    }
                }
                y -= 1;
            }
        }
        Ok(())
    }
}

/// Surface renderer; the End variant swaps in its own lighting.
pub struct SurfaceRenderer {
    name: &'static str,
    config: Arc<RenderConfig>,
    registry: Arc<BlockRegistry>,
    heights: SurfaceHeights,
    slopes: SlopeEstimator,
    lighting: Box<dyn ColorStrategy>,
    builder: Box<dyn StrataBuilder>,
    caches: RenderCaches,
}

impl SurfaceRenderer {
    pub fn new(config: Arc<RenderConfig>, registry: Arc<BlockRegistry>) -> Self {
        Self::with_lighting("surface", config, registry, Box::new(SurfaceLighting))
    }

    pub fn end(config: Arc<RenderConfig>, registry: Arc<BlockRegistry>) -> Self {
        Self::with_lighting("end", config, registry, Box::new(EndLighting))
    }

    fn with_lighting(
        name: &'static str,
        config: Arc<RenderConfig>,
        registry: Arc<BlockRegistry>,
        lighting: Box<dyn ColorStrategy>,
    ) -> Self {
        Self {
            name,
            heights: SurfaceHeights::new(Arc::clone(&registry), &config.mapping),
            slopes: SlopeEstimator::new(config.surface_shading, config.mapping.antialiasing),
            builder: Box::new(SurfaceStrata::new(Arc::clone(&registry))),
            caches: RenderCaches::new(name, &config.cache),
            lighting,
            config,
            registry,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn caches(&self) -> &RenderCaches {
        &self.caches
    }

    pub fn paints_night(&self) -> bool {
        self.lighting.paints_night()
    }

    /// Paints day colors into `day` and, when given, night colors into `night`.
    pub fn render(
        &self,
        source: &dyn ChunkSource,
        chunk: &dyn TerrainChunk,
        day: &mut dyn ChunkPainter,
        night: Option<&mut dyn ChunkPainter>,
    ) -> Result<RenderOutcome, RenderError> {
        let night = if self.lighting.paints_night() { night } else { None };
        let mut targets = PaintTargets::new(day, night);
        self.render_pass(source, chunk, &mut targets, None)
    }

    /// Day-only pass backing an underground map. Columns whose surface sits
    /// well above the slice are painted black for the cave pass to handle.
    pub fn render_prepass(
        &self,
        source: &dyn ChunkSource,
        chunk: &dyn TerrainChunk,
        painter: &mut dyn ChunkPainter,
        bounds: SliceBounds,
    ) -> Result<RenderOutcome, RenderError> {
        let mut targets = PaintTargets::single(painter);
        self.render_pass(source, chunk, &mut targets, Some(bounds))
    }

    /// Ground height of a column, or the water surface under bathymetry.
    pub fn surface_height(&self, source: &dyn ChunkSource, chunk: &dyn TerrainChunk, x: usize, z: usize) -> Result<i32, ChunkError> {
        let heights = HeightResolver::new(&self.heights, &self.caches, source, None);
        let y = heights.try_height(chunk, x, z)?;
        Ok(self.water_height(chunk, x, z, y))
    }

    fn water_height(&self, chunk: &dyn TerrainChunk, x: usize, z: usize, y: i32) -> i32 {
        if !self.config.mapping.bathymetry {
            return y;
        }
        self.caches
            .props
            .get(GridKey::new(chunk.coord(), None))
            .and_then(|p| p.get_i32(x, z, WATER_HEIGHT))
            .unwrap_or(y)
    }

    fn render_pass(
        &self,
        source: &dyn ChunkSource,
        chunk: &dyn TerrainChunk,
        targets: &mut PaintTargets<'_, '_>,
        prepass: Option<SliceBounds>,
    ) -> Result<RenderOutcome, RenderError> {
        let _gate = self.caches.read_gate();
        let heights = HeightResolver::new(&self.heights, &self.caches, source, None);
        let colorizer = self.lighting.colorizer(&self.config);
        let mut strata = Strata::new(self.name, self.config.strata.surface_depth);
        let label = if prepass.is_some() { "surface prepass" } else { self.name };
        drive_columns(label, chunk, targets, 0, |x, z, t| {
            strata.reset();
            self.column(&heights, &colorizer, &mut strata, chunk, x, z, t, prepass)
        })
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
        prepass: Option<SliceBounds>,
    ) -> Result<ColumnPaint, RenderError> {
        let mapping = &self.config.mapping;
        let reg = self.registry.as_ref();
        let mut standard_y = heights.try_height(chunk, x, z)?.max(0);

        if let Some(bounds) = prepass {
            if standard_y > bounds.max && standard_y - bounds.max > self.config.tweaks.prepass_max_depth {
                targets.day.paint_black_block(x, z);
                return Ok(ColumnPaint::Marker);
            }
        }

        let roof_y = chunk.precipitation_height(x, z)?.max(0);
        if roof_y == 0 || standard_y == 0 {
            targets.void(x, z);
            return Ok(ColumnPaint::Marker);
        }

        standard_y = self.water_height(chunk, x, z, standard_y);

        let Some(top) = top_block(reg, chunk, x, standard_y, z)? else {
            targets.bad(x, standard_y, z);
            return Ok(ColumnPaint::Bad);
        };

        if mapping.plants || mapping.crops {
            if let Some(above) = top_block(reg, chunk, x, standard_y + 1, z)? {
                if is_mapped_plant(&above, mapping.plants, mapping.crops) {
                    standard_y += 1;
                }
            }
        }

        let span = ColumnSpan {
            x,
            z,
            top: roof_y,
            base: standard_y,
        };
        self.builder
            .build(chunk, strata, span, self.lighting.as_ref(), &self.config)?;

        let Some(mut composite) = strata.composite(colorizer)? else {
            targets.bad(x, standard_y, z);
            return Ok(ColumnPaint::Bad);
        };

        if (top.is_water() && mapping.bathymetry) || !top.has_no_shadow() {
            let slope = self.slopes.slope(heights, &self.caches, chunk, x, z);
            composite.bevel(slope);
        }

        let colors = composite.colors;
        if prepass.is_some() {
            targets.day.paint_block(x, z, colors.day);
        } else if chunk.has_no_sky() {
            targets.day.paint_block(x, z, colors.night);
        } else {
            targets.day.paint_block(x, z, colors.day);
            if let Some(night) = targets.night.as_deref_mut() {
                night.paint_block(x, z, colors.night);
            }
        }
        Ok(ColumnPaint::Painted)
    }
}

fn is_mapped_plant(block: &BlockDesc, plants: bool, crops: bool) -> bool {
    (plants && block.has_flag(BlockFlags::PLANT)) || (crops && block.has_flag(BlockFlags::CROP))
}
