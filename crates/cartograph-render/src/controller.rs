use std::sync::Arc;

use cartograph_blocks::BlockRegistry;
use cartograph_world::{ChunkCoord, ChunkListener, ChunkSource, Dimension, MapKind, MapType, TerrainChunk};

use crate::cache::{CacheStats, RenderCaches};
use crate::cave::CaveRenderer;
use crate::config::RenderConfig;
use crate::driver::RenderOutcome;
use crate::error::RenderError;
use crate::paint::{ChunkPainter, ChunkPixels};
use crate::surface::SurfaceRenderer;
use crate::topo::TopoRenderer;

/// Picks the renderer for a map type and keeps every renderer's caches in
/// step with chunk unloads.
pub struct ChunkRenderController {
    surface: Arc<SurfaceRenderer>,
    end: SurfaceRenderer,
    cave: CaveRenderer,
    nether: CaveRenderer,
    topo: TopoRenderer,
}

impl ChunkRenderController {
    pub fn new(config: Arc<RenderConfig>, registry: Arc<BlockRegistry>) -> Self {
        let surface = Arc::new(SurfaceRenderer::new(Arc::clone(&config), Arc::clone(&registry)));
        Self {
            end: SurfaceRenderer::end(Arc::clone(&config), Arc::clone(&registry)),
            cave: CaveRenderer::new(Arc::clone(&config), Arc::clone(&registry), Some(Arc::clone(&surface))),
            nether: CaveRenderer::nether(Arc::clone(&config), Arc::clone(&registry)),
            topo: TopoRenderer::new(config, registry),
            surface,
        }
    }

    fn surface_for(&self, dimension: Dimension) -> &SurfaceRenderer {
        match dimension {
            Dimension::End => &self.end,
            _ => self.surface.as_ref(),
        }
    }

    /// Renders one map type of `chunk` into `painter`.
    ///
    /// A night map still runs the whole surface pass; its day half is
    /// discarded. Use [`render_surface`](Self::render_surface) to keep both.
    pub fn render_chunk(
        &self,
        source: &dyn ChunkSource,
        chunk: &dyn TerrainChunk,
        map_type: MapType,
        painter: &mut dyn ChunkPainter,
    ) -> Result<RenderOutcome, RenderError> {
        let outcome = match map_type.kind {
            MapKind::Day => self.surface_for(map_type.dimension).render(source, chunk, painter, None),
            MapKind::Night => {
                let surface = self.surface_for(map_type.dimension);
                if surface.paints_night() {
                    let mut day = ChunkPixels::new();
                    surface.render(source, chunk, &mut day, Some(painter))
                } else {
                    surface.render(source, chunk, painter, None)
                }
            }
            MapKind::Underground => match map_type.dimension {
                Dimension::Nether => self.nether.render(source, chunk, painter, map_type.slice),
                Dimension::End => self.end.render(source, chunk, painter, None),
                Dimension::Overworld => self.cave.render(source, chunk, painter, map_type.slice),
            },
            MapKind::Topo => self.topo.render(source, chunk, painter),
        }?;
        if !outcome.ok {
            let c = chunk.coord();
            log::debug!(target: "render", "chunk ({}, {}) didn't render for {map_type}", c.cx, c.cz);
        }
        Ok(outcome)
    }

    /// Day and night images of a chunk from a single pass.
    pub fn render_surface(
        &self,
        source: &dyn ChunkSource,
        chunk: &dyn TerrainChunk,
        dimension: Dimension,
        day: &mut dyn ChunkPainter,
        night: Option<&mut dyn ChunkPainter>,
    ) -> Result<RenderOutcome, RenderError> {
        self.surface_for(dimension).render(source, chunk, day, night)
    }

    fn all_caches(&self) -> [&RenderCaches; 5] {
        [
            self.surface.caches(),
            self.end.caches(),
            self.cave.caches(),
            self.nether.caches(),
            self.topo.caches(),
        ]
    }

    pub fn invalidate_chunk(&self, coord: ChunkCoord) {
        for caches in self.all_caches() {
            caches.invalidate_chunk(coord);
        }
    }

    pub fn clear_caches(&self) {
        for caches in self.all_caches() {
            caches.clear();
        }
    }

    /// Per renderer: height, slope and column-property cache stats.
    pub fn cache_stats(&self) -> Vec<(&'static str, [CacheStats; 3])> {
        self.all_caches().iter().map(|c| (c.name, c.stats())).collect()
    }
}

impl ChunkListener for ChunkRenderController {
    fn chunk_unloaded(&self, coord: ChunkCoord) {
        self.invalidate_chunk(coord);
    }
}
