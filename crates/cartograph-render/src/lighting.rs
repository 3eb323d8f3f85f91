//! Per-dimension light and tint rules.

use cartograph_world::{ChunkError, TerrainChunk};

use crate::colorizer::StratumColorizer;
use crate::config::RenderConfig;

pub trait ColorStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Packed RGB tint added when darkening.
    fn ambient(&self, cfg: &RenderConfig) -> u32;

    fn moonlight(&self, cfg: &RenderConfig) -> f32 {
        cfg.tweaks.moonlight_level
    }

    /// Whether a separate night image is produced.
    fn paints_night(&self) -> bool {
        true
    }

    /// Light of a cave layer at `y`, read from the block above it.
    fn slice_light_level(
        &self,
        chunk: &dyn TerrainChunk,
        x: usize,
        y: i32,
        z: usize,
        cfg: &RenderConfig,
    ) -> Result<u8, ChunkError> {
        if cfg.mapping.cave_lighting {
            chunk.saved_light(x, y + 1, z)
        } else {
            Ok(15)
        }
    }

    fn colorizer(&self, cfg: &RenderConfig) -> StratumColorizer {
        StratumColorizer::new(
            &cfg.tweaks,
            self.ambient(cfg),
            self.moonlight(cfg),
            cfg.mapping.cave_lighting,
        )
    }
}

pub struct SurfaceLighting;

impl ColorStrategy for SurfaceLighting {
    fn name(&self) -> &'static str {
        "surface"
    }

    fn ambient(&self, cfg: &RenderConfig) -> u32 {
        cfg.ambient.surface
    }
}

pub struct CaveLighting;

impl ColorStrategy for CaveLighting {
    fn name(&self) -> &'static str {
        "cave"
    }

    fn ambient(&self, cfg: &RenderConfig) -> u32 {
        cfg.ambient.cave
    }
}

/// No sky, so rooms get a minimum light instead of rendering black.
pub struct NetherLighting;

impl ColorStrategy for NetherLighting {
    fn name(&self) -> &'static str {
        "nether"
    }

    fn ambient(&self, cfg: &RenderConfig) -> u32 {
        cfg.ambient.nether
    }

    fn slice_light_level(
        &self,
        chunk: &dyn TerrainChunk,
        x: usize,
        y: i32,
        z: usize,
        cfg: &RenderConfig,
    ) -> Result<u8, ChunkError> {
        if y + 1 >= chunk.world_height() {
            return Ok(0);
        }
        // Only fully dark layers are lifted to the floor
        let actual = chunk.saved_light(x, y + 1, z)?;
        Ok(if actual > 0 { actual } else { cfg.tweaks.nether_min_light })
    }
}

/// Brighter moonlight; day and night would look the same, so only one
/// image is painted.
pub struct EndLighting;

impl ColorStrategy for EndLighting {
    fn name(&self) -> &'static str {
        "end"
    }

    fn ambient(&self, cfg: &RenderConfig) -> u32 {
        cfg.ambient.end
    }

    fn moonlight(&self, cfg: &RenderConfig) -> f32 {
        cfg.tweaks.end_moonlight_level
    }

    fn paints_night(&self) -> bool {
        false
    }
}
