use std::sync::Arc;

use cartograph_blocks::{BlockDesc, BlockFlags};
use cartograph_world::{BiomeTint, ChunkError, TerrainChunk};

use crate::color::Rgb;
use crate::error::RenderError;

/// Inherent light of lava, whatever the saved light says.
pub const LAVA_LIGHT: u8 = 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StratumColors {
    pub day: Rgb,
    pub night: Rgb,
    pub cave: Rgb,
}

/// Block color with the column's biome tint applied, if the block takes one.
pub fn block_color(chunk: &dyn TerrainChunk, block: &BlockDesc, x: usize, z: usize) -> Result<Rgb, ChunkError> {
    let base = Rgb::from_hex(block.color);
    let kind = if block.has_flag(BlockFlags::GRASS) {
        BiomeTint::Grass
    } else if block.has_flag(BlockFlags::FOLIAGE) {
        BiomeTint::Foliage
    } else if block.has_flag(BlockFlags::BIOME_WATER) {
        BiomeTint::Water
    } else {
        return Ok(base);
    };
    Ok(match chunk.biome_tint(x, z, kind)? {
        Some(tint) => base.multiply(Rgb::from_hex(tint)),
        None => base,
    })
}

/// One visible layer of a column.
#[derive(Clone, Debug)]
pub struct Stratum {
    pub block: Arc<BlockDesc>,
    pub x: usize,
    pub y: i32,
    pub z: usize,
    pub base_color: Rgb,
    pub light_level: u8,
    pub light_opacity: u8,
    pub colors: Option<StratumColors>,
}

impl Stratum {
    /// Without an explicit `light`, uses the saved light of the block above.
    pub fn new(
        chunk: &dyn TerrainChunk,
        block: Arc<BlockDesc>,
        x: usize,
        y: i32,
        z: usize,
        light: Option<u8>,
    ) -> Result<Self, ChunkError> {
        let light_level = if block.is_lava() {
            LAVA_LIGHT
        } else {
            match light {
                Some(l) => l,
                None => chunk.saved_light(x, y + 1, z)?,
            }
        };
        let base_color = block_color(chunk, &block, x, z)?;
        Ok(Self {
            light_opacity: block.light_opacity,
            block,
            x,
            y,
            z,
            base_color,
            light_level,
            colors: None,
        })
    }

    #[inline]
    pub fn is_water(&self) -> bool {
        self.block.is_water()
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.block.alpha
    }

    pub fn require_colors(&self) -> Result<StratumColors, RenderError> {
        self.colors.ok_or(RenderError::UncoloredStratum {
            x: self.x,
            y: self.y,
            z: self.z,
        })
    }
}
