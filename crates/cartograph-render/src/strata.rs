//! Per-column layer stack and its compositing.
//!
//! Layers are pushed top-down while walking a column and drained bottom-up,
//! each one blended over what lies beneath it by its own alpha.

use std::sync::Arc;

use cartograph_blocks::BlockDesc;
use cartograph_world::{ChunkError, TerrainChunk};

use crate::color::Rgb;
use crate::colorizer::StratumColorizer;
use crate::error::RenderError;
use crate::stratum::{block_color, Stratum, StratumColors};

/// Final colors of a column plus the highest layer that produced them.
#[derive(Clone, Debug)]
pub struct Composite {
    pub colors: StratumColors,
    pub top: Arc<BlockDesc>,
}

impl Composite {
    pub fn bevel(&mut self, slope: f32) {
        if slope == 1.0 {
            return;
        }
        self.colors.day = self.colors.day.bevel(slope);
        self.colors.night = self.colors.night.bevel(slope);
        self.colors.cave = self.colors.cave.bevel(slope);
    }
}

/// Bounded stack of strata for the column being rendered; reused across columns.
#[derive(Debug)]
pub struct Strata {
    name: &'static str,
    capacity: usize,
    stack: Vec<Stratum>,
    top_y: Option<i32>,
    bottom_y: Option<i32>,
    top_water_y: Option<i32>,
    water_color: Option<Rgb>,
    max_light: Option<u8>,
    light_attenuation: i32,
    blocks_found: bool,
    dropped: usize,
}

impl Strata {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name,
            capacity,
            stack: Vec::with_capacity(capacity),
            top_y: None,
            bottom_y: None,
            top_water_y: None,
            water_color: None,
            max_light: None,
            light_attenuation: 0,
            blocks_found: false,
            dropped: 0,
        }
    }

    pub fn reset(&mut self) {
        self.stack.clear();
        self.top_y = None;
        self.bottom_y = None;
        self.top_water_y = None;
        self.water_color = None;
        self.max_light = None;
        self.light_attenuation = 0;
        self.blocks_found = false;
    }

    /// Adds a layer below everything pushed so far.
    ///
    /// Returns `Ok(false)` when the stack is full and the layer was dropped.
    pub fn push(
        &mut self,
        chunk: &dyn TerrainChunk,
        block: Arc<BlockDesc>,
        x: usize,
        y: i32,
        z: usize,
        light: Option<u8>,
    ) -> Result<bool, ChunkError> {
        if self.stack.len() >= self.capacity {
            self.dropped += 1;
            log::trace!(target: "render", "{}: strata full at {x},{y},{z}", self.name);
            return Ok(false);
        }
        let stratum = Stratum::new(chunk, block, x, y, z, light)?;
        if stratum.is_water() {
            self.top_water_y = Some(self.top_water_y.map_or(y, |t| t.max(y)));
            if self.water_color.is_none() {
                self.water_color = Some(block_color(chunk, &stratum.block, x, z)?);
            }
        }
        self.push_stratum(stratum);
        Ok(true)
    }

    /// Pushes an already-built layer; ignored when the stack is full.
    pub fn push_stratum(&mut self, stratum: Stratum) -> bool {
        if self.stack.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        let y = stratum.y;
        self.top_y = Some(self.top_y.map_or(y, |t| t.max(y)));
        self.bottom_y = Some(self.bottom_y.map_or(y, |b| b.min(y)));
        self.max_light = Some(self.max_light.map_or(stratum.light_level, |m| m.max(stratum.light_level)));
        self.light_attenuation += i32::from(stratum.light_opacity);
        self.blocks_found = true;
        self.stack.push(stratum);
        true
    }

    fn water_above(&self, y: i32) -> bool {
        self.top_water_y.is_some_and(|t| t > y)
    }

    /// Pops the lowest remaining layer and colors it against what lies above.
    ///
    /// With `ignore_middle_water`, water layers under more water are dropped
    /// so a water column contributes a single blended layer.
    pub fn next_up(&mut self, colorizer: &StratumColorizer, ignore_middle_water: bool) -> Option<Stratum> {
        loop {
            let mut stratum = self.stack.pop()?;
            self.light_attenuation = (self.light_attenuation - i32::from(stratum.light_opacity)).max(0);
            let water_above = self.water_above(stratum.y);
            if ignore_middle_water && stratum.is_water() && water_above && !self.stack.is_empty() {
                continue;
            }
            colorizer.colorize(&mut stratum, self.light_attenuation, self.water_color, water_above);
            return Some(stratum);
        }
    }

    /// Drains the stack into one set of colors. `None` when it was empty.
    pub fn composite(&mut self, colorizer: &StratumColorizer) -> Result<Option<Composite>, RenderError> {
        let mut acc: Option<Composite> = None;
        while let Some(stratum) = self.next_up(colorizer, true) {
            let colors = stratum.require_colors()?;
            let alpha = stratum.alpha();
            acc = Some(match acc {
                None => Composite {
                    colors,
                    top: stratum.block,
                },
                Some(below) => Composite {
                    colors: StratumColors {
                        day: below.colors.day.blend(colors.day, alpha),
                        night: below.colors.night.blend(colors.night, alpha),
                        cave: below.colors.cave.blend(colors.cave, alpha),
                    },
                    top: stratum.block,
                },
            });
        }
        Ok(acc)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn blocks_found(&self) -> bool {
        self.blocks_found
    }

    pub fn set_blocks_found(&mut self, found: bool) {
        self.blocks_found = found;
    }

    pub fn top_y(&self) -> Option<i32> {
        self.top_y
    }

    pub fn bottom_y(&self) -> Option<i32> {
        self.bottom_y
    }

    pub fn max_light(&self) -> Option<u8> {
        self.max_light
    }

    pub fn light_attenuation(&self) -> i32 {
        self.light_attenuation
    }

    pub fn water_color(&self) -> Option<Rgb> {
        self.water_color
    }

    /// Layers refused because the stack was full, over the strata's lifetime.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tweaks;
    use crate::testkit::{layered, registry};
    use cartograph_world::ChunkCoord;

    fn colorizer() -> StratumColorizer {
        StratumColorizer::new(&Tweaks::default(), 0x000000, 3.5, false)
    }

    #[test]
    fn single_opaque_layer_composites_to_itself() {
        let reg = registry();
        let chunk = layered(&reg, ChunkCoord::new(0, 0), 32, &[("stone", 0, 9)]);
        let stone = reg.resolve_name("stone").unwrap();
        let mut strata = Strata::new("test", 8);
        assert!(strata.push(&chunk, Arc::clone(&stone), 0, 9, 0, None).unwrap());
        assert_eq!(strata.light_attenuation(), 15);

        let mut expected = Stratum::new(&chunk, stone, 0, 9, 0, None).unwrap();
        colorizer().colorize(&mut expected, 0, None, false);
        let out = strata.composite(&colorizer()).unwrap().unwrap();
        assert_eq!(out.colors, expected.colors.unwrap());
        assert!(strata.is_empty());
        assert_eq!(strata.light_attenuation(), 0);
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let reg = registry();
        let chunk = layered(&reg, ChunkCoord::new(0, 0), 64, &[("glass", 0, 59)]);
        let glass = reg.resolve_name("glass").unwrap();
        let mut strata = Strata::new("test", 8);
        let mut accepted = 0;
        for y in (0..60).rev() {
            if strata.push(&chunk, Arc::clone(&glass), 0, y, 0, None).unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 8);
        assert_eq!(strata.len(), 8);
        assert_eq!(strata.dropped(), 52);
        assert!(strata.composite(&colorizer()).unwrap().is_some());
    }

    #[test]
    fn middle_water_collapses_to_one_layer() {
        let reg = registry();
        let chunk = layered(&reg, ChunkCoord::new(0, 0), 32, &[("sand", 0, 5), ("water", 6, 10)]);
        let mut strata = Strata::new("test", 16);
        for y in (6..=10).rev() {
            strata.push(&chunk, reg.resolve_name("water").unwrap(), 0, y, 0, None).unwrap();
        }
        strata.push(&chunk, reg.resolve_name("sand").unwrap(), 0, 5, 0, None).unwrap();
        assert_eq!(strata.water_color(), Some(Rgb::from_hex(reg.resolve_name("water").unwrap().color)));

        let c = colorizer();
        let sand = strata.next_up(&c, true).unwrap();
        assert_eq!(sand.y, 5);
        let water = strata.next_up(&c, true).unwrap();
        assert_eq!(water.y, 10);
        assert!(strata.next_up(&c, true).is_none());
    }

    #[test]
    fn reset_clears_column_state() {
        let reg = registry();
        let chunk = layered(&reg, ChunkCoord::new(0, 0), 32, &[("water", 0, 3)]);
        let mut strata = Strata::new("test", 4);
        strata.push(&chunk, reg.resolve_name("water").unwrap(), 0, 3, 0, None).unwrap();
        assert!(strata.blocks_found());
        strata.reset();
        assert!(strata.is_empty());
        assert!(!strata.blocks_found());
        assert_eq!(strata.water_color(), None);
        assert_eq!(strata.top_y(), None);
    }

    #[test]
    fn bevel_leaves_flat_columns_alone() {
        let reg = registry();
        let chunk = layered(&reg, ChunkCoord::new(0, 0), 32, &[("stone", 0, 0)]);
        let mut strata = Strata::new("test", 2);
        strata.push(&chunk, reg.resolve_name("stone").unwrap(), 0, 0, 0, None).unwrap();
        let mut out = strata.composite(&colorizer()).unwrap().unwrap();
        let before = out.colors;
        out.bevel(1.0);
        assert_eq!(out.colors, before);
        out.bevel(0.5);
        assert_ne!(out.colors.day, before.day);
    }
}
