use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::color::Rgb;

/// Everything the renderers read from configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub mapping: MappingOptions,
    #[serde(default = "SlopeShading::surface")]
    pub surface_shading: SlopeShading,
    #[serde(default = "SlopeShading::cave")]
    pub cave_shading: SlopeShading,
    #[serde(default)]
    pub topo_shading: SlopeRange,
    #[serde(default)]
    pub tweaks: Tweaks,
    #[serde(default)]
    pub ambient: AmbientColors,
    #[serde(default)]
    pub strata: StrataLimits,
    #[serde(default)]
    pub cache: CacheLimits,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mapping: MappingOptions::default(),
            surface_shading: SlopeShading::surface(),
            cave_shading: SlopeShading::cave(),
            topo_shading: SlopeRange::default(),
            tweaks: Tweaks::default(),
            ambient: AmbientColors::default(),
            strata: StrataLimits::default(),
            cache: CacheLimits::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: RenderConfig = toml::from_str(src)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let path = path.as_ref();
        let src = fs::read_to_string(path)
            .map_err(|e| format!("reading {}: {e}", path.display()))?;
        Self::from_toml_str(&src)
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        for (name, range) in [
            ("surface_shading", self.surface_shading.range()),
            ("cave_shading", self.cave_shading.range()),
            ("topo_shading", self.topo_shading),
        ] {
            if !(range.min.is_finite() && range.max.is_finite()) || range.min <= 0.0 || range.min > range.max {
                return Err(format!("{name}: need 0 < min <= max, got {}..{}", range.min, range.max).into());
            }
        }
        if self.strata.surface_depth == 0 || self.strata.cave_depth == 0 {
            return Err("strata depths must be at least 1".into());
        }
        if self.cache.capacity == 0 {
            return Err("cache capacity must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.tweaks.water_blend) {
            return Err(format!("tweaks.water_blend {} outside [0, 1]", self.tweaks.water_blend).into());
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct MappingOptions {
    #[serde(default = "default_false")]
    pub bathymetry: bool,
    #[serde(default = "default_true")]
    pub transparency: bool,
    #[serde(default = "default_true")]
    pub cave_lighting: bool,
    #[serde(default = "default_true")]
    pub antialiasing: bool,
    #[serde(default = "default_false")]
    pub plants: bool,
    #[serde(default = "default_true")]
    pub crops: bool,
    #[serde(default = "default_false")]
    pub plant_shadows: bool,
    #[serde(default = "default_true")]
    pub surface_above_caves: bool,
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            bathymetry: false,
            transparency: true,
            cave_lighting: true,
            antialiasing: true,
            plants: false,
            crops: true,
            plant_shadows: false,
            surface_above_caves: true,
        }
    }
}

/// Clamp range for a slope multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct SlopeRange {
    pub min: f32,
    pub max: f32,
}

impl Default for SlopeRange {
    fn default() -> Self {
        Self { min: 0.2, max: 1.7 }
    }
}

impl SlopeRange {
    #[inline]
    pub fn clamp(&self, v: f32) -> f32 {
        v.clamp(self.min, self.max)
    }
}

/// Slope clamp plus the exaggeration applied on either side of flat.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct SlopeShading {
    pub min: f32,
    pub max: f32,
    pub primary_down: f32,
    pub primary_up: f32,
    pub secondary_down: f32,
    pub secondary_up: f32,
}

impl SlopeShading {
    pub fn surface() -> Self {
        Self {
            min: 0.2,
            max: 1.7,
            primary_down: 0.65,
            primary_up: 1.20,
            secondary_down: 0.95,
            secondary_up: 1.05,
        }
    }

    pub fn cave() -> Self {
        Self {
            min: 0.2,
            max: 1.1,
            primary_down: 0.7,
            primary_up: 1.05,
            secondary_down: 0.99,
            secondary_up: 1.01,
        }
    }

    pub fn range(&self) -> SlopeRange {
        SlopeRange {
            min: self.min,
            max: self.max,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Tweaks {
    #[serde(default = "default_moonlight")]
    pub moonlight_level: f32,
    #[serde(default = "default_end_moonlight")]
    pub end_moonlight_level: f32,
    #[serde(default = "default_brighten_daylight")]
    pub brighten_daylight: f32,
    #[serde(default = "default_brighten_light_source")]
    pub brighten_light_source: f32,
    #[serde(default = "default_min_night_water")]
    pub min_night_water: f32,
    #[serde(default = "default_water_blend")]
    pub water_blend: f32,
    #[serde(default = "default_water_darken")]
    pub water_darken: u32,
    #[serde(default = "default_nether_min_light")]
    pub nether_min_light: u8,
    #[serde(default = "default_cave_dim")]
    pub cave_dim: f32,
    // Surface prepass leaves columns this far above the slice to the cave pass
    #[serde(default = "default_prepass_max_depth")]
    pub prepass_max_depth: i32,
}

fn default_moonlight() -> f32 {
    3.5
}
fn default_end_moonlight() -> f32 {
    5.0
}
fn default_brighten_daylight() -> f32 {
    0.06
}
fn default_brighten_light_source() -> f32 {
    1.2
}
fn default_min_night_water() -> f32 {
    0.25
}
fn default_water_blend() -> f32 {
    0.66
}
fn default_water_darken() -> u32 {
    0x7A90BF
}
fn default_nether_min_light() -> u8 {
    2
}
fn default_cave_dim() -> f32 {
    0.2
}
fn default_prepass_max_depth() -> i32 {
    8
}

impl Default for Tweaks {
    fn default() -> Self {
        Self {
            moonlight_level: default_moonlight(),
            end_moonlight_level: default_end_moonlight(),
            brighten_daylight: default_brighten_daylight(),
            brighten_light_source: default_brighten_light_source(),
            min_night_water: default_min_night_water(),
            water_blend: default_water_blend(),
            water_darken: default_water_darken(),
            nether_min_light: default_nether_min_light(),
            cave_dim: default_cave_dim(),
            prepass_max_depth: default_prepass_max_depth(),
        }
    }
}

/// Per-dimension tint added when darkening for night and caves.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct AmbientColors {
    #[serde(default = "default_surface_ambient")]
    pub surface: u32,
    #[serde(default = "default_cave_ambient")]
    pub cave: u32,
    #[serde(default = "default_nether_ambient")]
    pub nether: u32,
    #[serde(default = "default_end_ambient")]
    pub end: u32,
}

fn default_surface_ambient() -> u32 {
    0x00001A
}
fn default_cave_ambient() -> u32 {
    0x000000
}
fn default_nether_ambient() -> u32 {
    0x330808
}
fn default_end_ambient() -> u32 {
    0x00001A
}

impl Default for AmbientColors {
    fn default() -> Self {
        Self {
            surface: default_surface_ambient(),
            cave: default_cave_ambient(),
            nether: default_nether_ambient(),
            end: default_end_ambient(),
        }
    }
}

impl AmbientColors {
    pub fn floats(hex: u32) -> [f32; 3] {
        Rgb::from_hex(hex).to_floats()
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct StrataLimits {
    #[serde(default = "default_surface_depth")]
    pub surface_depth: usize,
    #[serde(default = "default_cave_depth")]
    pub cave_depth: usize,
}

fn default_surface_depth() -> usize {
    40
}
fn default_cave_depth() -> usize {
    8
}

impl Default for StrataLimits {
    fn default() -> Self {
        Self {
            surface_depth: default_surface_depth(),
            cave_depth: default_cave_depth(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct CacheLimits {
    // Grids kept per cache (one grid per chunk and slice)
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

fn default_cache_capacity() -> usize {
    4096
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            max_age_secs: None,
        }
    }
}

impl CacheLimits {
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = RenderConfig::from_toml_str("").unwrap();
        assert!(cfg.mapping.transparency);
        assert!(!cfg.mapping.bathymetry);
        assert_eq!(cfg.surface_shading, SlopeShading::surface());
        assert_eq!(cfg.cave_shading.max, 1.1);
        assert_eq!(cfg.tweaks.water_darken, 0x7A90BF);
        assert_eq!(cfg.ambient.nether, 0x330808);
        assert_eq!(cfg.strata.surface_depth, 40);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = RenderConfig::from_toml_str(
            r#"
            [mapping]
            bathymetry = true

            [tweaks]
            moonlight_level = 4.0
        "#,
        )
        .unwrap();
        assert!(cfg.mapping.bathymetry);
        assert!(cfg.mapping.cave_lighting);
        assert_eq!(cfg.tweaks.moonlight_level, 4.0);
        assert_eq!(cfg.tweaks.water_blend, 0.66);
    }

    #[test]
    fn rejects_inverted_ranges() {
        let err = RenderConfig::from_toml_str(
            r#"
            [topo_shading]
            min = 2.0
            max = 1.0
        "#,
        );
        assert!(err.is_err());
        assert!(RenderConfig::from_toml_str("[strata]\ncave_depth = 0\n").is_err());
    }
}
