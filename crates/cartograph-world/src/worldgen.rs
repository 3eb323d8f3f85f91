use fastnoise_lite::{FastNoiseLite, NoiseType};
use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

use cartograph_blocks::{Block, BlockRegistry};

use crate::chunk::{BiomeTint, ChunkBuf, CHUNK_SIZE};
use crate::chunk_coord::ChunkCoord;
use crate::map_type::Dimension;

#[derive(Clone, Debug, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default = "default_world_height")]
    pub world_height: usize,
    #[serde(default)]
    pub height: Height,
    #[serde(default)]
    pub water: Water,
    #[serde(default)]
    pub caves: Caves,
    #[serde(default)]
    pub plants: Plants,
}

fn default_world_height() -> usize {
    128
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            world_height: default_world_height(),
            height: Height::default(),
            water: Water::default(),
            caves: Caves::default(),
            plants: Plants::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Height {
    #[serde(default = "default_height_freq")]
    pub frequency: f32,
    #[serde(default = "default_min_y_ratio")]
    pub min_y_ratio: f32,
    #[serde(default = "default_max_y_ratio")]
    pub max_y_ratio: f32,
}
fn default_height_freq() -> f32 {
    0.02
}
fn default_min_y_ratio() -> f32 {
    0.15
}
fn default_max_y_ratio() -> f32 {
    0.70
}
impl Default for Height {
    fn default() -> Self {
        Self {
            frequency: default_height_freq(),
            min_y_ratio: default_min_y_ratio(),
            max_y_ratio: default_max_y_ratio(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Water {
    #[serde(default = "default_water_enable")]
    pub enable: bool,
    #[serde(default = "default_water_level_ratio")]
    pub level_ratio: f32,
}
fn default_water_enable() -> bool {
    true
}
fn default_water_level_ratio() -> f32 {
    0.38
}
impl Default for Water {
    fn default() -> Self {
        Self {
            enable: default_water_enable(),
            level_ratio: default_water_level_ratio(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Caves {
    #[serde(default = "default_caves_enable")]
    pub enable: bool,
    #[serde(default = "default_cave_freq")]
    pub frequency: f32,
    // |noise| below this carves air
    #[serde(default = "default_cave_threshold")]
    pub threshold: f32,
}
fn default_caves_enable() -> bool {
    true
}
fn default_cave_freq() -> f32 {
    0.045
}
fn default_cave_threshold() -> f32 {
    0.09
}
impl Default for Caves {
    fn default() -> Self {
        Self {
            enable: default_caves_enable(),
            frequency: default_cave_freq(),
            threshold: default_cave_threshold(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Plants {
    #[serde(default = "default_plant_density")]
    pub density: f32,
}
fn default_plant_density() -> f32 {
    0.35
}
impl Default for Plants {
    fn default() -> Self {
        Self {
            density: default_plant_density(),
        }
    }
}

impl WorldGenConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: WorldGenConfig = toml::from_str(src)?;
        if cfg.world_height < CHUNK_SIZE {
            return Err(format!("world_height {} is below {CHUNK_SIZE}", cfg.world_height).into());
        }
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }
}

// Block ids the generator places, looked up by name once
#[derive(Clone, Copy, Debug)]
struct Palette {
    bedrock: Block,
    stone: Block,
    dirt: Block,
    grass: Block,
    sand: Block,
    snow: Block,
    water: Block,
    lava: Block,
    tall_grass: Block,
    glowstone: Block,
    netherrack: Block,
    end_stone: Block,
}

impl Palette {
    fn from_registry(reg: &BlockRegistry) -> Result<Self, Box<dyn Error>> {
        let get = |name: &str| {
            reg.block_by_name(name)
                .ok_or_else(|| format!("block registry has no '{name}' block"))
        };
        Ok(Self {
            bedrock: get("bedrock")?,
            stone: get("stone")?,
            dirt: get("dirt")?,
            grass: get("grass_block")?,
            sand: get("sand")?,
            snow: get("snow")?,
            water: get("water")?,
            lava: get("lava")?,
            tall_grass: get("tall_grass")?,
            glowstone: get("glowstone")?,
            netherrack: get("netherrack")?,
            end_stone: get("end_stone")?,
        })
    }
}

/// Noise-driven terrain for tools and benchmarks.
pub struct WorldGenerator {
    pub seed: i32,
    pub config: WorldGenConfig,
    palette: Palette,
    terrain: FastNoiseLite,
    detail: FastNoiseLite,
    caves: FastNoiseLite,
    temperature: FastNoiseLite,
}

impl WorldGenerator {
    pub fn new(seed: i32, config: WorldGenConfig, reg: &BlockRegistry) -> Result<Self, Box<dyn Error>> {
        let palette = Palette::from_registry(reg)?;
        let mut terrain = FastNoiseLite::with_seed(seed);
        terrain.set_noise_type(Some(NoiseType::OpenSimplex2));
        terrain.set_frequency(Some(config.height.frequency));
        let mut detail = FastNoiseLite::with_seed(seed ^ 99_173);
        detail.set_noise_type(Some(NoiseType::OpenSimplex2));
        detail.set_frequency(Some(0.15));
        let mut caves = FastNoiseLite::with_seed(seed ^ 41_337);
        caves.set_noise_type(Some(NoiseType::OpenSimplex2));
        caves.set_frequency(Some(config.caves.frequency));
        let mut temperature = FastNoiseLite::with_seed(seed ^ 0x1203_5F31);
        temperature.set_noise_type(Some(NoiseType::OpenSimplex2));
        temperature.set_frequency(Some(0.004));
        Ok(Self {
            seed,
            config,
            palette,
            terrain,
            detail,
            caves,
            temperature,
        })
    }

    /// Builds one lit chunk for `dimension`.
    pub fn generate(&self, coord: ChunkCoord, dimension: Dimension, reg: &BlockRegistry) -> ChunkBuf {
        let mut buf = match dimension {
            Dimension::Overworld => self.overworld(coord),
            Dimension::Nether => self.nether(coord),
            Dimension::End => self.end(coord),
        };
        buf.fill_sky_light(|b| reg.resolve(b).light_opacity >= 15);
        self.light_emitters(&mut buf, reg);
        buf
    }

    fn surface_height(&self, wx: i32, wz: i32) -> usize {
        let sy = self.config.world_height as f32;
        let min_h = self.config.height.min_y_ratio * sy;
        let max_h = self.config.height.max_y_ratio * sy;
        let n = self.terrain.get_noise_2d(wx as f32, wz as f32);
        let h = min_h + (n + 1.0) * 0.5 * (max_h - min_h);
        (h as usize).clamp(1, self.config.world_height - 2)
    }

    fn overworld(&self, coord: ChunkCoord) -> ChunkBuf {
        let sy = self.config.world_height;
        let p = self.palette;
        let mut buf = ChunkBuf::new(coord, sy);
        let (ox, oz) = coord.block_origin();
        let water_level = (self.config.water.level_ratio * sy as f32) as usize;
        let snow_line = (0.62 * sy as f32) as usize;
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let (wx, wz) = (ox + x as i32, oz + z as i32);
                let h = self.surface_height(wx, wz);
                buf.set(x, 0, z, p.bedrock);
                if h > 4 {
                    buf.fill_column(x, z, 1, h - 4, p.stone);
                }
                buf.fill_column(x, z, h.saturating_sub(3).max(1), h.saturating_sub(1).max(1), p.dirt);
                let top = if h >= snow_line {
                    p.snow
                } else if self.config.water.enable && h <= water_level + 1 {
                    p.sand
                } else {
                    p.grass
                };
                buf.set(x, h, z, top);
                if self.config.water.enable && h < water_level {
                    buf.fill_column(x, z, h + 1, water_level, p.water);
                } else if top == p.grass && h + 1 < sy {
                    let d = self.detail.get_noise_2d(wx as f32, wz as f32);
                    if d > 1.0 - 2.0 * self.config.plants.density {
                        buf.set(x, h + 1, z, p.tall_grass);
                    }
                }
                if self.config.caves.enable {
                    self.carve_column(&mut buf, x, z, wx, wz, h);
                }
            }
        }
        let t = (self.temperature.get_noise_2d(ox as f32, oz as f32) + 1.0) * 0.5;
        buf.set_biome_tint(BiomeTint::Grass, Some(lerp_rgb(0x6A9C3C, 0xBFB755, t)));
        buf.set_biome_tint(BiomeTint::Foliage, Some(lerp_rgb(0x4C8A24, 0xAEA42A, t)));
        buf
    }

    fn carve_column(&self, buf: &mut ChunkBuf, x: usize, z: usize, wx: i32, wz: i32, h: usize) {
        let p = self.palette;
        let ceiling = h.saturating_sub(6);
        for y in 4..ceiling {
            let n = self.caves.get_noise_3d(wx as f32, y as f32 * 1.6, wz as f32);
            if n.abs() < self.config.caves.threshold {
                let floor = y > 4 && buf.get_local(x, y - 1, z) != Block::AIR;
                buf.set(x, y, z, Block::AIR);
                if floor && y < 12 {
                    buf.set(x, y - 1, z, p.lava);
                } else if floor && (wx ^ wz ^ y as i32) & 63 == 0 {
                    buf.set(x, y - 1, z, p.glowstone);
                }
            }
        }
    }

    fn nether(&self, coord: ChunkCoord) -> ChunkBuf {
        let sy = self.config.world_height;
        let p = self.palette;
        let mut buf = ChunkBuf::new(coord, sy);
        buf.set_no_sky(true);
        let (ox, oz) = coord.block_origin();
        let lava_level = sy / 4;
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let (wx, wz) = (ox + x as i32, oz + z as i32);
                buf.set(x, 0, z, p.bedrock);
                buf.set(x, sy - 1, z, p.bedrock);
                for y in 1..sy - 1 {
                    let n = self.caves.get_noise_3d(wx as f32, y as f32 * 2.0, wz as f32);
                    let block = if n > 0.15 && y > 4 && y < sy - 5 {
                        if y <= lava_level { p.lava } else { Block::AIR }
                    } else {
                        p.netherrack
                    };
                    if block != Block::AIR {
                        buf.set(x, y, z, block);
                    }
                }
            }
        }
        buf
    }

    fn end(&self, coord: ChunkCoord) -> ChunkBuf {
        let sy = self.config.world_height;
        let p = self.palette;
        let mut buf = ChunkBuf::new(coord, sy);
        buf.set_no_sky(true);
        let (ox, oz) = coord.block_origin();
        let mid = sy / 2;
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let (wx, wz) = (ox + x as i32, oz + z as i32);
                let n = self.terrain.get_noise_2d(wx as f32 * 0.5, wz as f32 * 0.5);
                if n < 0.1 {
                    continue;
                }
                let thickness = ((n - 0.1) * 40.0) as usize;
                let bump = (self.detail.get_noise_2d(wx as f32, wz as f32) * 2.0) as i32;
                let top = (mid as i32 + bump).max(1) as usize;
                buf.fill_column(x, z, top.saturating_sub(thickness).max(1), top, p.end_stone);
            }
        }
        buf
    }

    // Cells next to lava or glowstone get block light on top of the skylight pass
    fn light_emitters(&self, buf: &mut ChunkBuf, reg: &BlockRegistry) {
        let p = self.palette;
        let sy = buf.sy;
        for y in 0..sy.saturating_sub(1) {
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let b = buf.get_local(x, y, z);
                    if b != p.lava && b != p.glowstone {
                        continue;
                    }
                    for dy in 1..=2 {
                        let ly = y + dy;
                        if ly >= sy {
                            break;
                        }
                        let above = buf.get_local(x, ly, z);
                        if reg.resolve(above).light_opacity >= 15 {
                            break;
                        }
                        let level = 15 - dy as u8;
                        if buf.light_local(x, ly, z) < level {
                            buf.set_light(x, ly, z, level);
                        }
                    }
                }
            }
        }
    }
}

fn lerp_rgb(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let ch = |shift: u32| {
        let ca = ((a >> shift) & 0xFF) as f32;
        let cb = ((b >> shift) & 0xFF) as f32;
        ((ca + (cb - ca) * t).round() as u32) << shift
    };
    ch(16) | ch(8) | ch(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_sections() {
        let cfg = WorldGenConfig::from_toml_str("[water]\nlevel_ratio = 0.5\n").unwrap();
        assert_eq!(cfg.world_height, 128);
        assert!(cfg.water.enable);
        assert_eq!(cfg.water.level_ratio, 0.5);
        assert_eq!(cfg.height.frequency, 0.02);
    }

    #[test]
    fn rejects_tiny_worlds() {
        assert!(WorldGenConfig::from_toml_str("world_height = 4").is_err());
    }

    #[test]
    fn lerp_rgb_hits_endpoints() {
        assert_eq!(lerp_rgb(0x000000, 0xFFFFFF, 0.0), 0x000000);
        assert_eq!(lerp_rgb(0x000000, 0xFFFFFF, 1.0), 0xFFFFFF);
        assert_eq!(lerp_rgb(0x102030, 0x102030, 0.4), 0x102030);
    }
}
