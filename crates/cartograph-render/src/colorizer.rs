use cartograph_blocks::BlockFlags;

use crate::color::Rgb;
use crate::config::{AmbientColors, Tweaks};
use crate::stratum::{Stratum, StratumColors};

/// Turns a stratum's raw color into its day, night and cave colors.
#[derive(Clone, Copy, Debug)]
pub struct StratumColorizer {
    ambient: [f32; 3],
    moonlight: f32,
    brighten_daylight: f32,
    brighten_light_source: f32,
    min_night_water: f32,
    water_blend: f32,
    water_darken: Rgb,
    cave_lighting: bool,
}

impl StratumColorizer {
    pub fn new(tweaks: &Tweaks, ambient: u32, moonlight: f32, cave_lighting: bool) -> Self {
        Self {
            ambient: AmbientColors::floats(ambient),
            moonlight,
            brighten_daylight: tweaks.brighten_daylight,
            brighten_light_source: tweaks.brighten_light_source,
            min_night_water: tweaks.min_night_water,
            water_blend: tweaks.water_blend,
            water_darken: Rgb::from_hex(tweaks.water_darken),
            cave_lighting,
        }
    }

    /// Day and night brightness factors for a layer.
    pub fn factors(&self, light: u8, attenuation: i32) -> (f32, f32) {
        let light = f32::from(light);
        let sun = (15 - attenuation) as f32;
        let day = light.max(sun).max(1.0) / 15.0 + self.brighten_daylight;
        let moon = self.moonlight;
        let night = light.max(moon - attenuation as f32).max(moon) / 15.0;
        (day, night)
    }

    /// `attenuation` is the light opacity of everything above the layer.
    pub fn colorize(&self, stratum: &mut Stratum, attenuation: i32, water_color: Option<Rgb>, water_above: bool) {
        let (day_factor, night_factor) = self.factors(stratum.light_level, attenuation);
        let mut basic = match water_color {
            Some(w) if stratum.is_water() => w,
            _ => stratum.base_color,
        };
        if stratum.block.has_flag(BlockFlags::EMISSIVE) {
            basic = basic.brighten(self.brighten_light_source);
        }

        let (day, night) = match water_color {
            Some(water) if water_above => {
                let water = water.multiply(self.water_darken);
                let day = basic
                    .brighten(day_factor.max(night_factor))
                    .blend(water, self.water_blend);
                let night = day.brighten(night_factor.max(self.min_night_water));
                (day, night)
            }
            _ => (
                basic.brighten(day_factor),
                basic.darken_ambient(night_factor, self.ambient),
            ),
        };
        let cave = if self.cave_lighting { night } else { day };
        stratum.colors = Some(StratumColors { day, night, cave });
    }
}
