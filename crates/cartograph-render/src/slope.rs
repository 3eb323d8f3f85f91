use cartograph_world::{TerrainChunk, CHUNK_SIZE, COLUMNS};

use crate::cache::{column_index, GridKey, RenderCaches};
use crate::config::{SlopeRange, SlopeShading};
use crate::height::HeightResolver;
use crate::log_once::log_once;

/// North, north-west, west.
pub const PRIMARY_OFFSETS: [(i32, i32); 3] = [(0, -1), (-1, -1), (-1, 0)];
/// The ring just beyond the primary samples, used for anti-aliasing.
pub const SECONDARY_OFFSETS: [(i32, i32); 5] = [(-1, -2), (-2, -1), (-2, -2), (-2, 0), (0, -2)];
/// North, west, south, east.
pub const CARDINAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (-1, 0), (0, 1), (1, 0)];

const TOPO_NEAR_ZERO: f32 = 0.0001;

/// Bump-mapping stand-in: ratio of a column's height to its neighbors'.
#[derive(Clone, Copy, Debug)]
pub struct SlopeEstimator {
    shading: SlopeShading,
    antialias: bool,
}

impl SlopeEstimator {
    pub fn new(shading: SlopeShading, antialias: bool) -> Self {
        Self { shading, antialias }
    }

    /// Slope multiplier for a column, populating the chunk's grid on first use.
    pub fn slope(&self, heights: &HeightResolver<'_>, caches: &RenderCaches, chunk: &dyn TerrainChunk, x: usize, z: usize) -> f32 {
        let grid = caches
            .slopes
            .get_or_default(GridKey::new(chunk.coord(), heights.slice()));
        let slope = grid.get_or_populate(|| self.populate(heights, chunk))[column_index(x, z)];
        if slope.is_finite() {
            slope
        } else {
            log::warn!(target: "render", "bad slope at {x},{z}: {slope}");
            1.0
        }
    }

    /// Computes all 256 slopes of a chunk.
    pub fn populate(&self, heights: &HeightResolver<'_>, chunk: &dyn TerrainChunk) -> [f32; COLUMNS] {
        let mut slopes = [1.0; COLUMNS];
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let y = heights.height(chunk, x, z);
                let primary = ratio(heights, chunk, &PRIMARY_OFFSETS, x, y, z);
                let secondary = (self.antialias && primary == 1.0)
                    .then(|| ratio(heights, chunk, &SECONDARY_OFFSETS, x, y, z));
                slopes[column_index(x, z)] = self.shade(primary, secondary);
            }
        }
        slopes
    }

    /// Exaggerates a raw slope ratio and clamps it into the shading range.
    pub fn shade(&self, primary: f32, secondary: Option<f32>) -> f32 {
        let s = &self.shading;
        let mut slope = primary;
        if slope < 1.0 {
            slope *= s.primary_down;
        } else if slope > 1.0 {
            slope *= s.primary_up;
        }
        if let Some(secondary) = secondary {
            if secondary > primary {
                slope *= s.secondary_up;
            } else if secondary < primary {
                slope *= s.secondary_down;
            }
        }
        if !slope.is_finite() {
            slope = 1.0;
        }
        s.range().clamp(slope)
    }
}

fn ratio(heights: &HeightResolver<'_>, chunk: &dyn TerrainChunk, offsets: &[(i32, i32)], x: usize, y: i32, z: usize) -> f32 {
    if y <= 0 {
        return 1.0;
    }
    let sum: f32 = offsets
        .iter()
        .map(|&(dx, dz)| y as f32 / heights.height_at_offset(chunk, x, z, dx, dz, y) as f32)
        .sum();
    let slope = sum / offsets.len() as f32;
    if slope.is_nan() { 1.0 } else { slope }
}

/// Topographic slope over 8-block elevation bands.
#[derive(Clone, Copy, Debug)]
pub struct TopoSlopeEstimator {
    range: SlopeRange,
}

impl TopoSlopeEstimator {
    pub fn new(range: SlopeRange) -> Self {
        Self { range }
    }

    pub fn slope(&self, heights: &HeightResolver<'_>, caches: &RenderCaches, chunk: &dyn TerrainChunk, x: usize, z: usize) -> f32 {
        let grid = caches.slopes.get_or_default(GridKey::new(chunk.coord(), None));
        grid.get_or_populate(|| self.populate(heights, chunk))[column_index(x, z)]
    }

    pub fn populate(&self, heights: &HeightResolver<'_>, chunk: &dyn TerrainChunk) -> [f32; COLUMNS] {
        let mut slopes = [1.0; COLUMNS];
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let h = heights.height(chunk, x, z);
                let n = CARDINAL_OFFSETS.map(|(dx, dz)| heights.height_at_offset(chunk, x, z, dx, dz, h));
                let slope = self.banded(h, n);
                if slope.is_finite() {
                    slopes[column_index(x, z)] = slope;
                } else {
                    let c = chunk.coord();
                    log_once(
                        log::Level::Warn,
                        "render",
                        format!("bad topo slope for chunk ({}, {}) at {x},{z}: {slope}", c.cx, c.cz),
                    );
                }
            }
        }
        slopes
    }

    /// Slope from a height and its N/W/S/E neighbors.
    ///
    /// A column is flat when all four neighbor bands agree with each other
    /// but not with it, or when a single neighbor is one band off.
    pub fn banded(&self, h: i32, neighbors: [i32; 4]) -> f32 {
        let band = |v: i32| ((v >> 3) as f32).max(TOPO_NEAR_ZERO);
        let hb = band(h);
        let nb = neighbors.map(band);
        let all_agree = nb.iter().all(|v| *v == nb[0]);
        let differing: Vec<f32> = nb.iter().copied().filter(|v| *v != hb).collect();
        let single_step = differing.len() == 1 && (differing[0] - hb).abs() == 1.0;
        let slope = if (hb != nb[0] && all_agree) || single_step {
            1.0
        } else {
            nb.iter().map(|v| hb / v).sum::<f32>() / 4.0
        };
        if !slope.is_finite() {
            return slope;
        }
        self.range.clamp(slope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shade_exaggerates_and_clamps() {
        let est = SlopeEstimator::new(SlopeShading::surface(), true);
        assert_eq!(est.shade(1.0, None), 1.0);
        assert!((est.shade(0.9, None) - 0.9 * 0.65).abs() < 1e-6);
        assert!((est.shade(1.1, None) - 1.1 * 1.2).abs() < 1e-6);
        assert_eq!(est.shade(10.0, None), 1.7);
        assert_eq!(est.shade(0.01, None), 0.2);
        assert_eq!(est.shade(f32::INFINITY, None), 1.0);
    }

    #[test]
    fn secondary_ring_nudges_flat_columns() {
        let est = SlopeEstimator::new(SlopeShading::surface(), true);
        assert!((est.shade(1.0, Some(1.3)) - 1.05).abs() < 1e-6);
        assert!((est.shade(1.0, Some(0.7)) - 0.95).abs() < 1e-6);
        assert_eq!(est.shade(1.0, Some(1.0)), 1.0);
    }

    #[test]
    fn topo_single_band_step_is_flat() {
        let est = TopoSlopeEstimator::new(SlopeRange::default());
        assert_eq!(est.banded(64, [63, 64, 64, 64]), 1.0);
        assert_eq!(est.banded(64, [56, 56, 56, 56]), 1.0);
        assert_eq!(est.banded(64, [64, 64, 64, 64]), 1.0);
    }

    #[test]
    fn topo_real_changes_shade() {
        let est = TopoSlopeEstimator::new(SlopeRange::default());
        assert!(est.banded(64, [40, 64, 64, 64]) > 1.0);
        assert!(est.banded(64, [90, 64, 64, 64]) < 1.0);
    }

    #[test]
    fn topo_zero_heights_stay_finite() {
        let est = TopoSlopeEstimator::new(SlopeRange::default());
        let s = est.banded(0, [0, 0, 64, 0]);
        assert!(s.is_finite());
        assert!((0.2..=1.7).contains(&s));
    }
}
