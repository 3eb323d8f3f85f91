use std::sync::atomic::{AtomicU64, Ordering};

use cartograph_world::{CHUNK_SIZE, COLUMNS};

use crate::cache::column_index;
use crate::color::Rgb;

static BAD_BLOCKS: AtomicU64 = AtomicU64::new(0);

/// Bad blocks reported by every painter in this process.
pub fn bad_block_count() -> u64 {
    BAD_BLOCKS.load(Ordering::Relaxed)
}

/// Counts a bad block, warning on the first and every 10240th.
pub fn record_bad_block(x: usize, y: i32, z: usize) -> u64 {
    let count = BAD_BLOCKS.fetch_add(1, Ordering::Relaxed) + 1;
    if count == 1 || count % 10240 == 0 {
        log::warn!(target: "render", "bad block at {x},{y},{z}; total bad blocks: {count}");
    }
    count
}

/// Where renderers put their pixels. One call per column per render.
pub trait ChunkPainter {
    fn paint_block(&mut self, x: usize, z: usize, color: Rgb);

    fn paint_void_block(&mut self, x: usize, z: usize) {
        self.paint_block(x, z, Rgb::VOID);
    }

    fn paint_black_block(&mut self, x: usize, z: usize) {
        self.paint_block(x, z, Rgb::BLACK);
    }

    fn paint_bad_block(&mut self, x: usize, y: i32, z: usize);

    /// Darkens whatever is already painted at the column.
    fn paint_dim_overlay(&mut self, x: usize, z: usize, alpha: f32);
}

/// In-memory 16x16 tile.
#[derive(Clone, Debug)]
pub struct ChunkPixels {
    colors: [Option<Rgb>; COLUMNS],
    bad: [bool; COLUMNS],
}

impl Default for ChunkPixels {
    fn default() -> Self {
        Self {
            colors: [None; COLUMNS],
            bad: [false; COLUMNS],
        }
    }
}

impl ChunkPixels {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> Option<Rgb> {
        self.colors[column_index(x, z)]
    }

    #[inline]
    pub fn is_bad(&self, x: usize, z: usize) -> bool {
        self.bad[column_index(x, z)]
    }

    pub fn colors(&self) -> &[Option<Rgb>; COLUMNS] {
        &self.colors
    }

    pub fn painted(&self) -> usize {
        self.colors.iter().filter(|c| c.is_some()).count()
    }

    pub fn bad_count(&self) -> usize {
        self.bad.iter().filter(|b| **b).count()
    }

    pub fn clear(&mut self) {
        self.colors = [None; COLUMNS];
        self.bad = [false; COLUMNS];
    }

    /// One row per z, `#rrggbb` per column, `-` for unpainted.
    pub fn hex_rows(&self) -> Vec<String> {
        (0..CHUNK_SIZE)
            .map(|z| {
                (0..CHUNK_SIZE)
                    .map(|x| match self.get(x, z) {
                        Some(c) => c.to_string(),
                        None => "-------".to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

impl ChunkPainter for ChunkPixels {
    fn paint_block(&mut self, x: usize, z: usize, color: Rgb) {
        self.colors[column_index(x, z)] = Some(color);
    }

    fn paint_bad_block(&mut self, x: usize, y: i32, z: usize) {
        record_bad_block(x, y, z);
        self.bad[column_index(x, z)] = true;
    }

    fn paint_dim_overlay(&mut self, x: usize, z: usize, alpha: f32) {
        if let Some(c) = self.get(x, z) {
            self.paint_block(x, z, c.brighten(alpha));
        }
    }
}

/// Day target plus an optional night target, painted together.
pub struct PaintTargets<'d, 'n> {
    pub day: &'d mut dyn ChunkPainter,
    pub night: Option<&'n mut dyn ChunkPainter>,
}

impl<'d, 'n> PaintTargets<'d, 'n> {
    pub fn new(day: &'d mut dyn ChunkPainter, night: Option<&'n mut dyn ChunkPainter>) -> Self {
        Self { day, night }
    }

    pub fn single(painter: &'d mut dyn ChunkPainter) -> Self {
        Self {
            day: painter,
            night: None,
        }
    }

    pub fn has_night(&self) -> bool {
        self.night.is_some()
    }

    pub fn void(&mut self, x: usize, z: usize) {
        self.day.paint_void_block(x, z);
        if let Some(n) = self.night.as_deref_mut() {
            n.paint_void_block(x, z);
        }
    }

    pub fn black(&mut self, x: usize, z: usize) {
        self.day.paint_black_block(x, z);
        if let Some(n) = self.night.as_deref_mut() {
            n.paint_black_block(x, z);
        }
    }

    pub fn bad(&mut self, x: usize, y: i32, z: usize) {
        self.day.paint_bad_block(x, y, z);
        if let Some(n) = self.night.as_deref_mut() {
            n.paint_bad_block(x, y, z);
        }
    }

    pub fn dim(&mut self, x: usize, z: usize, alpha: f32) {
        self.day.paint_dim_overlay(x, z, alpha);
        if let Some(n) = self.night.as_deref_mut() {
            n.paint_dim_overlay(x, z, alpha);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dim_only_touches_painted_columns() {
        let mut px = ChunkPixels::new();
        px.paint_dim_overlay(0, 0, 0.5);
        assert_eq!(px.get(0, 0), None);
        px.paint_block(0, 0, Rgb::new(200, 100, 50));
        px.paint_dim_overlay(0, 0, 0.5);
        assert_eq!(px.get(0, 0), Some(Rgb::new(100, 50, 25)));
    }

    #[test]
    fn bad_blocks_are_flagged_not_painted() {
        let before = bad_block_count();
        let mut px = ChunkPixels::new();
        px.paint_bad_block(3, 40, 4);
        assert!(px.is_bad(3, 4));
        assert_eq!(px.get(3, 4), None);
        assert!(bad_block_count() > before);
    }

    #[test]
    fn targets_fan_out_markers() {
        let mut day = ChunkPixels::new();
        let mut night = ChunkPixels::new();
        {
            let mut t = PaintTargets::new(&mut day, Some(&mut night));
            t.void(1, 1);
            t.black(2, 2);
        }
        assert_eq!(day.get(1, 1), Some(Rgb::VOID));
        assert_eq!(night.get(2, 2), Some(Rgb::BLACK));
        assert_eq!(day.painted(), 2);
        assert_eq!(day.hex_rows().len(), 16);
    }
}
