//! Column loop shared by every renderer.

use cartograph_world::{TerrainChunk, CHUNK_SIZE};

use crate::error::RenderError;
use crate::paint::PaintTargets;

/// What a column render ended up painting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnPaint {
    Painted,
    /// Void, black or dimmed; still counts toward a good chunk.
    Marker,
    Bad,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    /// At least one column painted something meaningful.
    pub ok: bool,
    pub painted: usize,
    pub markers: usize,
    pub bad: usize,
}

impl RenderOutcome {
    pub fn merge(&mut self, other: RenderOutcome) {
        self.ok |= other.ok;
        self.painted += other.painted;
        self.markers += other.markers;
        self.bad += other.bad;
    }
}

/// Runs `column` for all 256 columns of `chunk`.
///
/// Empty columns (no top height) are painted void without calling `column`.
/// A chunk read failure paints that column bad and moves on; structural
/// errors stop the chunk.
pub fn drive_columns<F>(
    label: &str,
    chunk: &dyn TerrainChunk,
    targets: &mut PaintTargets<'_, '_>,
    bad_y: i32,
    mut column: F,
) -> Result<RenderOutcome, RenderError>
where
    F: FnMut(usize, usize, &mut PaintTargets<'_, '_>) -> Result<ColumnPaint, RenderError>,
{
    let mut outcome = RenderOutcome::default();
    let mut chunk_error_logged = false;
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            let result = match chunk.precipitation_height(x, z) {
                Ok(top) if top < 0 => {
                    targets.void(x, z);
                    Ok(ColumnPaint::Marker)
                }
                Ok(_) => column(x, z, targets),
                Err(e) => Err(RenderError::from(e)),
            };
            match result {
                Ok(ColumnPaint::Painted) => {
                    outcome.ok = true;
                    outcome.painted += 1;
                }
                Ok(ColumnPaint::Marker) => {
                    outcome.ok = true;
                    outcome.markers += 1;
                }
                Ok(ColumnPaint::Bad) => outcome.bad += 1,
                Err(e) if e.is_recoverable() => {
                    targets.bad(x, bad_y, z);
                    outcome.bad += 1;
                    if !chunk_error_logged {
                        chunk_error_logged = true;
                        let c = chunk.coord();
                        log::warn!(target: "render", "{label}: chunk ({}, {}) column {x},{z}: {e}", c.cx, c.cz);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
    log::trace!(target: "render", "{label}: {outcome:?}");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::ChunkPixels;
    use crate::testkit::{layered, registry};
    use cartograph_world::{ChunkCoord, ChunkError};

    #[test]
    fn empty_columns_are_void_and_ok() {
        let reg = registry();
        let chunk = layered(&reg, ChunkCoord::new(0, 0), 16, &[]);
        let mut px = ChunkPixels::new();
        let mut targets = PaintTargets::single(&mut px);
        let out = drive_columns("t", &chunk, &mut targets, 0, |_, _, _| Ok(ColumnPaint::Painted)).unwrap();
        assert!(out.ok);
        assert_eq!(out.markers, 256);
        assert_eq!(px.get(5, 5), Some(crate::color::Rgb::VOID));
    }

    #[test]
    fn chunk_errors_only_spoil_their_column() {
        let reg = registry();
        let chunk = layered(&reg, ChunkCoord::new(0, 0), 16, &[("stone", 0, 3)]);
        let mut px = ChunkPixels::new();
        let mut targets = PaintTargets::single(&mut px);
        let out = drive_columns("t", &chunk, &mut targets, 0, |x, z, t| {
            if x == 0 && z == 0 {
                return Err(ChunkError::Missing(ChunkCoord::new(0, 0)).into());
            }
            t.day.paint_black_block(x, z);
            Ok(ColumnPaint::Painted)
        })
        .unwrap();
        assert_eq!((out.painted, out.bad), (255, 1));
        assert!(px.is_bad(0, 0));
    }

    #[test]
    fn structural_errors_abort() {
        let reg = registry();
        let chunk = layered(&reg, ChunkCoord::new(0, 0), 16, &[("stone", 0, 3)]);
        let mut px = ChunkPixels::new();
        let mut targets = PaintTargets::single(&mut px);
        let err = drive_columns("t", &chunk, &mut targets, 0, |x, _, _| {
            if x == 3 {
                Err(RenderError::UncoloredStratum { x, y: 0, z: 0 })
            } else {
                Ok(ColumnPaint::Painted)
            }
        });
        assert!(matches!(err, Err(RenderError::UncoloredStratum { x: 3, .. })));
    }
}
