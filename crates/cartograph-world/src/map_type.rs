use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chunk::CHUNK_SIZE;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    #[default]
    Overworld,
    Nether,
    End,
}

impl Dimension {
    /// Conventional numeric id: 0 overworld, -1 nether, 1 end.
    pub const fn id(self) -> i32 {
        match self {
            Dimension::Overworld => 0,
            Dimension::Nether => -1,
            Dimension::End => 1,
        }
    }

    pub const fn from_id(id: i32) -> Dimension {
        match id {
            -1 => Dimension::Nether,
            1 => Dimension::End,
            _ => Dimension::Overworld,
        }
    }

    pub const fn has_sky(self) -> bool {
        matches!(self, Dimension::Overworld)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    Day,
    Night,
    Underground,
    Topo,
}

/// Render context: which view, which vertical slice, which dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapType {
    pub kind: MapKind,
    pub slice: Option<i32>,
    pub dimension: Dimension,
}

impl MapType {
    pub const fn day(dimension: Dimension) -> Self {
        Self {
            kind: MapKind::Day,
            slice: None,
            dimension,
        }
    }

    pub const fn night(dimension: Dimension) -> Self {
        Self {
            kind: MapKind::Night,
            slice: None,
            dimension,
        }
    }

    pub const fn underground(slice: i32, dimension: Dimension) -> Self {
        Self {
            kind: MapKind::Underground,
            slice: Some(slice),
            dimension,
        }
    }

    pub const fn topo(dimension: Dimension) -> Self {
        Self {
            kind: MapKind::Topo,
            slice: None,
            dimension,
        }
    }

    pub fn is_underground(&self) -> bool {
        self.kind == MapKind::Underground
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            MapKind::Day => "day",
            MapKind::Night => "night",
            MapKind::Underground => "underground",
            MapKind::Topo => "topo",
        };
        match self.slice {
            Some(s) => write!(f, "{}|{kind}|{s}", self.dimension.id()),
            None => write!(f, "{}|{kind}", self.dimension.id()),
        }
    }
}

/// Inclusive y range of one vertical slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SliceBounds {
    pub slice: i32,
    pub min: i32,
    pub max: i32,
}

impl SliceBounds {
    /// Bounds of `slice` in a world `world_height` blocks tall.
    ///
    /// `None` when the slice lies entirely outside the world.
    pub fn for_slice(slice: i32, world_height: i32) -> Option<SliceBounds> {
        let size = CHUNK_SIZE as i32;
        if slice < 0 {
            return None;
        }
        let min = slice.checked_mul(size).filter(|min| *min <= world_height)?;
        let mut max = min.saturating_add(size - 1).min(world_height);
        if min >= max {
            max = min.saturating_add(2);
        }
        Some(SliceBounds { slice, min, max })
    }

    /// Number of slices a world of `world_height` holds.
    pub fn slice_count(world_height: i32) -> i32 {
        (world_height.max(0) as u32).div_ceil(CHUNK_SIZE as u32) as i32
    }

    #[inline]
    pub fn contains(&self, y: i32) -> bool {
        y >= self.min && y <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_bounds_cover_sixteen_blocks() {
        let b = SliceBounds::for_slice(2, 256).unwrap();
        assert_eq!((b.min, b.max), (32, 47));
        assert!(b.contains(40));
        assert!(!b.contains(48));
    }

    #[test]
    fn top_slice_clamps_to_world_height() {
        let b = SliceBounds::for_slice(3, 50).unwrap();
        assert_eq!((b.min, b.max), (48, 50));
        let b = SliceBounds::for_slice(3, 48).unwrap();
        assert_eq!((b.min, b.max), (48, 50));
    }

    #[test]
    fn slices_outside_the_world_are_rejected() {
        assert_eq!(SliceBounds::for_slice(-1, 256), None);
        assert_eq!(SliceBounds::for_slice(17, 256), None);
        assert_eq!(SliceBounds::slice_count(256), 16);
        assert_eq!(SliceBounds::slice_count(50), 4);
    }

    #[test]
    fn huge_slice_numbers_are_rejected_without_overflow() {
        assert_eq!(SliceBounds::for_slice(i32::MAX, 256), None);
        assert_eq!(SliceBounds::for_slice(i32::MAX / 16 + 1, i32::MAX), None);
        let top = SliceBounds::for_slice(i32::MAX / 16, i32::MAX).unwrap();
        assert!(top.min < top.max);
        assert_eq!(SliceBounds::slice_count(i32::MAX), i32::MAX / 16 + 1);
    }

    #[test]
    fn display_is_a_cache_key() {
        assert_eq!(MapType::underground(3, Dimension::Nether).to_string(), "-1|underground|3");
        assert_eq!(MapType::day(Dimension::Overworld).to_string(), "0|day");
    }
}
