use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

// Compact voxel representation stored in chunks
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub state: BlockState,
}

pub type BlockId = u16;
pub type BlockState = u16;

impl Block {
    pub const AIR: Block = Block { id: 0, state: 0 };

    #[inline]
    pub const fn new(id: BlockId, state: BlockState) -> Self {
        Self { id, state }
    }
}

/// Classification flags that drive how a block is mapped.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct BlockFlags(u32);

impl BlockFlags {
    pub const NONE: BlockFlags = BlockFlags(0);
    pub const AIR: BlockFlags = BlockFlags(1 << 0);
    pub const WATER: BlockFlags = BlockFlags(1 << 1);
    pub const LAVA: BlockFlags = BlockFlags(1 << 2);
    pub const PLANT: BlockFlags = BlockFlags(1 << 3);
    pub const CROP: BlockFlags = BlockFlags(1 << 4);
    pub const TRANSPARENT_ROOF: BlockFlags = BlockFlags(1 << 5);
    pub const OPEN_TO_SKY: BlockFlags = BlockFlags(1 << 6);
    pub const NO_SHADOW: BlockFlags = BlockFlags(1 << 7);
    pub const TRANSPARENCY: BlockFlags = BlockFlags(1 << 8);
    pub const NO_TOPO: BlockFlags = BlockFlags(1 << 9);
    pub const EMISSIVE: BlockFlags = BlockFlags(1 << 10);
    pub const GRASS: BlockFlags = BlockFlags(1 << 11);
    pub const FOLIAGE: BlockFlags = BlockFlags(1 << 12);
    pub const BIOME_WATER: BlockFlags = BlockFlags(1 << 13);
    pub const ERROR: BlockFlags = BlockFlags(1 << 14);

    const NAMED: [(&'static str, BlockFlags); 15] = [
        ("air", Self::AIR),
        ("water", Self::WATER),
        ("lava", Self::LAVA),
        ("plant", Self::PLANT),
        ("crop", Self::CROP),
        ("transparent_roof", Self::TRANSPARENT_ROOF),
        ("open_to_sky", Self::OPEN_TO_SKY),
        ("no_shadow", Self::NO_SHADOW),
        ("transparency", Self::TRANSPARENCY),
        ("no_topo", Self::NO_TOPO),
        ("emissive", Self::EMISSIVE),
        ("grass", Self::GRASS),
        ("foliage", Self::FOLIAGE),
        ("biome_water", Self::BIOME_WATER),
        ("error", Self::ERROR),
    ];

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: BlockFlags) -> bool {
        other.0 != 0 && (self.0 & other.0) == other.0
    }

    #[inline]
    pub const fn intersects(self, other: BlockFlags) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub const fn union(self, other: BlockFlags) -> BlockFlags {
        BlockFlags(self.0 | other.0)
    }

    #[inline]
    pub fn insert(&mut self, other: BlockFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: BlockFlags) {
        self.0 &= !other.0;
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Looks up a flag by its config name (`"no_shadow"`, `"transparent_roof"`, ...).
    pub fn from_name(name: &str) -> Option<BlockFlags> {
        let wanted = name.trim();
        Self::NAMED
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(wanted))
            .map(|(_, f)| *f)
    }

    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .iter()
            .filter(move |(_, f)| self.contains(*f))
            .map(|(n, _)| *n)
    }
}

impl BitOr for BlockFlags {
    type Output = BlockFlags;
    fn bitor(self, rhs: BlockFlags) -> BlockFlags {
        self.union(rhs)
    }
}

impl BitOrAssign for BlockFlags {
    fn bitor_assign(&mut self, rhs: BlockFlags) {
        self.insert(rhs);
    }
}

impl fmt::Debug for BlockFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Everything the renderers need to know about one (type, variant) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockDesc {
    pub block: Block,
    pub name: String,
    /// Base map color as 0xRRGGBB.
    pub color: u32,
    /// Opacity in `[0, 1]`; 1.0 is fully opaque.
    pub alpha: f32,
    pub flags: BlockFlags,
    /// How much light the block absorbs (0..=15).
    pub light_opacity: u8,
}

impl BlockDesc {
    pub const ERROR_COLOR: u32 = 0xFF00FF;

    /// Descriptor used for block ids the registry doesn't know.
    pub fn unknown(block: Block) -> Self {
        Self {
            block,
            name: format!("unknown:{}:{}", block.id, block.state),
            color: Self::ERROR_COLOR,
            alpha: 1.0,
            flags: BlockFlags::ERROR,
            light_opacity: 15,
        }
    }

    #[inline]
    pub fn has_flag(&self, flag: BlockFlags) -> bool {
        self.flags.contains(flag)
    }
    #[inline]
    pub fn is_air(&self) -> bool {
        self.flags.contains(BlockFlags::AIR)
    }
    #[inline]
    pub fn is_water(&self) -> bool {
        self.flags.contains(BlockFlags::WATER)
    }
    #[inline]
    pub fn is_lava(&self) -> bool {
        self.flags.contains(BlockFlags::LAVA)
    }
    #[inline]
    pub fn is_transparent_roof(&self) -> bool {
        self.flags.contains(BlockFlags::TRANSPARENT_ROOF)
    }
    #[inline]
    pub fn has_no_shadow(&self) -> bool {
        self.flags.contains(BlockFlags::NO_SHADOW)
    }
    #[inline]
    pub fn has_transparency(&self) -> bool {
        self.flags.contains(BlockFlags::TRANSPARENCY)
    }
    #[inline]
    pub fn is_open_to_sky(&self) -> bool {
        self.flags.contains(BlockFlags::OPEN_TO_SKY)
    }
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.alpha >= 1.0
    }
    #[inline]
    pub fn is_error(&self) -> bool {
        self.flags.contains(BlockFlags::ERROR)
    }
}
