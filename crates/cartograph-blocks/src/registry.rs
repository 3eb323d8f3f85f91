use hashbrown::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use super::config::{BlockDef, BlocksConfig, ColorDef, VariantDef};
use super::types::{Block, BlockDesc, BlockFlags, BlockId, BlockState};

#[derive(Clone, Debug)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub base: BlockDesc,
    pub variants: HashMap<BlockState, BlockDesc>,
}

impl BlockType {
    /// Descriptor for `state`, falling back to the base definition.
    pub fn desc(&self, state: BlockState) -> &BlockDesc {
        self.variants.get(&state).unwrap_or(&self.base)
    }
}

/// Block type table plus a process-wide cache of resolved descriptors.
///
/// Each (type, variant) pair is resolved at most once; later lookups hand out
/// the same `Arc<BlockDesc>`.
#[derive(Debug, Default)]
pub struct BlockRegistry {
    pub types: HashMap<BlockId, BlockType>,
    pub by_name: HashMap<String, BlockId>,
    pub unknown_block_id: Option<BlockId>,
    resolved: RwLock<HashMap<Block, Arc<BlockDesc>>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(src: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BlocksConfig = toml::from_str(src)?;
        Self::from_config(cfg)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let path = path.as_ref();
        let src = fs::read_to_string(path)
            .map_err(|e| format!("reading {}: {e}", path.display()))?;
        let reg = Self::from_toml_str(&src)?;
        log::info!(
            target: "blocks",
            "loaded {} block types from {}",
            reg.types.len(),
            path.display()
        );
        Ok(reg)
    }

    pub fn from_config(cfg: BlocksConfig) -> Result<Self, Box<dyn Error>> {
        let mut reg = BlockRegistry::new();
        let mut next_id: BlockId = 0;
        for def in cfg.blocks.into_iter() {
            let id = def.id.unwrap_or(next_id);
            if let Some(prev) = reg.types.get(&id) {
                return Err(format!(
                    "block '{}' reuses id {id} already taken by '{}'",
                    def.name, prev.name
                )
                .into());
            }
            if reg.by_name.contains_key(&def.name) {
                return Err(format!("block '{}' is defined twice", def.name).into());
            }
            let ty = compile_type(id, def)?;
            reg.by_name.insert(ty.name.clone(), id);
            reg.types.insert(id, ty);
            next_id = id.saturating_add(1).max(next_id);
        }
        if let Some(name) = cfg.unknown_block {
            let id = reg
                .id_by_name(&name)
                .ok_or_else(|| format!("unknown_block '{name}' is not defined"))?;
            reg.unknown_block_id = Some(id);
        }
        Ok(reg)
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.types.get(&id)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn block_by_name(&self, name: &str) -> Option<Block> {
        self.id_by_name(name).map(|id| Block::new(id, 0))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Number of distinct descriptors resolved so far.
    pub fn resolved_count(&self) -> usize {
        self.resolved.read().unwrap().len()
    }

    /// Returns the shared descriptor for `block`, resolving it on first use.
    pub fn resolve(&self, block: Block) -> Arc<BlockDesc> {
        if let Some(desc) = self.resolved.read().unwrap().get(&block) {
            return Arc::clone(desc);
        }
        let desc = self.build_desc(block);
        let mut resolved = self.resolved.write().unwrap();
        Arc::clone(resolved.entry(block).or_insert_with(|| Arc::new(desc)))
    }

    pub fn resolve_name(&self, name: &str) -> Option<Arc<BlockDesc>> {
        self.block_by_name(name).map(|b| self.resolve(b))
    }

    fn build_desc(&self, block: Block) -> BlockDesc {
        if let Some(ty) = self.get(block.id) {
            let mut desc = ty.desc(block.state).clone();
            desc.block = block;
            return desc;
        }
        log::debug!(target: "blocks", "no block type for id {}", block.id);
        match self.unknown_block_id.and_then(|id| self.get(id)) {
            Some(ty) => {
                let mut desc = ty.base.clone();
                desc.block = block;
                desc.flags.insert(BlockFlags::ERROR);
                desc
            }
            None => BlockDesc::unknown(block),
        }
    }
}

fn parse_flags(owner: &str, names: &[String]) -> Result<BlockFlags, Box<dyn Error>> {
    let mut flags = BlockFlags::NONE;
    for name in names {
        let flag = BlockFlags::from_name(name)
            .ok_or_else(|| format!("block '{owner}': unknown flag '{name}'"))?;
        flags.insert(flag);
    }
    Ok(flags)
}

fn parse_color(owner: &str, color: Option<&ColorDef>) -> Result<Option<u32>, Box<dyn Error>> {
    match color {
        Some(c) => Ok(Some(c.to_rgb().map_err(|e| format!("block '{owner}': {e}"))?)),
        None => Ok(None),
    }
}

fn check_alpha(owner: &str, alpha: f32) -> Result<f32, Box<dyn Error>> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(format!("block '{owner}': alpha {alpha} outside [0, 1]").into());
    }
    Ok(alpha)
}

fn compile_type(id: BlockId, def: BlockDef) -> Result<BlockType, Box<dyn Error>> {
    let flags = parse_flags(&def.name, &def.flags)?;
    let is_air = flags.contains(BlockFlags::AIR);
    let color = parse_color(&def.name, def.color.as_ref())?.unwrap_or(0);
    let alpha = check_alpha(&def.name, def.alpha.unwrap_or(if is_air { 0.0 } else { 1.0 }))?;
    let light_opacity = def
        .light_opacity
        .unwrap_or(if is_air || alpha < 1.0 { 0 } else { 15 })
        .min(15);
    let base = BlockDesc {
        block: Block::new(id, 0),
        name: def.name.clone(),
        color,
        alpha,
        flags,
        light_opacity,
    };
    let mut variants = HashMap::new();
    for v in def.variants.into_iter() {
        let state = v.state;
        let desc = compile_variant(&base, v)?;
        variants.insert(state, desc);
    }
    Ok(BlockType {
        id,
        name: def.name,
        base,
        variants,
    })
}

fn compile_variant(base: &BlockDesc, v: VariantDef) -> Result<BlockDesc, Box<dyn Error>> {
    let name = v
        .name
        .unwrap_or_else(|| format!("{}[{}]", base.name, v.state));
    let flags = match v.flags.as_deref() {
        Some(names) => parse_flags(&name, names)?,
        None => base.flags,
    };
    Ok(BlockDesc {
        block: Block::new(base.block.id, v.state),
        color: parse_color(&name, v.color.as_ref())?.unwrap_or(base.color),
        alpha: check_alpha(&name, v.alpha.unwrap_or(base.alpha))?,
        light_opacity: v.light_opacity.unwrap_or(base.light_opacity).min(15),
        flags,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[blocks]]
        name = "air"
        flags = ["air"]

        [[blocks]]
        name = "stone"
        color = 0x7F7F7F

        [[blocks]]
        name = "glass"
        color = 0xDDEEFF
        alpha = 0.3
        flags = ["transparent_roof", "no_shadow", "transparency"]

        [[blocks]]
        name = "wool"
        id = 10
        color = 0xFFFFFF
        [[blocks.variants]]
        state = 14
        color = 0xA12722
    "#;

    #[test]
    fn assigns_sequential_and_explicit_ids() {
        let reg = BlockRegistry::from_toml_str(SAMPLE).unwrap();
        assert_eq!(reg.id_by_name("air"), Some(0));
        assert_eq!(reg.id_by_name("glass"), Some(2));
        assert_eq!(reg.id_by_name("wool"), Some(10));
    }

    #[test]
    fn defaults_follow_flags_and_alpha() {
        let reg = BlockRegistry::from_toml_str(SAMPLE).unwrap();
        let air = reg.resolve(Block::AIR);
        assert!(air.is_air());
        assert_eq!(air.alpha, 0.0);
        assert_eq!(air.light_opacity, 0);
        let stone = reg.resolve_name("stone").unwrap();
        assert_eq!(stone.alpha, 1.0);
        assert_eq!(stone.light_opacity, 15);
        let glass = reg.resolve_name("glass").unwrap();
        assert_eq!(glass.light_opacity, 0);
        assert!(glass.is_transparent_roof() && glass.has_no_shadow());
    }

    #[test]
    fn variants_override_base_fields() {
        let reg = BlockRegistry::from_toml_str(SAMPLE).unwrap();
        let red = reg.resolve(Block::new(10, 14));
        assert_eq!(red.color, 0xA12722);
        assert_eq!(red.name, "wool[14]");
        let plain = reg.resolve(Block::new(10, 3));
        assert_eq!(plain.color, 0xFFFFFF);
        assert_eq!(plain.block, Block::new(10, 3));
    }

    #[test]
    fn resolution_is_shared() {
        let reg = BlockRegistry::from_toml_str(SAMPLE).unwrap();
        let a = reg.resolve(Block::new(1, 0));
        let b = reg.resolve(Block::new(1, 0));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.resolved_count(), 1);
    }

    #[test]
    fn unknown_ids_resolve_to_error_descriptor() {
        let reg = BlockRegistry::from_toml_str(SAMPLE).unwrap();
        let d = reg.resolve(Block::new(999, 0));
        assert!(d.is_error());
        assert_eq!(d.color, BlockDesc::ERROR_COLOR);
    }

    #[test]
    fn unknown_block_fallback_keeps_its_color() {
        let src = format!("unknown_block = \"stone\"\n{SAMPLE}");
        let reg = BlockRegistry::from_toml_str(&src).unwrap();
        let d = reg.resolve(Block::new(999, 0));
        assert!(d.is_error());
        assert_eq!(d.color, 0x7F7F7F);
    }

    #[test]
    fn rejects_unknown_flags_and_duplicate_ids() {
        let bad_flag = r#"
            [[blocks]]
            name = "x"
            flags = ["sparkly"]
        "#;
        assert!(BlockRegistry::from_toml_str(bad_flag).is_err());
        let dup = r#"
            [[blocks]]
            name = "a"
            id = 3
            [[blocks]]
            name = "b"
            id = 3
        "#;
        assert!(BlockRegistry::from_toml_str(dup).is_err());
    }
}
