use serde::Deserialize;

// Top-level blocks config file
#[derive(Deserialize, Debug, Clone)]
pub struct BlocksConfig {
    pub blocks: Vec<BlockDef>,
    // Optional name of a block whose descriptor stands in for ids the
    // registry doesn't know. If absent, unknown ids resolve to an error
    // descriptor.
    #[serde(default)]
    pub unknown_block: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BlockDef {
    pub name: String,
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default)]
    pub color: Option<ColorDef>,
    #[serde(default)]
    pub alpha: Option<f32>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub light_opacity: Option<u8>,
    #[serde(default)]
    pub variants: Vec<VariantDef>,
}

// Per-state overrides; anything left out falls back to the block definition
#[derive(Deserialize, Debug, Clone)]
pub struct VariantDef {
    pub state: u16,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<ColorDef>,
    #[serde(default)]
    pub alpha: Option<f32>,
    #[serde(default)]
    pub flags: Option<Vec<String>>,
    #[serde(default)]
    pub light_opacity: Option<u8>,
}

// Colors are either a TOML integer (0x7F7F7F) or a "#7f7f7f" string
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ColorDef {
    Packed(u32),
    Text(String),
}

impl ColorDef {
    pub fn to_rgb(&self) -> Result<u32, String> {
        match self {
            ColorDef::Packed(v) if *v <= 0xFF_FFFF => Ok(*v),
            ColorDef::Packed(v) => Err(format!("color {v:#x} is wider than 24 bits")),
            ColorDef::Text(s) => {
                let hex = s.trim().trim_start_matches('#');
                if hex.len() != 6 {
                    return Err(format!("color '{s}' must have six hex digits"));
                }
                u32::from_str_radix(hex, 16).map_err(|e| format!("color '{s}': {e}"))
            }
        }
    }
}
