//! Block identity, descriptor flags, and the descriptor registry.
#![forbid(unsafe_code)]

pub mod config;
pub mod registry;
pub mod types;

pub use registry::BlockRegistry;
pub use types::{Block, BlockDesc, BlockFlags, BlockId, BlockState};
