//! Chunk-to-pixel map rendering: height resolution, slope shading, layer
//! compositing, and the surface, cave and topographic renderers built on them.
#![forbid(unsafe_code)]

pub mod cache;
pub mod cave;
pub mod color;
pub mod colorizer;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod height;
pub mod lighting;
pub mod log_once;
pub mod paint;
pub mod slope;
pub mod strata;
pub mod stratum;
pub mod surface;
pub mod topo;

#[cfg(test)]
mod testkit;

pub use cache::{CacheStats, GridKey, RenderCaches};
pub use cave::CaveRenderer;
pub use color::Rgb;
pub use config::RenderConfig;
pub use controller::ChunkRenderController;
pub use driver::RenderOutcome;
pub use error::RenderError;
pub use paint::{ChunkPainter, ChunkPixels};
pub use surface::SurfaceRenderer;
pub use topo::TopoRenderer;
