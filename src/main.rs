use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use rayon::prelude::*;

use cartograph_blocks::BlockRegistry;
use cartograph_render::paint::bad_block_count;
use cartograph_render::{ChunkPixels, ChunkRenderController, RenderConfig, RenderOutcome, Rgb};
use cartograph_world::{
    ChunkCoord, ChunkSource, ChunkStore, Dimension, MapType, WorldGenConfig, WorldGenerator, CHUNK_SIZE,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MapArg {
    Day,
    Night,
    Underground,
    Topo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DimensionArg {
    Overworld,
    Nether,
    End,
}

impl From<DimensionArg> for Dimension {
    fn from(d: DimensionArg) -> Self {
        match d {
            DimensionArg::Overworld => Dimension::Overworld,
            DimensionArg::Nether => Dimension::Nether,
            DimensionArg::End => Dimension::End,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cartograph")]
#[command(about = "Render map tiles of a generated voxel region")]
struct Args {
    /// Block definitions (TOML)
    #[arg(long, default_value = "assets/blocks.toml")]
    blocks: PathBuf,

    /// Renderer settings (TOML); built-in defaults when omitted
    #[arg(long)]
    render: Option<PathBuf>,

    /// Terrain generator settings (TOML)
    #[arg(long)]
    worldgen: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = MapArg::Day)]
    map: MapArg,

    /// Vertical slice for underground maps (16 blocks each)
    #[arg(long)]
    slice: Option<i32>,

    #[arg(long, value_enum, default_value_t = DimensionArg::Overworld)]
    dimension: DimensionArg,

    /// Chunks rendered on each side of the origin chunk
    #[arg(long, default_value = "2")]
    radius: i32,

    #[arg(short, long, default_value = "1337")]
    seed: i32,

    /// Print every pixel of the origin chunk as hex
    #[arg(long)]
    dump: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let reg = Arc::new(BlockRegistry::load_from_path(&args.blocks)?);
    log::info!(target: "blocks", "loaded {} block types from {}", reg.len(), args.blocks.display());
    let config = match &args.render {
        Some(path) => RenderConfig::from_path(path)?,
        None => RenderConfig::default(),
    };
    let gen_config = match &args.worldgen {
        Some(path) => WorldGenConfig::from_path(path)?,
        None => WorldGenConfig::default(),
    };

    let dimension = Dimension::from(args.dimension);
    let map_type = match args.map {
        MapArg::Day => MapType::day(dimension),
        MapArg::Night => MapType::night(dimension),
        MapArg::Underground => MapType {
            slice: args.slice,
            ..MapType::underground(0, dimension)
        },
        MapArg::Topo => MapType::topo(dimension),
    };

    let radius = args.radius.max(0);
    let store = Arc::new(ChunkStore::new());
    let controller = Arc::new(ChunkRenderController::new(Arc::new(config), Arc::clone(&reg)));
    store.add_listener(controller.clone());

    // One extra ring so edge chunks have neighbors to shade against
    let generator = WorldGenerator::new(args.seed, gen_config, &reg)?;
    let ring: Vec<ChunkCoord> = square(radius + 1);
    let generated: Vec<_> = ring
        .par_iter()
        .map(|c| Arc::new(generator.generate(*c, dimension, &reg)))
        .collect();
    for chunk in generated {
        store.insert(chunk);
    }
    log::info!(target: "world", "generated {} chunks (seed {})", store.len(), args.seed);

    let coords = square(radius);
    let rendered: Vec<(ChunkCoord, ChunkPixels, RenderOutcome)> = coords
        .par_iter()
        .map(|c| -> Result<_, Box<dyn Error + Send + Sync>> {
            let chunk = store
                .chunk(*c)
                .ok_or_else(|| format!("chunk ({}, {}) was not generated", c.cx, c.cz))?;
            let mut px = ChunkPixels::new();
            let outcome = controller.render_chunk(store.as_ref(), chunk.as_ref(), map_type, &mut px)?;
            Ok((*c, px, outcome))
        })
        .collect::<Result<_, _>>()
        .map_err(|e| e.to_string())?;

    let span = (2 * radius + 1) as usize;
    println!("{map_type} seed={} radius={radius}", args.seed);
    for row in overview(&rendered, radius, span) {
        println!("{row}");
    }

    let failed = rendered.iter().filter(|(_, _, o)| !o.ok).count();
    let painted: usize = rendered.iter().map(|(_, _, o)| o.painted).sum();
    let bad: usize = rendered.iter().map(|(_, _, o)| o.bad).sum();
    log::info!(
        target: "render",
        "rendered {} chunks: {painted} columns painted, {bad} bad, {failed} chunks not ok",
        rendered.len()
    );

    if args.dump {
        if let Some((_, px, _)) = rendered.iter().find(|(c, _, _)| *c == ChunkCoord::new(0, 0)) {
            for row in px.hex_rows() {
                println!("{row}");
            }
        }
    }

    for (name, stats) in controller.cache_stats() {
        for s in stats {
            if s.hits + s.misses == 0 {
                continue;
            }
            println!(
                "{name:>8} {:<8} hits={} misses={} evictions={} entries={}",
                s.name, s.hits, s.misses, s.evictions, s.entries
            );
        }
    }
    println!("bad blocks: {}", bad_block_count());

    // Dropping the outer ring invalidates every cached grid for it
    for c in ring.iter().filter(|c| c.cx.abs() > radius || c.cz.abs() > radius) {
        store.unload(*c);
    }
    let cached: usize = controller
        .cache_stats()
        .iter()
        .flat_map(|(_, s)| s.iter().map(|s| s.entries))
        .sum();
    log::debug!(target: "cache", "{cached} grids cached after unloading the border");
    Ok(())
}

fn square(radius: i32) -> Vec<ChunkCoord> {
    let mut v = Vec::new();
    for cz in -radius..=radius {
        for cx in -radius..=radius {
            v.push(ChunkCoord::new(cx, cz));
        }
    }
    v
}

const RAMP: &[u8] = b" .:-=+*#%@";

fn shade_char(color: Option<Rgb>, bad: bool) -> char {
    if bad {
        return '!';
    }
    match color {
        None => ' ',
        Some(c) if c == Rgb::VOID => '~',
        Some(c) => {
            let i = (c.luminance().clamp(0.0, 1.0) * (RAMP.len() - 1) as f32).round() as usize;
            RAMP[i.min(RAMP.len() - 1)] as char
        }
    }
}

/// Luminance sketch of the region, one character per column.
fn overview(rendered: &[(ChunkCoord, ChunkPixels, RenderOutcome)], radius: i32, span: usize) -> Vec<String> {
    let width = span * CHUNK_SIZE;
    let mut rows = vec![vec![' '; width]; width];
    for (c, px, _) in rendered {
        let ox = (c.cx + radius) as usize * CHUNK_SIZE;
        let oz = (c.cz + radius) as usize * CHUNK_SIZE;
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                rows[oz + z][ox + x] = shade_char(px.get(x, z), px.is_bad(x, z));
            }
        }
    }
    rows.into_iter().map(|r| r.into_iter().collect()).collect()
}
