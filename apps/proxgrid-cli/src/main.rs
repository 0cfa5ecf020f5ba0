use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::IVec2;
use proxgrid_common::{MapSize, ObjectHandle};
use proxgrid_index::{GridConfig, ProximityIndex};
use proxgrid_kernel::{ObjectData, Sensor, SensorKind, World, splitmix64};
use proxgrid_tools::GridInspector;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proxgrid-cli", about = "CLI tool for proxgrid operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Grid configuration file (JSON); defaults apply to missing fields
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print versions and the effective grid configuration
    Info,
    /// Run a seeded spawn/move/despawn workload against the index
    Simulate {
        /// Number of objects to start with
        #[arg(short, long, default_value = "500")]
        objects: usize,
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "100")]
        ticks: u64,
        /// RNG seed for the workload
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Map size in tiles, as WIDTHxHEIGHT
        #[arg(short, long, default_value = "64x64", value_parser = parse_map)]
        map: MapSize,
    },
    /// Print the cells a droid at a position with a sensor range covers
    Coverage {
        #[arg(long)]
        x: i32,
        #[arg(long)]
        y: i32,
        /// Sensor range in world units
        #[arg(short, long)]
        range: i32,
        /// Map size in tiles, as WIDTHxHEIGHT
        #[arg(short, long, default_value = "64x64", value_parser = parse_map)]
        map: MapSize,
    },
}

fn parse_map(s: &str) -> Result<MapSize, String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width = w.parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let height = h.parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    if width == 0 || height == 0 {
        return Err(format!("map must be at least 1x1, got {s:?}"));
    }
    Ok(MapSize::new(width, height))
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<GridConfig> {
    let Some(path) = path else {
        return Ok(GridConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: GridConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Seeded workload generator.
struct Workload {
    state: u64,
}

impl Workload {
    fn next(&mut self) -> u64 {
        self.state = splitmix64(self.state);
        self.state
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound.max(1)
    }

    fn position(&mut self, map: MapSize) -> IVec2 {
        let extent = map.world_extent();
        IVec2::new(
            self.below(extent.x as u64) as i32,
            self.below(extent.y as u64) as i32,
        )
    }

    fn object(&mut self, map: MapSize) -> ObjectData {
        let pos = self.position(map);
        match self.below(10) {
            0..=5 => ObjectData::droid(pos, 512 + self.below(1024) as i32),
            6 => ObjectData::structure(pos, Some(Sensor::standard(1536))),
            7 => ObjectData::structure(pos, None),
            _ => ObjectData::feature(pos),
        }
    }
}

fn simulate(
    config: GridConfig,
    objects: usize,
    ticks: u64,
    seed: u64,
    map: MapSize,
) -> anyhow::Result<()> {
    println!("Simulate: objects={objects} ticks={ticks} seed={seed} map={}x{}", map.width, map.height);

    let mut world = World::with_seed(map, seed);
    let mut workload = Workload { state: seed };
    let mut ids: Vec<ObjectHandle> = (0..objects)
        .map(|_| {
            let data = workload.object(map);
            world.spawn(data)
        })
        .collect();
    ids.push(world.spawn(ObjectData::structure(
        workload.position(map),
        Some(Sensor::new(0, SensorKind::SatUplink)),
    )));

    let mut index = ProximityIndex::new(config)?;
    world.drain_events();
    index.reset(&world);

    let mut query_hits = 0usize;
    for _ in 0..ticks {
        // A quarter of the objects drift by up to two tiles.
        for _ in 0..ids.len() / 4 {
            let id = ids[workload.below(ids.len() as u64) as usize];
            if let Some(data) = world.get(id) {
                let drift = IVec2::new(
                    workload.below(512) as i32 - 256,
                    workload.below(512) as i32 - 256,
                );
                let extent = map.world_extent() - IVec2::ONE;
                let target = (data.position + drift).clamp(IVec2::ZERO, extent);
                world.set_position(id, target);
            }
        }
        // A few die and are replaced.
        for _ in 0..(ids.len() / 50).max(1) {
            let slot = workload.below(ids.len() as u64) as usize;
            world.despawn(ids[slot]);
            let data = workload.object(map);
            ids[slot] = world.spawn(data);
        }
        world.step();
        index.tick(&mut world);

        for _ in 0..16 {
            let point = workload.position(map);
            query_hits += index.iterate_live(point, &world).count();
        }
    }

    tracing::info!(ticks, objects = world.object_count(), "simulation complete");
    let summary = GridInspector::summary(&index);
    println!("{summary}");
    println!("Average objects per query: {:.1}", query_hits as f64 / (ticks.max(1) * 16) as f64);

    let report = GridInspector::verify(&index, &world);
    println!("{report}");
    if !report.is_clean() {
        anyhow::bail!("grid integrity check failed");
    }

    index.shutdown();
    Ok(())
}

fn coverage(config: GridConfig, x: i32, y: i32, range: i32, map: MapSize) -> anyhow::Result<()> {
    let world = World::new(map);
    let mut index = ProximityIndex::new(config)?;
    index.reset(&world);

    let data = ObjectData::droid(IVec2::new(x, y), range);
    if !map.contains(data.position) {
        anyhow::bail!("position ({x}, {y}) is off the {}x{} map", map.width, map.height);
    }
    let cells = index.coverage_of(&data);
    println!(
        "Droid at ({x}, {y}) with range {} covers {} of {} cells:",
        index.range_of(&data),
        cells.len(),
        index.dims().cell_count()
    );
    print!("{}", GridInspector::coverage_map(&index, &data));
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Info => {
            println!("proxgrid-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("index: {}", proxgrid_index::crate_info());
            println!("tools: {}", proxgrid_tools::crate_info());
            println!("config: {}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Simulate {
            objects,
            ticks,
            seed,
            map,
        } => simulate(config, objects, ticks, seed, map)?,
        Commands::Coverage { x, y, range, map } => coverage(config, x, y, range, map)?,
    }

    Ok(())
}
