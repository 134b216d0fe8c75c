//! Landgrab map preview
//!
//! Generates a map from the command line and prints it, either as the
//! finished grid or step by step the way a client reveals it.

use clap::{Parser, ValueEnum};
use serde::Serialize;

use landgrab::core::error::Result;
use landgrab::map::ResourceKind;
use landgrab::mapgen::{
    self, replay_steps, GeneratedMap, GenerationStep, Level, MapOptions, MapSize,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SizeArg {
    S,
    M,
    L,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LevelArg {
    Low,
    Med,
    High,
}

impl From<LevelArg> for Level {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Low => Level::Low,
            LevelArg::Med => Level::Medium,
            LevelArg::High => Level::High,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Preview a generated Landgrab map
#[derive(Parser, Debug)]
#[command(name = "landgrab")]
#[command(about = "Generate a territory map and print it")]
struct Args {
    /// Map size
    #[arg(long, value_enum, default_value = "m")]
    size: SizeArg,

    /// How many territories to aim for
    #[arg(long, value_enum, default_value = "med")]
    territories: LevelArg,

    /// Let land touch the map edge
    #[arg(long)]
    no_water_border: bool,

    /// How many separate landmasses
    #[arg(long, value_enum, default_value = "low")]
    islands: LevelArg,

    /// Share of territories with a bonus resource
    #[arg(long, value_enum, default_value = "med")]
    resources: LevelArg,

    /// Random seed for a repeatable map
    #[arg(long)]
    seed: Option<u64>,

    /// Print the grid after every generation step
    #[arg(long)]
    steps: bool,

    #[arg(long, value_enum, default_value = "text")]
    format: Format,
}

#[derive(Serialize)]
struct Preview<'a> {
    seed: u64,
    options: &'a MapOptions,
    grid: Vec<Vec<u16>>,
    territories: Vec<TerritorySummary>,
    steps: Vec<&'a GenerationStep>,
}

#[derive(Serialize)]
struct TerritorySummary {
    id: u16,
    name: String,
    resource: ResourceKind,
    adjacent: Vec<u16>,
    coastal: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "landgrab=info".into()),
        )
        .init();

    let args = Args::parse();
    let options = MapOptions {
        size: match args.size {
            SizeArg::S => MapSize::Small,
            SizeArg::M => MapSize::Medium,
            SizeArg::L => MapSize::Large,
        },
        territory_count: args.territories.into(),
        water_border: !args.no_water_border,
        islands: args.islands.into(),
        resources: args.resources.into(),
        seed: args.seed.unwrap_or_else(rand::random),
    };

    tracing::info!(seed = options.seed, "generating map");
    let generated = mapgen::generate(&options)?;

    match args.format {
        Format::Json => print_json(&generated, args.steps)?,
        Format::Text => print_text(&generated, args.steps),
    }
    Ok(())
}

fn summaries(generated: &GeneratedMap) -> Vec<TerritorySummary> {
    generated
        .territories()
        .into_iter()
        .map(|t| TerritorySummary {
            id: t.id.0,
            coastal: generated.map.is_coastal(t.id),
            adjacent: t.adjacent.iter().map(|a| a.0).collect(),
            name: t.name,
            resource: t.resource,
        })
        .collect()
}

fn print_json(generated: &GeneratedMap, with_steps: bool) -> Result<()> {
    let preview = Preview {
        seed: generated.seed,
        options: &generated.options,
        grid: generated.map.rows(),
        territories: summaries(generated),
        steps: if with_steps {
            generated.steps().collect()
        } else {
            Vec::new()
        },
    };
    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(())
}

fn print_text(generated: &GeneratedMap, with_steps: bool) {
    let map = &generated.map;
    if with_steps {
        let steps: Vec<&GenerationStep> = generated.steps().collect();
        for n in 1..steps.len() {
            println!("-- step {n} --");
            print_grid(&replay_steps(map.width(), map.height(), steps[..n].iter().copied()));
        }
    }

    println!(
        "=== {}x{} map, {} territories, {} water bodies (seed {}) ===",
        map.width(),
        map.height(),
        map.territory_count(),
        map.water_bodies().len(),
        generated.seed
    );
    print_grid(&map.rows());
    println!();

    for t in summaries(generated) {
        println!(
            "{:>3} {:<20} {:<10} {} adj {:?}",
            t.id,
            t.name,
            format!("{:?}", t.resource),
            if t.coastal { "coast" } else { "     " },
            t.adjacent
        );
    }
}

fn print_grid(rows: &[Vec<u16>]) {
    for row in rows {
        let line: String = row
            .iter()
            .map(|&id| if id == 0 { " ~ ".to_string() } else { format!("{id:>3}") })
            .collect();
        println!("{line}");
    }
}
