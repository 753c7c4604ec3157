use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use starmap_navigator::data::{read_field_from_file, write_field_to_file};
use starmap_navigator::field::{generate_field, FieldConfig, NameRegistry, StarField};
use starmap_navigator::geometry::Point2D;
use starmap_navigator::spatial::KDTree;
use starmap_navigator::transit::{simulate_voyage, TransitConfig, TransitController, VoyageReport};
use starmap_navigator::{config, BodyId};

/// Fly a vessel between two bodies of a star field and print the voyage log.
#[derive(Parser)]
#[command(name = "plot_voyage")]
#[command(about = "Simulate an orbit-to-orbit transit on a star field")]
struct Cli {
    /// Load the field from a dataset file instead of generating one
    #[arg(long)]
    field: Option<PathBuf>,

    /// Field generation settings (JSON)
    #[arg(long)]
    field_config: Option<PathBuf>,

    /// Transit tuning (JSON)
    #[arg(long)]
    transit_config: Option<PathBuf>,

    #[arg(long, default_value = "42")]
    seed: u64,

    /// Body to start in orbit around (default: first body)
    #[arg(long)]
    from: Option<BodyId>,

    /// Destination body (default: the body nearest the far side of the map)
    #[arg(long)]
    to: Option<BodyId>,

    #[arg(long, default_value = "20000")]
    max_ticks: usize,

    /// Write the field used for the voyage to this dataset file
    #[arg(long)]
    save_field: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    seed: u64,
    bodies: usize,
    from: BodyId,
    to: BodyId,
    voyage: &'a VoyageReport,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let transit_config: TransitConfig = match &cli.transit_config {
        Some(path) => config::from_json_file(path)
            .with_context(|| format!("failed to load transit config {}", path.display()))?,
        None => TransitConfig::default(),
    };

    let field = load_field(&cli)?;
    if let Some(path) = &cli.save_field {
        write_field_to_file(&field, path)
            .with_context(|| format!("failed to write field to {}", path.display()))?;
        info!("Wrote {} bodies to {}", field.len(), path.display());
    }

    let from = match cli.from {
        Some(id) => id,
        None => field
            .bodies
            .first()
            .map(|b| b.id)
            .ok_or_else(|| anyhow!("field has no bodies"))?,
    };
    let to = match cli.to {
        Some(id) => id,
        None => farthest_reachable(&field, from)?,
    };

    let dt = transit_config.reference_frame;
    let mut vessel = TransitController::new(1, from, 0.0, transit_config, &field)
        .with_context(|| format!("cannot start in orbit around body {from}"))?;
    let voyage = simulate_voyage(&mut vessel, &field, to, dt, cli.max_ticks)
        .with_context(|| format!("cannot travel from {from} to {to}"))?;

    let report = Report {
        seed: cli.seed,
        bodies: field.len(),
        from,
        to,
        voyage: &voyage,
    };
    let json = serde_json::to_vec_pretty(&report)?;
    match &cli.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => println!("{}", String::from_utf8_lossy(&json)),
    }
    Ok(())
}

fn load_field(cli: &Cli) -> Result<StarField> {
    if let Some(path) = &cli.field {
        return read_field_from_file(path)
            .with_context(|| format!("failed to read field from {}", path.display()));
    }
    let field_config: FieldConfig = match &cli.field_config {
        Some(path) => config::from_json_file(path)
            .with_context(|| format!("failed to load field config {}", path.display()))?,
        None => FieldConfig::default(),
    };
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let field = generate_field(&field_config, &mut rng, &mut NameRegistry::new())?;
    info!("Generated {} bodies from seed {}", field.len(), cli.seed);
    Ok(field)
}

/// The body nearest the point mirrored through the origin from `from`.
fn farthest_reachable(field: &StarField, from: BodyId) -> Result<BodyId> {
    let origin = field
        .get(from)
        .ok_or_else(|| anyhow!("unknown start body {from}"))?
        .pos;
    let kd = KDTree::build(&field.bodies)?;
    let mirrored = Point2D::new(-origin.x, -origin.y);
    let hit = kd.nearest(mirrored)?;
    if hit.id == from {
        return Err(anyhow!("field has no destination distinct from body {from}"));
    }
    Ok(hit.id)
}
