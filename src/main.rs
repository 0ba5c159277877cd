//! verdant - headless runner for the top-down farming/survival simulation
//!
//! Builds a world from a TOML config, drops a player in, drives it with
//! scripted input for a fixed number of ticks and prints a summary.

mod config;
mod scripted_input;

use anyhow::{Context, Result};
use clap::Parser;
use config::{RunnerConfig, DEFAULT_CONFIG_PATH};
use glam::{DVec2, IVec2};
use scripted_input::ScriptedInputPlayer;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use verdant_core::TICKS_PER_SECOND;
use verdant_world::{tile_center, TelescopeKind, WorldContext};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the verdant simulation headless", long_about = None)]
struct Args {
    /// Runner configuration (TOML)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Number of simulation ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    /// Override both the world seed and the gameplay RNG seed
    #[arg(long)]
    seed: Option<u64>,
    /// Scripted input (JSON); defaults to a built-in patrol
    #[arg(long)]
    script: Option<PathBuf>,
    /// Write one JSON tick report per line
    #[arg(long)]
    report: Option<PathBuf>,
    /// Write the effective configuration to this path and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting verdant v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut cfg = RunnerConfig::load_from_path(&args.config);
    if let Some(seed) = args.seed {
        cfg.world.world_seed = seed;
        cfg.world.rng_seed = Some(seed);
    }
    if let Some(path) = &args.dump_config {
        cfg.save_to_path(path)?;
        println!("Wrote configuration to {}", path.display());
        return Ok(());
    }
    if cfg.world.rng_seed.is_none() {
        warn!("No rng_seed configured; this run will not be reproducible");
    }

    let content = cfg.load_content()?;
    let mut world = WorldContext::new(cfg.world.clone(), content)?;
    let player = world.spawn_player(tile_center(IVec2::ZERO))?;

    let mut script = match &args.script {
        Some(path) => ScriptedInputPlayer::from_path(path)
            .with_context(|| format!("loading script {}", path.display()))?,
        None => ScriptedInputPlayer::patrol(),
    };
    let mut report_sink = match &args.report {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => None,
    };

    let mut actions: BTreeMap<TelescopeKind, usize> = BTreeMap::new();
    let mut spawned = 0usize;
    let mut hits = 0usize;
    let mut commands = 0usize;
    for _ in 0..args.ticks {
        let position = world
            .players()
            .get(player)
            .map_or(DVec2::ZERO, |p| p.body.position());
        let input = script.advance(position);
        let report = world.tick(&input)?;

        if let Some(kind) = report.action {
            *actions.entry(kind).or_insert(0) += 1;
        }
        spawned += report.spawned.len();
        hits += report.hits;
        commands += report.commands;
        if let Some(sink) = report_sink.as_mut() {
            serde_json::to_writer(&mut *sink, &report)?;
            sink.write_all(b"\n")?;
        }
    }
    if let Some(mut sink) = report_sink {
        sink.flush()?;
    }

    let seconds = args.ticks as f64 / TICKS_PER_SECOND as f64;
    println!(
        "Simulated {} ticks ({seconds:.1}s) on seed {}",
        args.ticks,
        world.config().world_seed
    );
    println!(
        "  chunks generated: {}",
        world.chunks().generated_chunks()
    );
    println!(
        "  mobs: {} spawned, {} alive",
        spawned,
        world.mobs().count()
    );
    println!("  items on the ground: {}", world.items().count());
    println!("  projectile hits: {hits}, deferred commands: {commands}");
    for (kind, count) in &actions {
        println!("  action {kind:?}: {count}");
    }
    if let Some(p) = world.players().get(player) {
        println!(
            "  player at {:?} with {} items, hp {}/{}",
            p.body.tile(),
            p.inventory.total(),
            p.hp,
            p.max_hp
        );
    }
    Ok(())
}
