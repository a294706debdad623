//! Headless race replay: runs a seeded race for a fixed duration with a
//! scripted driver and prints the exported race snapshot as JSON.
//!
//! Usage:
//!   cargo run --bin circuit-replay -- --seed 7 --duration-ms 30000 --steer weave
//!   RUST_LOG=debug cargo run --bin circuit-replay -- --config race.json

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use circuit_racer::{DriverInput, FrameDriver, RaceConfig, RaceSimulation};
use clap::{Parser, ValueEnum};

/// Replay chunk; input changes only between chunks
const CHUNK_MS: f32 = 250.0;
/// Weave flips direction after this many chunks
const WEAVE_CHUNKS: u32 = 4;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Steer {
    None,
    Left,
    Right,
    /// Alternate left and right every second
    Weave,
}

#[derive(Parser, Debug)]
#[command(name = "circuit-replay")]
#[command(about = "Replay a seeded circuit race headlessly and print its snapshot")]
struct Args {
    /// Random seed for grid placement and AI decisions
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Simulated duration in milliseconds
    #[arg(long, default_value_t = 10_000.0)]
    duration_ms: f32,

    /// JSON race config; missing fields fall back to defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override laps to finish
    #[arg(long)]
    laps: Option<u32>,

    /// Override the number of AI cars
    #[arg(long)]
    ai_count: Option<usize>,

    #[arg(long, value_enum, default_value_t = Steer::None)]
    steer: Steer,

    /// Release the throttle for the whole run
    #[arg(long)]
    coast: bool,

    /// Pretty-print the snapshot
    #[arg(long)]
    pretty: bool,
}

fn load_config(args: &Args) -> Result<RaceConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => RaceConfig::default(),
    };
    if let Some(laps) = args.laps {
        config.laps_to_finish = laps;
    }
    if let Some(ai_count) = args.ai_count {
        config.ai_count = ai_count;
        config.filler_count = config.filler_count.min(ai_count);
    }
    Ok(config)
}

fn input_for(steer: Steer, chunk: u32, coast: bool) -> DriverInput {
    let (steer_left, steer_right) = match steer {
        Steer::None => (false, false),
        Steer::Left => (true, false),
        Steer::Right => (false, true),
        Steer::Weave => {
            let left = (chunk / WEAVE_CHUNKS) % 2 == 0;
            (left, !left)
        }
    };
    DriverInput {
        steer_left,
        steer_right,
        accelerate: !coast,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let race = RaceSimulation::with_seed(config, args.seed).context("failed to set up race")?;
    let mut driver = FrameDriver::new(race);

    let mut remaining = args.duration_ms.max(0.0);
    let mut chunk = 0;
    while remaining > 0.0 && !driver.race().is_finished() {
        let ms = remaining.min(CHUNK_MS);
        driver.set_input(input_for(args.steer, chunk, args.coast));
        driver.advance_time(ms);
        remaining -= ms;
        chunk += 1;
    }

    let snapshot = driver.snapshot();
    let json = if args.pretty {
        snapshot.to_json_pretty()
    } else {
        snapshot.to_json()
    }
    .context("failed to serialize snapshot")?;
    println!("{json}");

    let stats = driver.stats();
    log::info!(
        "{} steps, {:.3}ms average step, state {:?}",
        stats.step_count,
        stats.avg_step_time_ms,
        stats.state
    );
    Ok(())
}
