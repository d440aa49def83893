#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Grower levels in the terminal.

mod config;
mod session;

use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use grower_core::{CollisionRecord, LevelResult};
use grower_rendering::{Frame, FrameSink};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    config::{parse_moves, GrowerConfig, StrategyName},
    session::{Session, SessionEnd},
};

/// Grow a trail through a generated maze until the head is boxed in.
#[derive(Debug, Parser)]
#[command(name = "grower", version, about)]
struct CliArgs {
    /// Path to a grower.toml configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Seed for map generation, overriding the configuration file.
    #[arg(long, value_name = "N")]
    seed: Option<u64>,
    /// Scripted moves such as `NNEWS`; switches input to the scripted strategy.
    #[arg(long, value_name = "NESW")]
    moves: Option<String>,
    /// Maximum number of simulation ticks.
    #[arg(long, value_name = "N")]
    max_ticks: Option<u64>,
    /// Suppress frames and per-level summaries.
    #[arg(long)]
    quiet: bool,
}

/// Writes frames to standard output.
#[derive(Debug, Default)]
struct StdoutSink;

impl FrameSink for StdoutSink {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{frame}\n").context("failed to write frame to stdout")
    }
}

/// Entry point for the Grower command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args = CliArgs::parse();
    let mut config = match &args.config {
        Some(path) => GrowerConfig::load(path)?,
        None => GrowerConfig::default(),
    };
    apply_overrides(&mut config, &args)?;
    let validated = config.validate().context("invalid configuration")?;

    let mut session = Session::new(validated)?;
    if !args.quiet {
        println!("{}", session.banner());
        let _ = session
            .result_listeners()
            .subscribe(|result: &LevelResult| -> Result<()> {
                let mut stdout = io::stdout().lock();
                writeln!(
                    stdout,
                    "scene {} level {}: {} after {} cells in {:.2}s",
                    result.scene_index,
                    result.level_index,
                    if result.complete { "complete" } else { "incomplete" },
                    result.path_length,
                    result.elapsed.as_secs_f32(),
                )
                .context("failed to write level summary")
            });
    }
    let _ = session
        .collision_listeners()
        .subscribe(|record: &CollisionRecord| -> Result<()> {
            info!(
                head = ?record.head,
                side = ?record.side,
                force = record.force,
                "head collided"
            );
            Ok(())
        });

    let summary = if args.quiet {
        session.run(&mut grower_rendering::FrameLog::default())?
    } else {
        session.run(&mut StdoutSink)?
    };

    let completed = summary
        .results
        .iter()
        .filter(|result| result.complete)
        .count();
    info!(
        levels = summary.results.len(),
        completed,
        ticks = summary.ticks,
        collisions = summary.collisions,
        "grower finished"
    );
    if summary.end == SessionEnd::TickLimit {
        anyhow::bail!("tick budget of {} ran out", summary.ticks);
    }
    Ok(())
}

fn apply_overrides(config: &mut GrowerConfig, args: &CliArgs) -> Result<()> {
    if let Some(seed) = args.seed {
        config.generation.seed = seed;
    }
    if let Some(moves) = &args.moves {
        let _ = parse_moves(moves).context("invalid --moves")?;
        config.input.strategy = StrategyName::Scripted;
        config.input.moves = moves.clone();
    }
    if let Some(max_ticks) = args.max_ticks {
        config.session.max_ticks = max_ticks;
    }
    if args.quiet {
        config.session.render = false;
    }
    Ok(())
}
