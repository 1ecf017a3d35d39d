//! Chess Tactics - pin and skewer report for PGN files.
//!
//! Replays the first games of a PGN file, compares every move against a UCI
//! engine's best move and prints the executed, missed and allowed tactics
//! as JSON on stdout.

mod config;

use std::path::PathBuf;

use anyhow::Context;
use chess_tactics::analyze_pgn;
use clap::Parser;
use config::{TacticsConfig, ENGINE_PATH_ENV};
use tracing_subscriber::EnvFilter;

/// Chess Tactics - Reports pins and skewers executed, missed and allowed.
#[derive(Parser)]
#[command(name = "chess-tactics")]
#[command(about = "Reports pins and skewers executed, missed and allowed in PGN games")]
struct Args {
    /// PGN file to analyze
    pgn: PathBuf,

    /// Config file (defaults to tactics.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the UCI engine
    #[arg(long)]
    engine: Option<String>,

    /// Search depth for the engine's best move
    #[arg(long)]
    depth: Option<u32>,

    /// Number of games to analyze
    #[arg(long)]
    max_games: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

impl Args {
    /// Layers file, environment and flags into one configuration.
    fn resolve_config(&self) -> anyhow::Result<TacticsConfig> {
        let mut config = TacticsConfig::load(self.config.as_deref())
            .context("Failed to load configuration")?
            .with_engine_override(std::env::var(ENGINE_PATH_ENV).ok());

        if let Some(engine) = &self.engine {
            config.engine_path = engine.clone();
        }
        if let Some(depth) = self.depth {
            config.depth = depth;
        }
        if let Some(max_games) = self.max_games {
            config.max_games = max_games;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let config = args.resolve_config()?;

    tracing::info!("PGN file: {:?}", args.pgn);
    tracing::info!("Engine: {}", config.engine_path);
    tracing::info!("Depth: {}, max games: {}", config.depth, config.max_games);

    let results = analyze_pgn(&args.pgn, &config.engine_path, config.analysis_config())
        .with_context(|| format!("Failed to analyze {}", args.pgn.display()))?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{}", json);

    tracing::info!("Analyzed {} games", results.len());
    Ok(())
}
