//! Engine Arena - runs head-to-head tournaments between two UCI engines.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arena::config::{ArenaConfig, EngineConfig};
use arena::engine::{Engine, UciEngineFactory};
use arena::events::{ControlCommand, TournamentEvent};
use arena::report::{render_report, write_results_csv, write_stats_json};
use arena::rules::Game;
use arena::stats::analyze;
use arena::storage::{load_results, ResultStore};
use arena::uci_client::UciEngine;
use arena::{Tournament, TournamentSettings};
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::EnvFilter;

/// Engine Arena - head-to-head tournaments between UCI chess engines.
#[derive(Parser)]
#[command(name = "arena")]
#[command(about = "Head-to-head tournaments between UCI chess engines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured tournament, resuming from the results snapshot
    Run(RunArgs),
    /// Print statistics for a results snapshot
    Report(ReportArgs),
    /// Start an engine, complete the handshake and ask it for one move
    Check {
        /// Engine name from the config file
        engine: String,
        /// Path to the config file
        #[arg(short, long, default_value_os_t = ArenaConfig::config_path())]
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the config file
    #[arg(short, long, default_value_os_t = ArenaConfig::config_path())]
    config: PathBuf,
    /// Preset from the config file
    #[arg(short, long)]
    preset: Option<String>,
    /// Number of games, overrides config and preset
    #[arg(short, long)]
    games: Option<u32>,
    /// Matches played at the same time
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,
    /// Start every game from the initial position
    #[arg(long)]
    no_openings: bool,
    /// Discard the existing results snapshot
    #[arg(long)]
    fresh: bool,
    /// Seed for the opening assignment
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Path to the config file
    #[arg(short, long, default_value_os_t = ArenaConfig::config_path())]
    config: PathBuf,
    /// Results snapshot, defaults to the configured results file
    #[arg(short, long)]
    results: Option<PathBuf>,
    /// Also write the statistics as JSON
    #[arg(long)]
    json: Option<PathBuf>,
    /// Also write one CSV row per match
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Participant A, defaults to the configured engine_a
    #[arg(long)]
    engine_a: Option<String>,
    /// Participant B, defaults to the configured engine_b
    #[arg(long)]
    engine_b: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Report(args) => report(args),
        Commands::Check { engine, config } => check(&engine, &config).await,
    }
}

/// An engine from `[engines.<name>]`, or `name` used as the executable path.
fn resolve_engine(config: &ArenaConfig, name: &str) -> EngineConfig {
    config.get_engine(name).unwrap_or_else(|_| {
        tracing::warn!("Engine {} is not configured, using it as a command", name);
        EngineConfig::new(name, name)
    })
}

fn build_settings(config: &ArenaConfig, args: &RunArgs) -> anyhow::Result<TournamentSettings> {
    let tournament = config.tournament_with_preset(args.preset.as_deref())?;
    let a = resolve_engine(config, &tournament.engine_a);
    let b = resolve_engine(config, &tournament.engine_b);

    let mut settings = TournamentSettings::from_config(&tournament, a, b);
    if let Some(games) = args.games {
        settings.games = games;
    }
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency;
    }
    if args.no_openings {
        settings.use_opening_book = false;
    }
    settings.seed = args.seed;
    settings.validate()?;
    Ok(settings)
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = ArenaConfig::load_from(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let settings = build_settings(&config, &args)?;

    if args.fresh {
        ResultStore::new(&settings.results_file, &settings.output_dir).reset()?;
        tracing::info!("Discarded previous results");
    }

    let stats_path = settings.output_dir.join("stats.json");
    let tournament = Tournament::new(settings, Arc::new(UciEngineFactory))?;

    let logger = tokio::spawn(log_events(tournament.subscribe(), tournament.settings().games));
    tokio::spawn(handle_signals(tournament.clone()));
    std::thread::spawn({
        let tournament = tournament.clone();
        move || read_console(tournament)
    });
    tracing::info!("Console commands: pause, resume, stop, stats");

    let results = tournament.run().await?;
    let _ = logger.await;

    let stats = tournament.live_stats();
    println!("\n{}", render_report(&stats));
    if let Err(e) = write_stats_json(&stats_path, &stats) {
        tracing::error!("Failed to write {}: {}", stats_path.display(), e);
    }
    tracing::info!(
        "{} results in {}",
        results.len(),
        tournament.store().results_file().display()
    );
    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<TournamentEvent>, total: u32) {
    loop {
        match events.recv().await {
            Ok(TournamentEvent::MatchEnded { match_id, stats, .. }) => {
                tracing::info!(
                    "[{}/{}] after match {}: {} +{} ={} -{} {}, Elo {:+.1} ± {:.1}",
                    stats.completed_matches,
                    total,
                    match_id,
                    stats.participant_a,
                    stats.a_wins,
                    stats.draws,
                    stats.b_wins,
                    stats.participant_b,
                    stats.elo_difference,
                    stats.elo_margin
                );
            }
            Ok(TournamentEvent::Finished { .. }) | Err(RecvError::Closed) => break,
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Event log skipped {} events", skipped);
            }
        }
    }
}

async fn handle_signals(tournament: Tournament) {
    if signal::ctrl_c().await.is_err() {
        return;
    }
    tracing::warn!("Interrupted, finishing running matches (press Ctrl+C again to abort)");
    tournament.stop();

    if signal::ctrl_c().await.is_ok() {
        tracing::warn!("Aborting");
        std::process::exit(130);
    }
}

fn read_console(tournament: Tournament) {
    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<ControlCommand>() {
            Ok(ControlCommand::Pause) => tournament.pause(),
            Ok(ControlCommand::Resume) => tournament.resume(),
            Ok(ControlCommand::Stop) => tournament.stop(),
            Ok(ControlCommand::GetStats) => println!("{}", render_report(&tournament.live_stats())),
            Err(e) => tracing::warn!("{}", e),
        }
    }
}

fn report(args: ReportArgs) -> anyhow::Result<()> {
    let config = ArenaConfig::load_from(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let results_path = args
        .results
        .unwrap_or_else(|| config.tournament.results_file.clone());
    let results = load_results(&results_path)
        .with_context(|| format!("Failed to load {}", results_path.display()))?;

    let a = args.engine_a.unwrap_or_else(|| config.tournament.engine_a.clone());
    let b = args.engine_b.unwrap_or_else(|| config.tournament.engine_b.clone());
    let stats = analyze(&results, &a, &b);
    println!("{}", render_report(&stats));

    if let Some(path) = args.json {
        write_stats_json(&path, &stats)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Statistics written to {}", path.display());
    }
    if let Some(path) = args.csv {
        write_results_csv(&path, &results)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Results written to {}", path.display());
    }
    Ok(())
}

async fn check(name: &str, config_path: &Path) -> anyhow::Result<()> {
    let config = ArenaConfig::load_from(config_path)?;
    let mut engine = UciEngine::new(config.get_engine(name)?);

    engine.start().await?;
    println!(
        "{}: handshake ok, id name {}",
        name,
        engine.id_name().unwrap_or("(none)")
    );
    let reply = engine.play(&Game::new(), Duration::from_secs(1)).await;
    engine.quit().await;

    match reply? {
        Some(mv) => println!("{}: best move from the initial position is {}", name, mv),
        None => println!("{}: no move from the initial position", name),
    }
    Ok(())
}
