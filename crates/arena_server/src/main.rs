//! Arena - command-line entry point.

#![warn(missing_docs)]

mod cli;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arena_server::{
    GameRepository, MODE_PROPERTY, MatchData, MatchRegistry, MatchmakerEntry, Presence,
    ServerConfig,
};
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Command};
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,arena_server=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Migrate { db_path, config } => run_migrate(&config, db_path),
        Command::Demo {
            config,
            mode,
            moves,
        } => run_demo(&config, mode, moves).await,
        Command::Leaderboard {
            db_path,
            config,
            daily,
            limit,
        } => run_leaderboard(&config, db_path, daily, limit),
    }
}

/// Loads config, applying environment and command-line overrides.
#[instrument]
fn load_config(path: &Path, db_path: Option<String>) -> Result<ServerConfig> {
    let mut config = ServerConfig::load_or_default(path)?.with_env_overrides();
    if let Some(db_path) = db_path {
        config = config.with_db_path(db_path);
    }
    Ok(config)
}

/// Opens the repository and brings the schema up to date.
#[instrument(skip(config))]
fn open_repository(config: &ServerConfig) -> Result<GameRepository> {
    let repo = GameRepository::new(config.db_path().clone())?
        .with_initial_rating(*config.initial_rating());
    repo.run_migrations()
        .with_context(|| format!("migrating {}", config.db_path()))?;
    Ok(repo)
}

fn run_migrate(config_path: &Path, db_path: Option<String>) -> Result<()> {
    let config = load_config(config_path, db_path)?;
    open_repository(&config)?;
    info!(db_path = %config.db_path(), "Database ready");
    Ok(())
}

/// Hosts one scripted match through the registry, exactly as a live host
/// loop would: pairing event, joins, queued moves, one batch per tick.
async fn run_demo(config_path: &Path, mode: String, moves: Vec<i64>) -> Result<()> {
    let config = load_config(config_path, None)?;
    let repo = open_repository(&config)?;
    let registry = MatchRegistry::new(Arc::new(repo.clone()), config.clone());

    let players = [
        Presence::new("alice".into(), "session-a".into(), "Alice".into()),
        Presence::new("bob".into(), "session-b".into(), "Bob".into()),
    ];
    let entries: Vec<MatchmakerEntry> = players
        .iter()
        .map(|p| {
            MatchmakerEntry::new(
                p.clone(),
                HashMap::from([(MODE_PROPERTY.to_string(), mode.clone())]),
            )
        })
        .collect();

    let handle = registry.on_matched(&entries, Utc::now())?;
    let mut updates = registry.subscribe(&handle)?;
    let printer = tokio::spawn(async move {
        while let Ok(msg) = updates.recv().await {
            println!("broadcast op={} {}", msg.op_code, msg.payload);
        }
    });

    for presence in players.iter().cloned() {
        let decision = registry.join(&handle, presence)?;
        info!(?decision, "Join processed");
    }
    let late = Presence::new("carol".into(), "session-c".into(), "Carol".into());
    info!(decision = ?registry.join(&handle, late)?, "Third join attempt");

    let mut script = moves.into_iter();
    let mut interval = tokio::time::interval(config.tick_interval());
    let max_ticks = config
        .turn_timeout_secs()
        .saturating_mul(u64::from(*config.tick_rate_hz()))
        .saturating_add(32);
    for _ in 0..max_ticks {
        interval.tick().await;

        let state = registry.state(&handle)?;
        if *state.settled() {
            break;
        }
        if !state.is_finished()
            && let Some(index) = script.next()
            && let Some(sender) = state.roster().holder_of(*state.turn())
        {
            registry.enqueue(&handle, MatchData::move_to(sender.clone(), index))?;
        }

        let report = registry.tick(&handle, Utc::now())?;
        if *report.timed_out() {
            warn!("Turn timed out");
        }
    }

    let state = registry.state(&handle)?;
    println!("final board {} outcome {}", state.board(), state.outcome());
    // Releasing the match closes its channel, which ends the printer.
    registry.terminate(&handle)?;
    printer.await.context("broadcast printer failed")?;

    print_alltime(&repo, 10)
}

fn run_leaderboard(
    config_path: &Path,
    db_path: Option<String>,
    daily: bool,
    limit: i64,
) -> Result<()> {
    let config = load_config(config_path, db_path)?;
    let repo = open_repository(&config)?;

    if daily {
        let today = Utc::now().date_naive();
        println!("Standings for {}", today);
        for row in repo.daily_leaderboard(today, limit)? {
            println!("  player {:>4}  rating {:>5}", row.player_id(), row.rating());
        }
        Ok(())
    } else {
        print_alltime(&repo, limit)
    }
}

fn print_alltime(repo: &GameRepository, limit: i64) -> Result<()> {
    println!("All-time standings");
    for row in repo.alltime_leaderboard(limit)? {
        println!(
            "  player {:>4}  rating {:>5}  wins {:>3}  losses {:>3}",
            row.player_id(),
            row.rating(),
            row.wins(),
            row.losses()
        );
    }
    Ok(())
}
