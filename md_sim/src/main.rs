//! Headless bot-vs-bot simulator.
//!
//! Plays a batch of games through the game coordinator, one task per seat,
//! and prints a JSON report of the results.

mod bots;
mod config;
mod logging;
mod runner;

use std::{collections::BTreeMap, sync::Arc};

use anyhow::Context;
use ctrlc::set_handler;
use magic_duel::{
    GameCoordinator,
    db::{Database, GameRepository, InMemoryGameRepository},
    game::Winner,
};
use pico_args::Arguments;
use serde::Serialize;
use tokio::{sync::watch, task::JoinSet};

use bots::{Bot, CautiousBot, RandomBot};
use config::SimConfig;
use runner::{GameSummary, TableRules};

const HELP: &str = "\
Play magic duel games between bots

USAGE:
  md_sim [OPTIONS]

OPTIONS:
  --games       N        Number of games to play       [default: env MD_SIM_GAMES or 10]
  --seed        N        Seed for boards and bots      [default: env MD_SIM_SEED or random]
  --stake       N        Stake recorded on each game   [default: env MD_SIM_STAKE or 10]
  --max-rounds  N        Rounds before player 1 leaves [default: env MD_SIM_MAX_ROUNDS or 50]
  --db-url      URL      Store games in PostgreSQL     [default: env DATABASE_URL, else in memory]

FLAGS:
  -h, --help             Print help information

ENVIRONMENT:
  RUST_LOG               Log filter (e.g. md_sim=debug,magic_duel=debug)
  MD_INBOX_CAPACITY      Per-game actor inbox size
  MD_NOTIFICATION_CAPACITY
                         Per-subscriber notification buffer
  MD_STORAGE_TIMEOUT_MS  Deadline for each storage call
";

/// Everything printed at the end of a run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    games: Vec<GameSummary>,
    /// Games won per bot name
    wins: BTreeMap<String, usize>,
    ties: usize,
    interrupted: usize,
}

impl Report {
    fn new(mut games: Vec<GameSummary>) -> Self {
        games.sort_by_key(|game| game.game_id);
        let mut wins = BTreeMap::new();
        let (mut ties, mut interrupted) = (0, 0);
        for game in &games {
            match game.winner {
                Some(Winner::Player1) => *wins.entry(game.player1.clone()).or_default() += 1,
                Some(Winner::Player2) => *wins.entry(game.player2.clone()).or_default() += 1,
                Some(Winner::Tie) => ties += 1,
                None => interrupted += 1,
            }
        }
        Self {
            games,
            wins,
            ties,
            interrupted,
        }
    }
}

/// Seat a random bot against an alternating opponent.
fn lineup(index: usize, seed: u64) -> (Box<dyn Bot>, Box<dyn Bot>) {
    let first: Box<dyn Bot> = Box::new(RandomBot::new("random", seed.wrapping_mul(2)));
    let second: Box<dyn Bot> = if index % 2 == 0 {
        Box::new(CautiousBot::new("cautious"))
    } else {
        Box::new(RandomBot::new("random-b", seed.wrapping_mul(2) + 1))
    };
    (first, second)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let config = SimConfig::from_args(&mut pargs)?;
    logging::init();

    // First Ctrl-C lets running games stop at their next turn.
    let (stop_tx, stop_rx) = watch::channel(false);
    set_handler(move || {
        let _ = stop_tx.send(true);
    })?;

    let mut database = None;
    let repository: Arc<dyn GameRepository> = match &config.database {
        Some(db_config) => {
            tracing::info!(url = %db_config.database_url, "Connecting to database");
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to create games table")?;
            let stored = db.count_games().await?;
            tracing::info!(stored, "Database ready");
            let games = Arc::new(db.games());
            database = Some(db);
            games
        }
        None => {
            tracing::info!("Keeping games in memory");
            Arc::new(InMemoryGameRepository::new())
        }
    };

    let coordinator = Arc::new(GameCoordinator::new(repository, config.coordinator.clone()));
    let restored = coordinator.load_active_games().await?;
    if restored > 0 {
        tracing::warn!(restored, "Found unfinished games from an earlier run; leaving them alone");
    }

    let base_seed = config.seed.unwrap_or_else(rand::random);
    tracing::info!(games = config.games, seed = base_seed, "Simulation starting");

    let mut tasks = JoinSet::new();
    for index in 0..config.games {
        let game_seed = base_seed.wrapping_add(index as u64);
        let rules = TableRules {
            max_rounds: config.max_rounds,
            board_seed: Some(game_seed as u32),
        };
        tasks.spawn(runner::play_game(
            coordinator.clone(),
            config.stake,
            rules,
            lineup(index, game_seed),
            stop_rx.clone(),
        ));
    }

    let mut summaries = Vec::with_capacity(config.games);
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok(summary) => {
                logging::log_game_outcome(
                    summary.game_id,
                    summary.rounds,
                    summary.winner,
                    (summary.player1_coins, summary.player2_coins),
                );
                summaries.push(summary);
            }
            Err(err) => tracing::error!(error = %err, "Game failed"),
        }
    }

    let report = Report::new(summaries);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(db) = database {
        db.close().await;
    }
    Ok(())
}
