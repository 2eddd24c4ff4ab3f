//! Structured logging configuration.
//!
//! Library crates log through the `log` facade; those records are forwarded
//! into the same `tracing` subscriber as the simulator's own events.

use magic_duel::{GameId, game::Winner};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// logging::init();
/// tracing::info!("Simulation starting");
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,magic_duel::game::board=info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log the result of one finished game with structured data
///
/// # Arguments
///
/// * `game_id` - Game ID
/// * `rounds` - Rounds played
/// * `winner` - Overall result, if the game ended
/// * `coins` - Final stacks of player 1 and player 2
pub fn log_game_outcome(game_id: GameId, rounds: u32, winner: Option<Winner>, coins: (u32, u32)) {
    match winner {
        Some(winner) => tracing::info!(
            game_id = %game_id,
            rounds = rounds,
            winner = %winner,
            player1_coins = coins.0,
            player2_coins = coins.1,
            "Game finished"
        ),
        None => tracing::warn!(
            game_id = %game_id,
            rounds = rounds,
            player1_coins = coins.0,
            player2_coins = coins.1,
            "Game stopped before it ended"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_game_outcome() {
        // Just ensure it doesn't panic without a subscriber
        log_game_outcome(GameId::new_v4(), 3, Some(Winner::Player1), (150, 50));
        log_game_outcome(GameId::new_v4(), 50, None, (100, 100));
    }
}
