//! Magic-square duel engine.
//!
//! This module provides the pure game logic:
//! - Board generation from a seed
//! - Round scoring with mirrored coordinates for player 2
//! - An immutable state machine covering moves, betting, reveal and settlement
//! - Per-player views that hide unmatched opponent moves

pub mod actions;
pub mod board;
pub mod constants;
pub mod entities;
pub mod scoring;
pub mod state_machine;
pub mod view;

pub use actions::{Apply, GameAction};
pub use board::Board;
pub use entities::{Coins, GameId, MoveList, Phase, Player, PlayerId, Seat, Side, Winner};
pub use scoring::Scores;
pub use state_machine::{ErrorKind, GameError, GameResult, GameState};
pub use view::{PlayerView, SeatView};
