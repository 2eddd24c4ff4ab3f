//! # Magic Duel
//!
//! A two-player betting game played over a 6×6 magic square, where every
//! row, column and both diagonals sum to 111.
//!
//! Each round, both players choose three columns for themselves and assign
//! three rows to their opponent, betting between moves. After a reveal and a
//! final betting phase the round is scored and the pot paid out. The game
//! runs until one player has no coins left or someone leaves.
//!
//! ## Architecture
//!
//! The game is a state machine over eleven phases:
//!
//! - **waiting**: Creator waiting for an opponent
//! - **move1/move2/move3**: Each player submits a (column, row) pair
//! - **bet1/bet2/bet3**: Betting after each move pair
//! - **reveal**: Each player commits to one of their chosen columns
//! - **finalBet**: Last betting phase
//! - **roundEnd**: Round settled, waiting to start the next
//! - **ended**: Game over
//!
//! Every operation takes the current state by reference and returns a new
//! one, so a rejected action never leaves a half-applied state behind.
//!
//! ## Core Modules
//!
//! - [`game`]: Board generation, scoring, state machine and player views
//! - [`db`]: Game storage (in-memory and PostgreSQL)
//! - [`session`]: Per-game actors serializing concurrent writes
//!
//! ## Example
//!
//! ```
//! use magic_duel::{GameState, Phase, Player, PlayerId};
//!
//! let game = GameState::create(Player::new("alice", "Alice"), 10, Some(12345));
//! let game = game.join(Player::new("bob", "Bob")).unwrap();
//! assert_eq!(game.phase(), Phase::Move1);
//!
//! let game = game.make_move(&PlayerId::new("alice"), 0, 0).unwrap();
//! let game = game.make_move(&PlayerId::new("bob"), 5, 5).unwrap();
//! assert_eq!(game.phase(), Phase::Bet1);
//! ```

/// Game storage.
pub mod db;

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    GameAction, GameError, GameState, Phase, Player, PlayerId, PlayerView,
    constants::{self, STARTING_COINS, TOTAL_COINS},
    entities::{self, Coins, GameId},
};

/// Concurrent access to games.
pub mod session;
pub use session::{GameCoordinator, SessionError};
