//! Session module serializing concurrent access to games.
//!
//! This module implements:
//! - GameActor: Async actor owning all writes to a single game
//! - GameCoordinator: Routes requests to actors, spawning them on demand
//! - Message-based communication with tokio channels
//! - State change notifications sent after each successful persist
//!
//! ## Architecture
//!
//! Each active game runs in a separate Tokio task with an mpsc message inbox.
//! An actor handles one message at a time: load the game from the
//! repository, apply the action, persist the result, then notify
//! subscribers. Different games proceed in parallel.
//!
//! ## Example
//!
//! ```no_run
//! use magic_duel::db::InMemoryGameRepository;
//! use magic_duel::game::{Player, PlayerId};
//! use magic_duel::session::{CoordinatorConfig, GameCoordinator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repository = Arc::new(InMemoryGameRepository::new());
//!     let coordinator = GameCoordinator::new(repository, CoordinatorConfig::default());
//!
//!     let game = coordinator
//!         .create_game(Player::new("alice", "Alice"), 10, None)
//!         .await?;
//!     coordinator.join(game.id(), Player::new("bob", "Bob")).await?;
//!     coordinator
//!         .make_move(game.id(), &PlayerId::new("alice"), 2, 3)
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;

pub use actor::{GameActor, GameHandle};
pub use config::CoordinatorConfig;
pub use errors::{SessionError, SessionResult};
pub use manager::GameCoordinator;
pub use messages::{GameMessage, StateChangeNotification};
