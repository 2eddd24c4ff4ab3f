//! Game-wide constants.

use super::entities::Coins;

/// Board side length.
pub const BOARD_SIZE: usize = 6;

/// Number of cells on a board.
pub const BOARD_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

/// Sum every row, column, and main diagonal must reach:
/// `n * (n^2 + 1) / 2` for `n = 6`.
pub const MAGIC_SUM: u32 = (BOARD_SIZE * (BOARD_CELLS + 1) / 2) as u32;

/// Each player's chip stack when a game is created.
pub const STARTING_COINS: Coins = 100;

/// Coins in play across both seats for the lifetime of a game.
pub const TOTAL_COINS: Coins = 2 * STARTING_COINS;

/// Move phases per round. Each contributes a (self column, other row) pair.
pub const MOVES_PER_ROUND: usize = 3;

/// MoveList length once a player has revealed.
pub const REVEALED_MOVE_LIST_LEN: usize = 2 * MOVES_PER_ROUND + 1;

/// Ante is `ANTE_BASE + floor(ANTE_GROWTH * (round - 1))`.
pub const ANTE_BASE: Coins = 1;
pub const ANTE_GROWTH: Coins = 1;

/// Leave penalty is `LEAVE_PENALTY_BASE + floor((round - 1) / LEAVE_PENALTY_DIVISOR)`.
pub const LEAVE_PENALTY_BASE: Coins = 6;
pub const LEAVE_PENALTY_DIVISOR: Coins = 2;

/// Maximum length of a display name, in characters.
pub const MAX_NAME_LENGTH: usize = 32;
