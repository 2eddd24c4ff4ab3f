//! Bot players.
//!
//! Bots only ever see a [`PlayerView`], the same projection a human client
//! would get, so they cannot peek at unmatched opponent moves.

use magic_duel::{
    Coins, PlayerView,
    constants::{BOARD_SIZE, MOVES_PER_ROUND},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// What a bot does when it is its turn to bet
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BetDecision {
    /// Put this many coins in. Zero checks.
    Bet(Coins),
    /// Give up the round. Only legal while behind.
    Fold,
}

/// Coins needed to match the opponent's pot.
pub fn to_call(view: &PlayerView) -> Coins {
    view.opponent.pot_coins.saturating_sub(view.me.pot_coins)
}

/// Largest bet the rules allow right now.
pub fn max_bet(view: &PlayerView) -> Coins {
    let opponent_total = view.opponent.coins + view.opponent.pot_coins;
    opponent_total
        .saturating_sub(view.me.pot_coins)
        .min(view.me.coins)
}

pub trait Bot: Send {
    fn name(&self) -> &str;

    /// (own column, row assigned to the opponent) for the current move phase
    fn choose_move(&mut self, view: &PlayerView) -> (u8, u8);

    fn choose_bet(&mut self, view: &PlayerView) -> BetDecision;

    /// One of the columns chosen earlier this round
    fn choose_reveal(&mut self, view: &PlayerView) -> u8;
}

/// Plays uniformly random moves and bets loosely.
pub struct RandomBot {
    name: String,
    rng: StdRng,
}

impl RandomBot {
    pub fn new(name: &str, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Bot for RandomBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&mut self, _view: &PlayerView) -> (u8, u8) {
        let size = BOARD_SIZE as u8;
        (self.rng.random_range(0..size), self.rng.random_range(0..size))
    }

    fn choose_bet(&mut self, view: &PlayerView) -> BetDecision {
        let call = to_call(view);
        let max = max_bet(view);

        if call > 0 && self.rng.random_bool(0.1) {
            return BetDecision::Fold;
        }
        if max > call && self.rng.random_bool(0.3) {
            let raise_cap = max.min(call + 10);
            return BetDecision::Bet(self.rng.random_range(call + 1..=raise_cap));
        }
        BetDecision::Bet(call)
    }

    fn choose_reveal(&mut self, view: &PlayerView) -> u8 {
        let columns: Vec<u8> = view.me.moves.chosen_columns().collect();
        if columns.is_empty() {
            return 0;
        }
        columns[self.rng.random_range(0..columns.len())]
    }
}

/// Never raises and never folds. Plays a fixed spread of columns and rows.
pub struct CautiousBot {
    name: String,
}

impl CautiousBot {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Bot for CautiousBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&mut self, view: &PlayerView) -> (u8, u8) {
        // Cycle through distinct columns and rows each round.
        let step = (view.me.moves.len() / 2) % MOVES_PER_ROUND;
        let column = (step * 2) as u8;
        let row = (BOARD_SIZE - 1 - step) as u8;
        (column, row)
    }

    fn choose_bet(&mut self, view: &PlayerView) -> BetDecision {
        BetDecision::Bet(to_call(view))
    }

    fn choose_reveal(&mut self, view: &PlayerView) -> u8 {
        view.me.moves.chosen_columns().next().unwrap_or(0)
    }
}
