//! Game state machine.
//!
//! [`GameState`] is a value: every operation borrows the current state,
//! validates the request, and returns a brand new state or a [`GameError`].
//! The input is never touched, so a rejected action leaves nothing to roll
//! back. Phase changes go through [`Phase::can_transition_to`], and every
//! returned state has been checked for coin conservation.

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::board::{self, Board};
use super::constants::{
    ANTE_BASE, ANTE_GROWTH, LEAVE_PENALTY_BASE, LEAVE_PENALTY_DIVISOR, REVEALED_MOVE_LIST_LEN,
    STARTING_COINS, TOTAL_COINS,
};
use super::entities::{
    Coins, GameId, Phase, Player, PlayerId, Seat, Side, Winner, in_board_range,
};
use super::scoring::{self, Scores};

/// Broad error categories, so a transport layer can map errors to statuses
/// without matching every variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Malformed input. Retrying the same request can never succeed.
    Validation,
    /// The action does not fit the current state. Refetch and retry.
    Conflict,
    /// The bet exceeds what a player can put in or the opponent can match.
    Economic,
    /// The referenced player or game does not exist here.
    NotFound,
    /// A broken invariant. Indicates a bug, never user error.
    Internal,
}

/// Errors that can occur while applying an action
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum GameError {
    #[error("can't do that during {0}")]
    InvalidPhase(Phase),
    #[error("{0} is not playing this game")]
    NotAParticipant(PlayerId),
    #[error("{field} must be between 0 and 5, got {value}")]
    OutOfRange { field: &'static str, value: u8 },
    #[error("need {requested} coins, only have {available}")]
    InsufficientFunds { available: Coins, requested: Coins },
    #[error("bet exceeds opponent's available coins (max {max})")]
    ExceedsOpponentCoins { max: Coins, requested: Coins },
    #[error("already acted")]
    AlreadyActed,
    #[error("game already has two players")]
    AlreadyJoined,
    #[error("not behind in the pot")]
    NotBehindInPot,
    #[error("players are not synchronized")]
    NotSynchronized,
    #[error("betting is still open")]
    BettingOpen,
    #[error("round has not been settled by both players")]
    RoundNotSettled,
    #[error("reveal column {0} must be one of your chosen columns")]
    InvalidRevealColumn(u8),
    #[error("game has ended")]
    AlreadyEnded,
    #[error("invalid game state: {0}")]
    InternalStateError(String),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfRange { .. } | Self::InvalidRevealColumn(_) => ErrorKind::Validation,
            Self::InvalidPhase(_)
            | Self::AlreadyActed
            | Self::AlreadyJoined
            | Self::NotBehindInPot
            | Self::NotSynchronized
            | Self::BettingOpen
            | Self::RoundNotSettled
            | Self::AlreadyEnded => ErrorKind::Conflict,
            Self::InsufficientFunds { .. } | Self::ExceedsOpponentCoins { .. } => {
                ErrorKind::Economic
            }
            Self::NotAParticipant(_) => ErrorKind::NotFound,
            Self::InternalStateError(_) => ErrorKind::Internal,
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;

/// Ante collected from each player at the start of `round`.
pub const fn nominal_ante(round: u32) -> Coins {
    ANTE_BASE + ANTE_GROWTH * round.saturating_sub(1)
}

/// Coins forfeited by a player who leaves during `round`, before capping.
pub const fn leave_penalty(round: u32) -> Coins {
    LEAVE_PENALTY_BASE + round.saturating_sub(1) / LEAVE_PENALTY_DIVISOR
}

/// Whether both move list lengths can occur in `phase`. During a move or
/// reveal phase a player may be one step ahead of the other; betting phases
/// start with the lists level.
fn move_lists_fit(phase: Phase, (p1, p2): (usize, usize)) -> bool {
    let level = |len: usize| p1 == len && p2 == len;
    match phase {
        Phase::Waiting => level(0),
        Phase::Move1 | Phase::Move2 | Phase::Move3 | Phase::Reveal => {
            let Some(required) = phase.required_moves() else {
                return false;
            };
            let before = if phase == Phase::Reveal {
                required - 1
            } else {
                required - 2
            };
            let fits = |len: usize| len == before || len == required;
            // Both at `required` would already have moved on.
            fits(p1) && fits(p2) && !level(required)
        }
        Phase::Bet1 => level(2),
        Phase::Bet2 => level(4),
        Phase::Bet3 => level(6),
        Phase::FinalBet => level(REVEALED_MOVE_LIST_LEN),
        // Reached by settling or by folding in any betting phase.
        Phase::RoundEnd => p1 == p2 && [2, 4, 6, REVEALED_MOVE_LIST_LEN].contains(&p1),
        // A leave can interrupt a phase at any point.
        Phase::Ended => true,
    }
}

/// Board seed used when the caller does not pick one.
fn fresh_seed() -> u32 {
    rand::random()
}

/// The full state of one game.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    id: GameId,
    board: Board,
    phase: Phase,
    player1: Player,
    player2: Option<Player>,
    seat1: Seat,
    seat2: Seat,
    /// Last pot size at which both pots matched. Informational only.
    settled_pot_coins: Coins,
    round_number: u32,
    stake: Coins,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "game {} round {} {}: {}/{} vs {}/{}",
            self.id,
            self.round_number,
            self.phase,
            self.seat1.coins,
            self.seat1.pot_coins,
            self.seat2.coins,
            self.seat2.pot_coins
        )
    }
}

impl GameState {
    /// Start a new game in the waiting phase.
    pub fn create(player1: Player, stake: Coins, seed: Option<u32>) -> Self {
        let now = Utc::now();
        let state = Self {
            id: GameId::new_v4(),
            board: board::generate(seed.unwrap_or_else(fresh_seed)),
            phase: Phase::Waiting,
            player1,
            player2: None,
            seat1: Seat::new(STARTING_COINS),
            seat2: Seat::new(STARTING_COINS),
            settled_pot_coins: 0,
            round_number: 1,
            stake,
            created_at: now,
            updated_at: now,
        };
        info!("Created game {} for {}", state.id, state.player1);
        state
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn player1(&self) -> &Player {
        &self.player1
    }

    pub fn player2(&self) -> Option<&Player> {
        self.player2.as_ref()
    }

    pub fn player(&self, side: Side) -> Option<&Player> {
        match side {
            Side::Player1 => Some(&self.player1),
            Side::Player2 => self.player2.as_ref(),
        }
    }

    pub fn seat(&self, side: Side) -> &Seat {
        match side {
            Side::Player1 => &self.seat1,
            Side::Player2 => &self.seat2,
        }
    }

    fn seat_mut(&mut self, side: Side) -> &mut Seat {
        match side {
            Side::Player1 => &mut self.seat1,
            Side::Player2 => &mut self.seat2,
        }
    }

    pub fn settled_pot_coins(&self) -> Coins {
        self.settled_pot_coins
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn stake(&self) -> Coins {
        self.stake
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Coins on the ledger: both stacks plus both pots.
    pub fn total_coins(&self) -> Coins {
        self.seat1.total() + self.seat2.total()
    }

    /// Which seat `player_id` occupies.
    pub fn side_of(&self, player_id: &PlayerId) -> GameResult<Side> {
        if self.player1.id == *player_id {
            return Ok(Side::Player1);
        }
        match &self.player2 {
            Some(player2) if player2.id == *player_id => Ok(Side::Player2),
            _ => Err(GameError::NotAParticipant(player_id.clone())),
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::Ended
    }

    /// Whether either stack is empty, so no further round can be played.
    pub fn should_game_end(&self) -> bool {
        self.seat1.coins == 0 || self.seat2.coins == 0
    }

    /// Overall winner once the game has ended.
    pub fn game_winner(&self) -> Option<Winner> {
        if !self.is_game_over() {
            return None;
        }
        Some(match self.seat1.coins.cmp(&self.seat2.coins) {
            std::cmp::Ordering::Greater => Winner::Player1,
            std::cmp::Ordering::Less => Winner::Player2,
            std::cmp::Ordering::Equal => Winner::Tie,
        })
    }

    /// Scores of the current round once both players have settled it.
    pub fn round_scores(&self) -> Option<Scores> {
        let settled = self.seat1.ended_round && self.seat2.ended_round;
        let revealed = self.seat1.moves.len() == REVEALED_MOVE_LIST_LEN
            && self.seat2.moves.len() == REVEALED_MOVE_LIST_LEN;
        if !(settled && revealed) {
            return None;
        }
        scoring::compute_scores(&self.board, &self.seat1.moves, &self.seat2.moves)
    }

    /// Second player takes the empty seat; antes are collected and the first
    /// move phase begins.
    pub fn join(&self, player2: Player) -> GameResult<GameState> {
        self.ensure_not_ended()?;
        if self.player2.is_some() || player2.id == self.player1.id {
            return Err(GameError::AlreadyJoined);
        }
        if self.phase != Phase::Waiting {
            return Err(GameError::InvalidPhase(self.phase));
        }

        let mut next = self.clone();
        info!("{} joined game {}", player2, next.id);
        next.player2 = Some(player2);
        let ante = nominal_ante(next.round_number);
        next.collect_ante(ante);
        next.transition(Phase::Move1)?;
        next.finish()
    }

    /// Record a (self column, other row) pair for the current move phase.
    pub fn make_move(
        &self,
        player_id: &PlayerId,
        self_column: u8,
        other_row: u8,
    ) -> GameResult<GameState> {
        self.ensure_not_ended()?;
        let side = self.side_of(player_id)?;
        let Some(required) = self.phase.required_moves().filter(|_| self.phase.is_move()) else {
            return Err(GameError::InvalidPhase(self.phase));
        };
        if !in_board_range(self_column) {
            return Err(GameError::OutOfRange {
                field: "column",
                value: self_column,
            });
        }
        if !in_board_range(other_row) {
            return Err(GameError::OutOfRange {
                field: "row",
                value: other_row,
            });
        }
        if self.seat(side).moves.len() >= required {
            return Err(GameError::AlreadyActed);
        }

        let mut next = self.clone();
        next.seat_mut(side).moves.push_move(self_column, other_row);
        debug!(
            "Game {}: {} moved in {}",
            next.id, player_id, next.phase
        );

        if next.seat1.moves.len() == required && next.seat2.moves.len() == required {
            next.advance_into_betting()?;
        }
        next.finish()
    }

    /// Put `amount` coins into the pot during a betting phase. A zero bet is
    /// a check (or a check-behind when the opponent is ahead).
    pub fn make_bet(&self, player_id: &PlayerId, amount: Coins) -> GameResult<GameState> {
        self.ensure_not_ended()?;
        let side = self.side_of(player_id)?;
        if !self.phase.is_betting() {
            return Err(GameError::InvalidPhase(self.phase));
        }
        if self.seat1.moves.len() != self.seat2.moves.len() {
            return Err(GameError::NotSynchronized);
        }

        let me = self.seat(side);
        let opponent = self.seat(side.opponent());
        if me.bet_made && me.pot_coins >= opponent.pot_coins {
            return Err(GameError::AlreadyActed);
        }
        if amount > me.coins {
            return Err(GameError::InsufficientFunds {
                available: me.coins,
                requested: amount,
            });
        }
        // The opponent must always be able to match.
        let max = opponent.total().saturating_sub(me.pot_coins);
        if amount > max {
            return Err(GameError::ExceedsOpponentCoins {
                max,
                requested: amount,
            });
        }

        let mut next = self.clone();
        let seat = next.seat_mut(side);
        seat.commit(amount);
        seat.bet_made = true;
        debug!(
            "Game {}: {} bet {} in {}",
            next.id, player_id, amount, next.phase
        );

        if next.seat1.bet_made
            && next.seat2.bet_made
            && next.seat1.pot_coins == next.seat2.pot_coins
        {
            next.settled_pot_coins = next.seat1.pot_coins;
            let following = next.successor()?;
            next.transition(following)?;
        }
        next.finish()
    }

    /// Concede the round while behind: the opponent takes the whole pot.
    pub fn fold_bet(&self, player_id: &PlayerId) -> GameResult<GameState> {
        self.ensure_not_ended()?;
        let side = self.side_of(player_id)?;
        if !self.phase.is_betting() {
            return Err(GameError::InvalidPhase(self.phase));
        }
        if self.seat(side).pot_coins >= self.seat(side.opponent()).pot_coins {
            return Err(GameError::NotBehindInPot);
        }

        let mut next = self.clone();
        let pot = next.seat1.take_pot() + next.seat2.take_pot();
        next.seat_mut(side.opponent()).coins += pot;
        next.seat1.ended_round = true;
        next.seat2.ended_round = true;
        next.transition(Phase::RoundEnd)?;
        info!(
            "Game {}: {} folded, {} coins to {}",
            next.id,
            player_id,
            pot,
            side.opponent()
        );
        next.finish()
    }

    /// Commit to one of the three chosen columns.
    pub fn make_reveal_move(&self, player_id: &PlayerId, column: u8) -> GameResult<GameState> {
        self.ensure_not_ended()?;
        let side = self.side_of(player_id)?;
        if self.phase != Phase::Reveal {
            return Err(GameError::InvalidPhase(self.phase));
        }
        let moves = &self.seat(side).moves;
        if moves.len() >= REVEALED_MOVE_LIST_LEN {
            return Err(GameError::AlreadyActed);
        }
        if !in_board_range(column) {
            return Err(GameError::OutOfRange {
                field: "column",
                value: column,
            });
        }
        if !moves.chosen_columns().any(|chosen| chosen == column) {
            return Err(GameError::InvalidRevealColumn(column));
        }

        let mut next = self.clone();
        next.seat_mut(side).moves.push_reveal(column);
        debug!("Game {}: {} revealed", next.id, player_id);

        if next.seat1.moves.len() == REVEALED_MOVE_LIST_LEN
            && next.seat2.moves.len() == REVEALED_MOVE_LIST_LEN
        {
            next.advance_into_betting()?;
        }
        next.finish()
    }

    /// Signal readiness to settle. The second signal scores the round and
    /// pays out the pot.
    pub fn end_round(&self, player_id: &PlayerId) -> GameResult<GameState> {
        self.ensure_not_ended()?;
        let side = self.side_of(player_id)?;
        if !matches!(self.phase, Phase::FinalBet | Phase::RoundEnd) {
            return Err(GameError::InvalidPhase(self.phase));
        }
        if self.seat1.moves.len() != REVEALED_MOVE_LIST_LEN
            || self.seat2.moves.len() != REVEALED_MOVE_LIST_LEN
        {
            return Err(GameError::NotSynchronized);
        }
        if self.seat1.pot_coins != self.seat2.pot_coins
            || !self.seat1.bet_made
            || !self.seat2.bet_made
        {
            return Err(GameError::BettingOpen);
        }
        if self.seat(side).ended_round {
            return Err(GameError::AlreadyActed);
        }

        let mut next = self.clone();
        next.seat_mut(side).ended_round = true;
        if next.seat1.ended_round && next.seat2.ended_round {
            next.settle_round()?;
        }
        next.finish()
    }

    /// Begin the next round, or end the game if a stack is empty.
    pub fn start_next_round(&self, seed: Option<u32>) -> GameResult<GameState> {
        self.ensure_not_ended()?;
        if self.phase != Phase::RoundEnd {
            return Err(GameError::InvalidPhase(self.phase));
        }
        if !(self.seat1.ended_round && self.seat2.ended_round) {
            return Err(GameError::RoundNotSettled);
        }

        let mut next = self.clone();
        if next.should_game_end() {
            next.transition(Phase::Ended)?;
            info!(
                "Game {} over after round {}: {:?}",
                next.id,
                next.round_number,
                next.game_winner()
            );
            return next.finish();
        }

        next.board = board::generate(seed.unwrap_or_else(fresh_seed));
        next.round_number += 1;
        for seat in [&mut next.seat1, &mut next.seat2] {
            seat.moves.clear();
            seat.ended_round = false;
        }
        let ante = nominal_ante(next.round_number)
            .min(next.seat1.coins)
            .min(next.seat2.coins);
        next.collect_ante(ante);
        next.transition(Phase::Move1)?;
        debug!(
            "Game {}: round {} started, ante {}",
            next.id, next.round_number, ante
        );
        next.finish()
    }

    /// Quit the game. Outside the waiting room the leaver forfeits the pot
    /// plus a penalty to the remaining player.
    pub fn leave_game(&self, player_id: &PlayerId) -> GameResult<GameState> {
        self.ensure_not_ended()?;
        let side = self.side_of(player_id)?;

        let mut next = self.clone();
        if next.phase != Phase::Waiting {
            let penalty = leave_penalty(next.round_number).min(next.seat(side).coins);
            let pot = next.seat1.take_pot() + next.seat2.take_pot();
            next.seat_mut(side).coins -= penalty;
            next.seat_mut(side.opponent()).coins += pot + penalty;
            info!(
                "Game {}: {} left, forfeiting pot {} and penalty {}",
                next.id, player_id, pot, penalty
            );
        } else {
            info!("Game {}: {} left before anyone joined", next.id, player_id);
        }
        next.transition(Phase::Ended)?;
        next.finish()
    }

    fn ensure_not_ended(&self) -> GameResult<()> {
        if self.phase == Phase::Ended {
            return Err(GameError::AlreadyEnded);
        }
        Ok(())
    }

    fn successor(&self) -> GameResult<Phase> {
        self.phase
            .successor()
            .ok_or_else(|| GameError::InternalStateError(format!("{} has no successor", self.phase)))
    }

    fn transition(&mut self, next: Phase) -> GameResult<()> {
        if !self.phase.can_transition_to(next) {
            error!(
                "Game {}: illegal transition {} -> {}",
                self.id, self.phase, next
            );
            return Err(GameError::InternalStateError(format!(
                "illegal transition {} -> {next}",
                self.phase
            )));
        }
        debug!("Game {}: {} -> {}", self.id, self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Leave a move or reveal phase for its betting phase. Both players
    /// start the new betting phase without having acted.
    fn advance_into_betting(&mut self) -> GameResult<()> {
        let following = self.successor()?;
        self.transition(following)?;
        self.seat1.bet_made = false;
        self.seat2.bet_made = false;
        Ok(())
    }

    fn collect_ante(&mut self, ante: Coins) {
        for seat in [&mut self.seat1, &mut self.seat2] {
            seat.commit(ante);
            seat.bet_made = true;
        }
        self.settled_pot_coins = ante;
    }

    fn settle_round(&mut self) -> GameResult<()> {
        let winner = scoring::determine_winner(&self.board, &self.seat1.moves, &self.seat2.moves)
            .ok_or_else(|| GameError::InternalStateError("round cannot be scored".to_string()))?;

        match winner {
            Winner::Player1 | Winner::Player2 => {
                let pot = self.seat1.take_pot() + self.seat2.take_pot();
                let side = if winner == Winner::Player1 {
                    Side::Player1
                } else {
                    Side::Player2
                };
                self.seat_mut(side).coins += pot;
                info!(
                    "Game {}: round {} won by {} for {} coins",
                    self.id, self.round_number, winner, pot
                );
            }
            // Each player gets their own pot back; nothing is split.
            Winner::Tie => {
                for seat in [&mut self.seat1, &mut self.seat2] {
                    let pot = seat.take_pot();
                    seat.coins += pot;
                }
                info!("Game {}: round {} tied", self.id, self.round_number);
            }
        }

        if self.phase != Phase::RoundEnd {
            self.transition(Phase::RoundEnd)?;
        }
        Ok(())
    }

    /// Check the invariants every reachable state satisfies. Storage adapters
    /// call this on every state they load.
    pub fn check_invariants(&self) -> GameResult<()> {
        let total = self.total_coins();
        if total != TOTAL_COINS {
            return Err(GameError::InternalStateError(format!(
                "coin total {total} != {TOTAL_COINS}"
            )));
        }
        if !self.phase.is_betting() && self.seat1.pot_coins != self.seat2.pot_coins {
            return Err(GameError::InternalStateError(format!(
                "unequal pots {}/{} outside betting in {}",
                self.seat1.pot_coins, self.seat2.pot_coins, self.phase
            )));
        }
        if self.seat1.moves.len() > REVEALED_MOVE_LIST_LEN
            || self.seat2.moves.len() > REVEALED_MOVE_LIST_LEN
        {
            return Err(GameError::InternalStateError(
                "move list overflow".to_string(),
            ));
        }
        let lens = (self.seat1.moves.len(), self.seat2.moves.len());
        if !move_lists_fit(self.phase, lens) {
            return Err(GameError::InternalStateError(format!(
                "move lists {}/{} do not fit {}",
                lens.0, lens.1, self.phase
            )));
        }
        if self.player2.is_none() && !matches!(self.phase, Phase::Waiting | Phase::Ended) {
            return Err(GameError::InternalStateError(format!(
                "no second player in {}",
                self.phase
            )));
        }
        if !board::is_valid(&self.board) {
            return Err(GameError::InternalStateError(
                "board is not a magic square".to_string(),
            ));
        }
        Ok(())
    }

    /// Stamp the new state once it passes [`Self::check_invariants`]. A
    /// violation here is a bug in this module, so the state is discarded.
    fn finish(mut self) -> GameResult<GameState> {
        if let Err(err) = self.check_invariants() {
            error!("Game {}: {} ({})", self.id, err, self);
            return Err(err);
        }
        self.updated_at = Utc::now();
        Ok(self)
    }
}
