use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

use super::constants::{self, BOARD_SIZE, MOVES_PER_ROUND, REVEALED_MOVE_LIST_LEN, STARTING_COINS};

/// Type alias for whole coins. Stacks and pots are never negative, so an
/// unsigned type keeps that invariant in the type system.
pub type Coins = u32;

/// Unique identifier for a game.
pub type GameId = uuid::Uuid;

/// Opaque identifier of a participant, supplied by the identity layer.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: &str) -> Self {
        Self(s.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Address used by the escrow layer to settle on chain, if any.
    pub chain_address: Option<String>,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: &str) -> Self {
        let mut name: String = name
            .trim()
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        if let Some((idx, _)) = name.char_indices().nth(constants::MAX_NAME_LENGTH) {
            name.truncate(idx);
        }
        Self {
            id: id.into(),
            name,
            chain_address: None,
        }
    }

    #[must_use]
    pub fn with_chain_address(mut self, address: &str) -> Self {
        self.chain_address = Some(address.to_string());
        self
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Game phases in lifecycle order.
///
/// ```text
/// waiting -> move1 -> bet1 -> move2 -> bet2 -> move3 -> bet3
///         -> reveal -> finalBet -> roundEnd -> (move1 | ended)
/// ```
///
/// Any non-ended phase may also jump to `ended` (a player leaves), and any
/// betting phase may jump to `roundEnd` (a player folds).
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Waiting,
    Move1,
    Bet1,
    Move2,
    Bet2,
    Move3,
    Bet3,
    Reveal,
    FinalBet,
    RoundEnd,
    Ended,
}

impl Phase {
    pub const ALL: [Phase; 11] = [
        Self::Waiting,
        Self::Move1,
        Self::Bet1,
        Self::Move2,
        Self::Bet2,
        Self::Move3,
        Self::Bet3,
        Self::Reveal,
        Self::FinalBet,
        Self::RoundEnd,
        Self::Ended,
    ];

    pub const fn is_move(self) -> bool {
        matches!(self, Self::Move1 | Self::Move2 | Self::Move3)
    }

    pub const fn is_betting(self) -> bool {
        matches!(self, Self::Bet1 | Self::Bet2 | Self::Bet3 | Self::FinalBet)
    }

    /// 1-based index of a move phase.
    pub const fn move_number(self) -> Option<usize> {
        match self {
            Self::Move1 => Some(1),
            Self::Move2 => Some(2),
            Self::Move3 => Some(3),
            _ => None,
        }
    }

    /// MoveList length both players must reach before this phase is over.
    pub const fn required_moves(self) -> Option<usize> {
        match self {
            Self::Move1 | Self::Move2 | Self::Move3 => match self.move_number() {
                Some(n) => Some(2 * n),
                None => None,
            },
            Self::Reveal => Some(REVEALED_MOVE_LIST_LEN),
            _ => None,
        }
    }

    /// The phase that follows when the current one completes normally.
    pub const fn successor(self) -> Option<Phase> {
        match self {
            Self::Waiting => Some(Self::Move1),
            Self::Move1 => Some(Self::Bet1),
            Self::Bet1 => Some(Self::Move2),
            Self::Move2 => Some(Self::Bet2),
            Self::Bet2 => Some(Self::Move3),
            Self::Move3 => Some(Self::Bet3),
            Self::Bet3 => Some(Self::Reveal),
            Self::Reveal => Some(Self::FinalBet),
            Self::FinalBet => Some(Self::RoundEnd),
            Self::RoundEnd => Some(Self::Move1),
            Self::Ended => None,
        }
    }

    /// Legal transition table. Staying in the same phase is not a transition.
    pub fn can_transition_to(self, next: Phase) -> bool {
        if self == Self::Ended {
            return false;
        }
        if next == Self::Ended {
            return true;
        }
        if self.is_betting() && next == Self::RoundEnd {
            return true;
        }
        self.successor() == Some(next)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Move1 => "move1",
            Self::Bet1 => "bet1",
            Self::Move2 => "move2",
            Self::Bet2 => "bet2",
            Self::Move3 => "move3",
            Self::Bet3 => "bet3",
            Self::Reveal => "reveal",
            Self::FinalBet => "finalBet",
            Self::RoundEnd => "roundEnd",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| format!("unknown phase: {s}"))
    }
}

/// Which of the two seats a participant occupies.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Player1,
    Player2,
}

impl Side {
    pub const fn opponent(self) -> Side {
        match self {
            Self::Player1 => Self::Player2,
            Self::Player2 => Self::Player1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Player1 => "player1",
            Self::Player2 => "player2",
        };
        write!(f, "{repr}")
    }
}

/// Result of a round or of a whole game.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Winner {
    Player1,
    Player2,
    Tie,
}

impl From<Side> for Winner {
    fn from(value: Side) -> Self {
        match value {
            Side::Player1 => Self::Player1,
            Side::Player2 => Self::Player2,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Player1 => "player1",
            Self::Player2 => "player2",
            Self::Tie => "tie",
        };
        write!(f, "{repr}")
    }
}

/// One player's actions within a round.
///
/// Even indices 0, 2, 4 hold the columns the player chose for themselves,
/// odd indices 1, 3, 5 hold the rows they assigned to the opponent, and
/// index 6 holds the reveal column.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MoveList(Vec<u8>);

impl MoveList {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::with_capacity(REVEALED_MOVE_LIST_LEN))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn push_move(&mut self, self_column: u8, other_row: u8) {
        self.0.push(self_column);
        self.0.push(other_row);
    }

    pub(crate) fn push_reveal(&mut self, column: u8) {
        self.0.push(column);
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }

    /// Column the player chose for themselves in move-round `i` (0-based).
    pub fn chosen_column(&self, i: usize) -> Option<u8> {
        (i < MOVES_PER_ROUND).then(|| self.0.get(2 * i).copied()).flatten()
    }

    /// Row the player assigned to the opponent in move-round `i` (0-based).
    pub fn assigned_row(&self, i: usize) -> Option<u8> {
        (i < MOVES_PER_ROUND)
            .then(|| self.0.get(2 * i + 1).copied())
            .flatten()
    }

    pub fn chosen_columns(&self) -> impl Iterator<Item = u8> + '_ {
        (0..MOVES_PER_ROUND).filter_map(|i| self.chosen_column(i))
    }

    pub fn reveal_column(&self) -> Option<u8> {
        self.0.get(2 * MOVES_PER_ROUND).copied()
    }

    /// The first `len` entries, used to hide moves the other side has not
    /// matched yet.
    #[must_use]
    pub fn truncated(&self, len: usize) -> Self {
        Self(self.0.iter().take(len).copied().collect())
    }
}

impl From<Vec<u8>> for MoveList {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl fmt::Display for MoveList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "[{repr}]")
    }
}

/// Per-player economic and progress data for the current round.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub moves: MoveList,
    /// Free chip stack, outside the pot.
    pub coins: Coins,
    /// Chips committed to this round's pot.
    pub pot_coins: Coins,
    /// Whether the player has acted in the current betting sub-phase.
    pub bet_made: bool,
    /// Whether the player has signalled to settle the round.
    pub ended_round: bool,
}

impl Default for Seat {
    fn default() -> Self {
        Self::new(STARTING_COINS)
    }
}

impl Seat {
    #[must_use]
    pub fn new(coins: Coins) -> Self {
        Self {
            moves: MoveList::new(),
            coins,
            pot_coins: 0,
            bet_made: false,
            ended_round: false,
        }
    }

    /// Coins owned by this seat, in or out of the pot.
    pub fn total(&self) -> Coins {
        self.coins + self.pot_coins
    }

    /// Move `amount` from the free stack into the pot. Callers validate
    /// affordability first.
    pub(crate) fn commit(&mut self, amount: Coins) {
        debug_assert!(amount <= self.coins);
        self.coins -= amount;
        self.pot_coins += amount;
    }

    /// Empty the pot and return how much was in it.
    pub(crate) fn take_pot(&mut self) -> Coins {
        std::mem::take(&mut self.pot_coins)
    }
}

/// Whether `value` is a valid row or column index.
pub const fn in_board_range(value: u8) -> bool {
    (value as usize) < BOARD_SIZE
}
