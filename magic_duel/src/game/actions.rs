//! Player and system actions as data.
//!
//! The coordinator receives a [`GameAction`] over its inbox and applies it to
//! the current [`GameState`]. Each action type maps onto exactly one state
//! machine operation.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::{Coins, Player, PlayerId};
use super::state_machine::{GameResult, GameState};

#[enum_dispatch]
pub trait Apply {
    /// Run the operation against `state`, producing the next state.
    fn apply(&self, state: &GameState) -> GameResult<GameState>;

    /// Player on whose behalf the action runs, if any.
    fn actor(&self) -> Option<&PlayerId>;
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Join {
    pub player: Player,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeMove {
    pub player_id: PlayerId,
    pub self_column: u8,
    pub other_row: u8,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeBet {
    pub player_id: PlayerId,
    pub amount: Coins,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldBet {
    pub player_id: PlayerId,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reveal {
    pub player_id: PlayerId,
    pub column: u8,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndRound {
    pub player_id: PlayerId,
}

/// Start the next round. Not tied to a player: either participant, or a
/// timer, may trigger it once the round is settled.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NextRound {
    pub seed: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leave {
    pub player_id: PlayerId,
}

impl Apply for Join {
    fn apply(&self, state: &GameState) -> GameResult<GameState> {
        state.join(self.player.clone())
    }

    fn actor(&self) -> Option<&PlayerId> {
        Some(&self.player.id)
    }
}

impl Apply for MakeMove {
    fn apply(&self, state: &GameState) -> GameResult<GameState> {
        state.make_move(&self.player_id, self.self_column, self.other_row)
    }

    fn actor(&self) -> Option<&PlayerId> {
        Some(&self.player_id)
    }
}

impl Apply for MakeBet {
    fn apply(&self, state: &GameState) -> GameResult<GameState> {
        state.make_bet(&self.player_id, self.amount)
    }

    fn actor(&self) -> Option<&PlayerId> {
        Some(&self.player_id)
    }
}

impl Apply for FoldBet {
    fn apply(&self, state: &GameState) -> GameResult<GameState> {
        state.fold_bet(&self.player_id)
    }

    fn actor(&self) -> Option<&PlayerId> {
        Some(&self.player_id)
    }
}

impl Apply for Reveal {
    fn apply(&self, state: &GameState) -> GameResult<GameState> {
        state.make_reveal_move(&self.player_id, self.column)
    }

    fn actor(&self) -> Option<&PlayerId> {
        Some(&self.player_id)
    }
}

impl Apply for EndRound {
    fn apply(&self, state: &GameState) -> GameResult<GameState> {
        state.end_round(&self.player_id)
    }

    fn actor(&self) -> Option<&PlayerId> {
        Some(&self.player_id)
    }
}

impl Apply for NextRound {
    fn apply(&self, state: &GameState) -> GameResult<GameState> {
        state.start_next_round(self.seed)
    }

    fn actor(&self) -> Option<&PlayerId> {
        None
    }
}

impl Apply for Leave {
    fn apply(&self, state: &GameState) -> GameResult<GameState> {
        state.leave_game(&self.player_id)
    }

    fn actor(&self) -> Option<&PlayerId> {
        Some(&self.player_id)
    }
}

#[enum_dispatch(Apply)]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameAction {
    Join,
    MakeMove,
    MakeBet,
    FoldBet,
    Reveal,
    EndRound,
    NextRound,
    Leave,
}

impl fmt::Display for GameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Join(action) => format!("join as {}", action.player),
            Self::MakeMove(action) => format!(
                "move ({}, {})",
                action.self_column, action.other_row
            ),
            Self::MakeBet(action) => format!("bet {}", action.amount),
            Self::FoldBet(_) => "fold".to_string(),
            Self::Reveal(action) => format!("reveal {}", action.column),
            Self::EndRound(_) => "end round".to_string(),
            Self::NextRound(_) => "next round".to_string(),
            Self::Leave(_) => "leave".to_string(),
        };
        write!(f, "{repr}")
    }
}
