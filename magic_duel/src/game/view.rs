//! Per-player projection of a game.
//!
//! A participant may see their own moves in full, but only as much of the
//! opponent's move list as they have matched themselves. Otherwise the
//! player acting second in a move phase would see the choice they are
//! responding to.

use serde::{Deserialize, Serialize};

use super::board::Board;
use super::entities::{Coins, GameId, MoveList, Phase, Player, PlayerId, Side, Winner};
use super::scoring::Scores;
use super::state_machine::{GameResult, GameState};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub player: Option<Player>,
    pub moves: MoveList,
    pub coins: Coins,
    pub pot_coins: Coins,
    pub bet_made: bool,
    pub ended_round: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub game_id: GameId,
    pub phase: Phase,
    pub round_number: u32,
    pub stake: Coins,
    pub board: Board,
    /// Which seat the viewer occupies.
    pub side: Side,
    pub me: SeatView,
    pub opponent: SeatView,
    pub settled_pot_coins: Coins,
    /// Round scores, present once both players have settled the round.
    pub scores: Option<Scores>,
    /// Overall result, present once the game has ended.
    pub winner: Option<Winner>,
}

impl GameState {
    fn seat_view(&self, side: Side, visible_moves: usize) -> SeatView {
        let seat = self.seat(side);
        SeatView {
            player: self.player(side).cloned(),
            moves: seat.moves.truncated(visible_moves),
            coins: seat.coins,
            pot_coins: seat.pot_coins,
            bet_made: seat.bet_made,
            ended_round: seat.ended_round,
        }
    }

    /// What `viewer` is allowed to see of this game.
    pub fn view_for(&self, viewer: &PlayerId) -> GameResult<PlayerView> {
        let side = self.side_of(viewer)?;
        let own_len = self.seat(side).moves.len();
        let opponent_len = self.seat(side.opponent()).moves.len();

        Ok(PlayerView {
            game_id: self.id(),
            phase: self.phase(),
            round_number: self.round_number(),
            stake: self.stake(),
            board: *self.board(),
            side,
            me: self.seat_view(side, own_len),
            opponent: self.seat_view(side.opponent(), own_len.min(opponent_len)),
            settled_pot_coins: self.settled_pot_coins(),
            scores: self.round_scores(),
            winner: self.game_winner(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state_machine::GameError;

    fn a() -> PlayerId {
        PlayerId::new("alice")
    }

    fn b() -> PlayerId {
        PlayerId::new("bob")
    }

    fn joined() -> GameState {
        GameState::create(Player::new("alice", "Alice"), 10, Some(9))
            .join(Player::new("bob", "Bob"))
            .unwrap()
    }

    #[test]
    fn test_opponent_move_hidden_until_matched() {
        let state = joined().make_move(&a(), 3, 4).unwrap();

        let alice_view = state.view_for(&a()).unwrap();
        assert_eq!(alice_view.me.moves.as_slice(), &[3, 4]);
        assert!(alice_view.opponent.moves.is_empty());

        let bob_view = state.view_for(&b()).unwrap();
        assert_eq!(bob_view.side, Side::Player2);
        assert!(bob_view.opponent.moves.is_empty());
        assert!(bob_view.me.moves.is_empty());

        let state = state.make_move(&b(), 1, 2).unwrap();
        let bob_view = state.view_for(&b()).unwrap();
        assert_eq!(bob_view.opponent.moves.as_slice(), &[3, 4]);
        assert_eq!(bob_view.me.moves.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_view_shows_economy() {
        let state = joined();
        let view = state.view_for(&a()).unwrap();
        assert_eq!(view.me.coins, 99);
        assert_eq!(view.opponent.pot_coins, 1);
        assert_eq!(view.opponent.player.as_ref().map(|p| p.name.as_str()), Some("Bob"));
        assert_eq!(view.phase, Phase::Move1);
        assert!(view.scores.is_none());
        assert!(view.winner.is_none());
    }

    #[test]
    fn test_waiting_view_has_no_opponent() {
        let state = GameState::create(Player::new("alice", "Alice"), 10, Some(9));
        let view = state.view_for(&a()).unwrap();
        assert!(view.opponent.player.is_none());
        assert_eq!(
            state.view_for(&b()),
            Err(GameError::NotAParticipant(b()))
        );
    }

    #[test]
    fn test_winner_after_leave() {
        let state = joined().leave_game(&b()).unwrap();
        let view = state.view_for(&b()).unwrap();
        assert_eq!(view.winner, Some(Winner::Player1));
    }
}
