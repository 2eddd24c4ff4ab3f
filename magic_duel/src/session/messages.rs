//! Game actor message types.

use tokio::sync::{mpsc, oneshot};

use super::errors::SessionResult;
use crate::game::{GameAction, GameId, GameState, Phase, PlayerId, PlayerView, Scores, Winner};

/// Messages that can be sent to a GameActor
#[derive(Debug)]
pub enum GameMessage {
    /// Apply an action and persist the result
    Apply {
        action: GameAction,
        response: oneshot::Sender<SessionResult<GameState>>,
    },

    /// Get the projection of the game for one participant
    GetView {
        player_id: PlayerId,
        response: oneshot::Sender<SessionResult<PlayerView>>,
    },

    /// Subscribe to state change notifications. Fails when the game does
    /// not exist.
    Subscribe {
        subscriber: PlayerId,
        sender: mpsc::Sender<StateChangeNotification>,
        response: oneshot::Sender<SessionResult<()>>,
    },

    /// Unsubscribe from state change notifications
    Unsubscribe { subscriber: PlayerId },
}

/// Notification sent after a new state has been persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChangeNotification {
    /// An action was applied
    StateChanged {
        game_id: GameId,
        phase: Phase,
        round_number: u32,
    },
    /// Both players settled the round
    RoundSettled { game_id: GameId, scores: Scores },
    /// The game is over; no further notifications follow
    GameEnded { game_id: GameId, winner: Winner },
}
