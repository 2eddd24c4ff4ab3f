//! Game actor implementation with async message handling.

use log::{debug, error, info, warn};
use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};
use tokio::sync::mpsc;

use super::{
    errors::{SessionError, SessionResult},
    messages::{GameMessage, StateChangeNotification},
};
use crate::{
    db::{GameRepository, RepositoryResult},
    game::{Apply, GameAction, GameError, GameId, GameState, PlayerId},
};

/// Run a storage call under a deadline.
pub(super) async fn with_storage_timeout<T>(
    duration: Duration,
    future: impl Future<Output = RepositoryResult<T>>,
) -> SessionResult<T> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(SessionError::StorageTimeout(duration)),
    }
}

/// Game actor handle for sending messages
#[derive(Clone, Debug)]
pub struct GameHandle {
    sender: mpsc::Sender<GameMessage>,
    game_id: GameId,
}

impl GameHandle {
    /// Create a new game handle
    pub fn new(sender: mpsc::Sender<GameMessage>, game_id: GameId) -> Self {
        Self { sender, game_id }
    }

    /// Get game ID
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Whether the actor has stopped accepting messages
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the game. Hands the message back if the actor is
    /// gone so the caller can retry on a fresh actor.
    pub async fn send(&self, message: GameMessage) -> Result<(), GameMessage> {
        self.sender.send(message).await.map_err(|err| err.0)
    }
}

/// Actor serializing every write to one game.
///
/// Each message runs load, apply, persist and notify to completion before
/// the next one is taken off the inbox.
pub struct GameActor {
    /// Game ID
    id: GameId,

    /// Message inbox
    inbox: mpsc::Receiver<GameMessage>,

    /// Where the authoritative state lives
    repository: Arc<dyn GameRepository>,

    /// Deadline for each storage call
    storage_timeout: Duration,

    /// Subscribers for state change notifications
    subscribers: HashMap<PlayerId, mpsc::Sender<StateChangeNotification>>,
}

impl GameActor {
    /// Create a new game actor
    ///
    /// # Arguments
    ///
    /// * `id` - Game ID
    /// * `repository` - Storage the actor loads from and persists to
    /// * `inbox_capacity` - Bounded inbox size
    /// * `storage_timeout` - Deadline for each storage call
    ///
    /// # Returns
    ///
    /// * `(GameActor, GameHandle)` - Actor and handle for sending messages
    pub fn new(
        id: GameId,
        repository: Arc<dyn GameRepository>,
        inbox_capacity: usize,
        storage_timeout: Duration,
    ) -> (Self, GameHandle) {
        let (sender, inbox) = mpsc::channel(inbox_capacity);

        let actor = Self {
            id,
            inbox,
            repository,
            storage_timeout,
            subscribers: HashMap::new(),
        };

        (actor, GameHandle::new(sender, id))
    }

    /// Run the game actor event loop
    ///
    /// Once a game has ended the inbox is closed. Messages already queued are
    /// still answered (writes are refused by the state machine), then the
    /// actor exits.
    pub async fn run(mut self) {
        debug!("Game actor {} starting", self.id);

        while let Some(message) = self.inbox.recv().await {
            if self.handle_message(message).await {
                self.inbox.close();
            }
        }

        debug!("Game actor {} stopped", self.id);
    }

    /// Handle one message. Returns whether the actor should retire: the
    /// game is over or does not exist.
    async fn handle_message(&mut self, message: GameMessage) -> bool {
        match message {
            GameMessage::Apply { action, response } => {
                let result = self.handle_apply(action).await;
                let retire = match &result {
                    Ok(state) => state.is_game_over(),
                    Err(err) => matches!(
                        err,
                        SessionError::Game(GameError::AlreadyEnded) | SessionError::GameNotFound(_)
                    ),
                };
                let _ = response.send(result);
                retire
            }

            GameMessage::GetView {
                player_id,
                response,
            } => {
                let loaded = self.load().await;
                let retire = match &loaded {
                    Ok(state) => state.is_game_over(),
                    Err(err) => matches!(err, SessionError::GameNotFound(_)),
                };
                let result =
                    loaded.and_then(|state| state.view_for(&player_id).map_err(SessionError::from));
                let _ = response.send(result);
                retire
            }

            GameMessage::Subscribe {
                subscriber,
                sender,
                response,
            } => {
                let loaded = self.load().await;
                let retire = match &loaded {
                    Ok(state) => state.is_game_over(),
                    Err(err) => matches!(err, SessionError::GameNotFound(_)),
                };
                if loaded.is_ok() {
                    debug!("{} subscribed to game {}", subscriber, self.id);
                    self.subscribers.insert(subscriber, sender);
                }
                let _ = response.send(loaded.map(|_| ()));
                retire
            }

            GameMessage::Unsubscribe { subscriber } => {
                self.subscribers.remove(&subscriber);
                debug!("{} unsubscribed from game {}", subscriber, self.id);
                false
            }
        }
    }

    async fn load(&self) -> SessionResult<GameState> {
        with_storage_timeout(self.storage_timeout, self.repository.get(self.id))
            .await?
            .ok_or(SessionError::GameNotFound(self.id))
    }

    async fn handle_apply(&mut self, action: GameAction) -> SessionResult<GameState> {
        let current = self.load().await?;

        let next = action.apply(&current).map_err(|err| {
            debug!("Game {}: rejected {}: {}", self.id, action, err);
            err
        })?;

        if let Err(err) = with_storage_timeout(self.storage_timeout, self.repository.put(&next)).await {
            error!("Game {}: failed to persist after {}: {}", self.id, action, err);
            return Err(err);
        }

        self.notify(&current, &next);
        if next.is_game_over() {
            info!("Game {} ended", self.id);
        }
        Ok(next)
    }

    /// Tell subscribers about a persisted change
    fn notify(&mut self, previous: &GameState, next: &GameState) {
        let mut notifications = vec![StateChangeNotification::StateChanged {
            game_id: next.id(),
            phase: next.phase(),
            round_number: next.round_number(),
        }];
        if let (None, Some(scores)) = (previous.round_scores(), next.round_scores()) {
            notifications.push(StateChangeNotification::RoundSettled {
                game_id: next.id(),
                scores,
            });
        }
        if let (false, Some(winner)) = (previous.is_game_over(), next.game_winner()) {
            notifications.push(StateChangeNotification::GameEnded {
                game_id: next.id(),
                winner,
            });
        }

        for notification in notifications {
            self.broadcast(notification);
        }
    }

    /// Broadcast state change notification to all subscribers
    fn broadcast(&mut self, notification: StateChangeNotification) {
        self.subscribers.retain(|subscriber, sender| {
            match sender.try_send(notification.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Subscriber {} channel full, dropping notification", subscriber);
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("Subscriber {} disconnected, removing", subscriber);
                    false
                }
            }
        });
    }
}
