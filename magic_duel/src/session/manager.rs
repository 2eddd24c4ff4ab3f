//! Game coordinator for spawning and routing to game actors.

use log::{debug, info};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{RwLock, mpsc, oneshot};

use super::{
    actor::{GameActor, GameHandle, with_storage_timeout},
    config::CoordinatorConfig,
    errors::{SessionError, SessionResult},
    messages::{GameMessage, StateChangeNotification},
};
use crate::{
    db::GameRepository,
    game::{
        Coins, GameAction, GameId, GameState, Phase, Player, PlayerId, PlayerView,
        actions::{EndRound, FoldBet, Join, Leave, MakeBet, MakeMove, NextRound, Reveal},
    },
};

/// Front door for every game operation.
///
/// Writes are routed to the game's actor, which applies them one at a time.
/// Actors are spawned lazily and retire once their game has ended.
pub struct GameCoordinator {
    /// Game storage
    repository: Arc<dyn GameRepository>,

    /// Coordinator configuration
    config: CoordinatorConfig,

    /// Live actor handles
    actors: Arc<RwLock<HashMap<GameId, GameHandle>>>,
}

impl GameCoordinator {
    /// Create a new game coordinator
    ///
    /// # Arguments
    ///
    /// * `repository` - Game storage
    /// * `config` - Coordinator configuration
    ///
    /// # Returns
    ///
    /// * `GameCoordinator` - New coordinator with no live actors
    pub fn new(repository: Arc<dyn GameRepository>, config: CoordinatorConfig) -> Self {
        Self {
            repository,
            config,
            actors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Spawn actors for every game in storage that has not ended
    ///
    /// # Returns
    ///
    /// * `SessionResult<usize>` - Number of games restored
    pub async fn load_active_games(&self) -> SessionResult<usize> {
        let mut loaded = 0;
        for phase in Phase::ALL.into_iter().filter(|phase| *phase != Phase::Ended) {
            let games = with_storage_timeout(
                self.config.storage_timeout(),
                self.repository.list_by_phase(phase),
            )
            .await?;
            for game in games {
                self.handle(game.id()).await;
                loaded += 1;
            }
        }
        info!("Restored {} active games", loaded);
        Ok(loaded)
    }

    /// Create, persist and start a new game
    ///
    /// # Arguments
    ///
    /// * `player1` - The creator, seated as player 1
    /// * `stake` - Stake recorded for settlement
    /// * `seed` - Board seed; random when `None`
    ///
    /// # Returns
    ///
    /// * `SessionResult<GameState>` - The stored game in the waiting phase
    pub async fn create_game(
        &self,
        player1: Player,
        stake: Coins,
        seed: Option<u32>,
    ) -> SessionResult<GameState> {
        let state = GameState::create(player1, stake, seed);
        with_storage_timeout(self.config.storage_timeout(), self.repository.put(&state)).await?;
        self.handle(state.id()).await;
        Ok(state)
    }

    /// Load a game straight from storage
    pub async fn get_game(&self, game_id: GameId) -> SessionResult<GameState> {
        with_storage_timeout(self.config.storage_timeout(), self.repository.get(game_id))
            .await?
            .ok_or(SessionError::GameNotFound(game_id))
    }

    /// All games in `phase`, most recently updated first
    pub async fn list_games(&self, phase: Phase) -> SessionResult<Vec<GameState>> {
        with_storage_timeout(
            self.config.storage_timeout(),
            self.repository.list_by_phase(phase),
        )
        .await
    }

    /// Number of games with a running actor
    pub async fn active_games(&self) -> usize {
        self.actors
            .read()
            .await
            .values()
            .filter(|handle| !handle.is_closed())
            .count()
    }

    /// Handle of a running actor, if there is one
    async fn live_handle(&self, game_id: GameId) -> Option<GameHandle> {
        self.actors
            .read()
            .await
            .get(&game_id)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Get the live handle for a game, spawning an actor if none is running
    async fn handle(&self, game_id: GameId) -> GameHandle {
        if let Some(handle) = self.live_handle(game_id).await {
            return handle;
        }

        let mut actors = self.actors.write().await;
        // Another caller may have spawned one while we waited for the lock.
        if let Some(handle) = actors.get(&game_id).filter(|handle| !handle.is_closed()) {
            return handle.clone();
        }
        actors.retain(|_, handle| !handle.is_closed());

        let (actor, handle) = GameActor::new(
            game_id,
            self.repository.clone(),
            self.config.inbox_capacity,
            self.config.storage_timeout(),
        );
        actors.insert(game_id, handle.clone());
        tokio::spawn(actor.run());
        debug!("Spawned actor for game {}", game_id);
        handle
    }

    /// Deliver a message, respawning the actor once if it retired meanwhile
    async fn deliver(&self, game_id: GameId, message: GameMessage) -> SessionResult<()> {
        let message = match self.handle(game_id).await.send(message).await {
            Ok(()) => return Ok(()),
            Err(message) => message,
        };
        self.handle(game_id)
            .await
            .send(message)
            .await
            .map_err(|_| SessionError::ActorUnavailable)
    }

    /// Apply an action to a game
    ///
    /// # Arguments
    ///
    /// * `game_id` - Game ID
    /// * `action` - Action to apply
    ///
    /// # Returns
    ///
    /// * `SessionResult<GameState>` - The persisted new state, or why the
    ///   action was refused
    pub async fn apply(&self, game_id: GameId, action: GameAction) -> SessionResult<GameState> {
        let (tx, rx) = oneshot::channel();
        self.deliver(
            game_id,
            GameMessage::Apply {
                action,
                response: tx,
            },
        )
        .await?;
        rx.await.map_err(|_| SessionError::ActorUnavailable)?
    }

    /// What `player_id` may see of a game
    pub async fn view(&self, game_id: GameId, player_id: &PlayerId) -> SessionResult<PlayerView> {
        let (tx, rx) = oneshot::channel();
        self.deliver(
            game_id,
            GameMessage::GetView {
                player_id: player_id.clone(),
                response: tx,
            },
        )
        .await?;
        rx.await.map_err(|_| SessionError::ActorUnavailable)?
    }

    /// Receive a notification after every persisted change to a game
    ///
    /// # Errors
    ///
    /// * `GameNotFound` - No game with this ID is stored
    pub async fn subscribe(
        &self,
        game_id: GameId,
        subscriber: &PlayerId,
    ) -> SessionResult<mpsc::Receiver<StateChangeNotification>> {
        let (sender, receiver) = mpsc::channel(self.config.notification_capacity);
        let (tx, rx) = oneshot::channel();
        self.deliver(
            game_id,
            GameMessage::Subscribe {
                subscriber: subscriber.clone(),
                sender,
                response: tx,
            },
        )
        .await?;
        rx.await.map_err(|_| SessionError::ActorUnavailable)??;
        Ok(receiver)
    }

    /// Stop notifications for `subscriber`. A game without a running actor
    /// has no subscribers, so there is nothing to do.
    pub async fn unsubscribe(&self, game_id: GameId, subscriber: &PlayerId) -> SessionResult<()> {
        if let Some(handle) = self.live_handle(game_id).await {
            // An actor retiring meanwhile drops its subscribers anyway.
            let _ = handle
                .send(GameMessage::Unsubscribe {
                    subscriber: subscriber.clone(),
                })
                .await;
        }
        Ok(())
    }

    pub async fn join(&self, game_id: GameId, player: Player) -> SessionResult<GameState> {
        self.apply(game_id, Join { player }.into()).await
    }

    pub async fn make_move(
        &self,
        game_id: GameId,
        player_id: &PlayerId,
        self_column: u8,
        other_row: u8,
    ) -> SessionResult<GameState> {
        let action = MakeMove {
            player_id: player_id.clone(),
            self_column,
            other_row,
        };
        self.apply(game_id, action.into()).await
    }

    pub async fn make_bet(
        &self,
        game_id: GameId,
        player_id: &PlayerId,
        amount: Coins,
    ) -> SessionResult<GameState> {
        let action = MakeBet {
            player_id: player_id.clone(),
            amount,
        };
        self.apply(game_id, action.into()).await
    }

    pub async fn fold_bet(&self, game_id: GameId, player_id: &PlayerId) -> SessionResult<GameState> {
        let action = FoldBet {
            player_id: player_id.clone(),
        };
        self.apply(game_id, action.into()).await
    }

    pub async fn make_reveal_move(
        &self,
        game_id: GameId,
        player_id: &PlayerId,
        column: u8,
    ) -> SessionResult<GameState> {
        let action = Reveal {
            player_id: player_id.clone(),
            column,
        };
        self.apply(game_id, action.into()).await
    }

    pub async fn end_round(&self, game_id: GameId, player_id: &PlayerId) -> SessionResult<GameState> {
        let action = EndRound {
            player_id: player_id.clone(),
        };
        self.apply(game_id, action.into()).await
    }

    pub async fn start_next_round(
        &self,
        game_id: GameId,
        seed: Option<u32>,
    ) -> SessionResult<GameState> {
        self.apply(game_id, NextRound { seed }.into()).await
    }

    pub async fn leave_game(&self, game_id: GameId, player_id: &PlayerId) -> SessionResult<GameState> {
        let action = Leave {
            player_id: player_id.clone(),
        };
        self.apply(game_id, action.into()).await
    }
}
