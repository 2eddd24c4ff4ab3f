//! Repository trait definitions for testability and dependency injection.
//!
//! The coordinator only ever talks to a [`GameRepository`]. Two adapters
//! ship with the crate: [`InMemoryGameRepository`] for tests and
//! simulations, and [`PgGameRepository`] which stores each game as a JSONB
//! document next to the columns used for listing.

use async_trait::async_trait;
use log::warn;
use sqlx::{PgPool, Row, types::Json};
use std::{collections::HashMap, future::Future, time::Duration};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::game::{GameId, GameState, Phase};

/// Per-query deadline for [`PgGameRepository`] unless overridden.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur while loading or storing games
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// A stored game failed validation and was not handed out.
    #[error("Corrupt game {id}: {reason}")]
    Corrupt { id: GameId, reason: String },
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Run a query, giving up after `deadline`.
async fn bounded<T>(
    deadline: Duration,
    query: impl Future<Output = Result<T, sqlx::Error>>,
) -> RepositoryResult<T> {
    match tokio::time::timeout(deadline, query).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            warn!("Query timed out after {:?}", deadline);
            Err(RepositoryError::Timeout(deadline))
        }
    }
}

/// Validate a state read back from storage.
fn checked(id: GameId, state: GameState) -> RepositoryResult<GameState> {
    if state.id() != id {
        return Err(RepositoryError::Corrupt {
            id,
            reason: format!("stored under {id} but carries id {}", state.id()),
        });
    }
    state.check_invariants().map_err(|err| {
        warn!("Refusing to load game {id}: {err}");
        RepositoryError::Corrupt {
            id,
            reason: err.to_string(),
        }
    })?;
    Ok(state)
}

/// Trait for game storage operations
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Load a game by ID
    async fn get(&self, id: GameId) -> RepositoryResult<Option<GameState>>;

    /// Insert or replace a game
    async fn put(&self, state: &GameState) -> RepositoryResult<()>;

    /// All games currently in `phase`, most recently updated first
    async fn list_by_phase(&self, phase: Phase) -> RepositoryResult<Vec<GameState>>;
}

/// In-process storage backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryGameRepository {
    games: RwLock<HashMap<GameId, GameState>>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.games.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.games.read().await.is_empty()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn get(&self, id: GameId) -> RepositoryResult<Option<GameState>> {
        let state = self.games.read().await.get(&id).cloned();
        state.map(|state| checked(id, state)).transpose()
    }

    async fn put(&self, state: &GameState) -> RepositoryResult<()> {
        self.games.write().await.insert(state.id(), state.clone());
        Ok(())
    }

    async fn list_by_phase(&self, phase: Phase) -> RepositoryResult<Vec<GameState>> {
        let games = self.games.read().await;
        let mut matching: Vec<GameState> = games
            .values()
            .filter(|state| state.phase() == phase)
            .cloned()
            .collect();
        matching.sort_by_key(|state| std::cmp::Reverse(state.updated_at()));
        Ok(matching)
    }
}

/// PostgreSQL implementation of `GameRepository`
pub struct PgGameRepository {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgGameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }
}

#[async_trait]
impl GameRepository for PgGameRepository {
    async fn get(&self, id: GameId) -> RepositoryResult<Option<GameState>> {
        let row = bounded(
            self.query_timeout,
            sqlx::query("SELECT state FROM games WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let Json(state): Json<GameState> = row.try_get("state")?;
        checked(id, state).map(Some)
    }

    async fn put(&self, state: &GameState) -> RepositoryResult<()> {
        bounded(
            self.query_timeout,
            sqlx::query(
                "INSERT INTO games (id, phase, round_number, state, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (id) DO UPDATE SET
                    phase = EXCLUDED.phase,
                    round_number = EXCLUDED.round_number,
                    state = EXCLUDED.state,
                    updated_at = EXCLUDED.updated_at",
            )
            .bind(state.id())
            .bind(state.phase().as_str())
            .bind(i64::from(state.round_number()))
            .bind(Json(state))
            .bind(state.created_at())
            .bind(state.updated_at())
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn list_by_phase(&self, phase: Phase) -> RepositoryResult<Vec<GameState>> {
        let rows = bounded(
            self.query_timeout,
            sqlx::query("SELECT id, state FROM games WHERE phase = $1 ORDER BY updated_at DESC")
                .bind(phase.as_str())
                .fetch_all(&self.pool),
        )
        .await?;

        rows.into_iter()
            .map(|row| {
                let id: GameId = row.try_get("id")?;
                let Json(state): Json<GameState> = row.try_get("state")?;
                checked(id, state)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Player, PlayerId};

    fn new_game(seed: u32) -> GameState {
        GameState::create(Player::new("alice", "Alice"), 10, Some(seed))
    }

    #[tokio::test]
    async fn test_get_missing() {
        let repo = InMemoryGameRepository::new();
        assert!(repo.get(GameId::new_v4()).await.unwrap().is_none());
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let repo = InMemoryGameRepository::new();
        let state = new_game(1);
        repo.put(&state).await.unwrap();
        assert_eq!(repo.get(state.id()).await.unwrap(), Some(state.clone()));

        let joined = state.join(Player::new("bob", "Bob")).unwrap();
        repo.put(&joined).await.unwrap();
        assert_eq!(repo.len().await, 1);
        assert_eq!(
            repo.get(state.id()).await.unwrap().map(|s| s.phase()),
            Some(Phase::Move1)
        );
    }

    #[tokio::test]
    async fn test_list_by_phase() {
        let repo = InMemoryGameRepository::new();
        let waiting = new_game(1);
        let playing = new_game(2).join(Player::new("bob", "Bob")).unwrap();
        let ended = new_game(3)
            .leave_game(&PlayerId::new("alice"))
            .unwrap();
        for state in [&waiting, &playing, &ended] {
            repo.put(state).await.unwrap();
        }

        let listed = repo.list_by_phase(Phase::Waiting).await.unwrap();
        assert_eq!(listed, vec![waiting]);
        let listed = repo.list_by_phase(Phase::Move1).await.unwrap();
        assert_eq!(listed, vec![playing]);
        assert!(repo.list_by_phase(Phase::Bet1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_orders_by_recency() {
        let repo = InMemoryGameRepository::new();
        let older = new_game(1);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let newer = new_game(2);
        repo.put(&older).await.unwrap();
        repo.put(&newer).await.unwrap();
        let ids: Vec<GameId> = repo
            .list_by_phase(Phase::Waiting)
            .await
            .unwrap()
            .iter()
            .map(GameState::id)
            .collect();
        assert_eq!(ids, vec![newer.id(), older.id()]);
    }

    #[tokio::test]
    async fn test_checked_rejects_mismatched_id() {
        let state = new_game(1);
        let other = GameId::new_v4();
        assert!(matches!(
            checked(other, state),
            Err(RepositoryError::Corrupt { id, .. }) if id == other
        ));
    }

    #[tokio::test]
    async fn test_bounded_query() {
        let result = bounded(Duration::from_millis(100), async { Ok::<_, sqlx::Error>(7) }).await;
        assert!(matches!(result, Ok(7)));

        let result = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, sqlx::Error>(())
        })
        .await;
        assert!(matches!(result, Err(RepositoryError::Timeout(d)) if d == Duration::from_millis(10)));

        let result = bounded(DEFAULT_QUERY_TIMEOUT, async {
            Err::<(), _>(sqlx::Error::RowNotFound)
        })
        .await;
        assert!(matches!(
            result,
            Err(RepositoryError::Database(sqlx::Error::RowNotFound))
        ));
    }
}
