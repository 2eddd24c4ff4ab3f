//! Game storage.
//!
//! The session layer persists through the [`GameRepository`] trait. This
//! module also owns the PostgreSQL pool and the `games` schema used by
//! [`PgGameRepository`].

use log::info;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod repository;

pub use config::{ConfigError, DatabaseConfig};
pub use repository::{
    DEFAULT_QUERY_TIMEOUT, GameRepository, InMemoryGameRepository, PgGameRepository,
    RepositoryError, RepositoryResult,
};

/// Schema for the `games` table.
pub const GAMES_SCHEMA: &str = include_str!("../../migrations/001_games.sql");

/// PostgreSQL pool holding magic duel games
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a pool sized from `config`
    ///
    /// ```no_run
    /// use magic_duel::db::{Database, DatabaseConfig};
    ///
    /// # async fn open() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::new(&DatabaseConfig::from_env()?).await?;
    /// db.migrate().await?;
    /// let games = db.games();
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;
        info!(
            "Database pool open ({}..{} connections)",
            config.min_connections, config.max_connections
        );
        Ok(Self { pool })
    }

    /// Create the `games` table and its index if they do not exist yet
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(GAMES_SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Game repository sharing this pool
    pub fn games(&self) -> PgGameRepository {
        PgGameRepository::new(self.pool.clone())
    }

    /// Number of stored games, for a quick liveness probe
    pub async fn count_games(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM games")
            .fetch_one(&self.pool)
            .await
    }

    /// Wait for checked-out connections and close the pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
