//! PostgreSQL repository tests.
//!
//! These need a running database and are ignored by default. Run with:
//! `DATABASE_URL=postgres://... cargo test --test pg_repository_integration -- --ignored`

use magic_duel::{
    GameState, Phase, Player, PlayerId,
    db::{Database, DatabaseConfig, GAMES_SCHEMA, GameRepository, PgGameRepository, RepositoryError},
};
use serial_test::serial;
use sqlx::{PgPool, types::Json};
use std::time::Duration;
use uuid::Uuid;

fn database_url() -> String {
    std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| DatabaseConfig::development().database_url)
}

/// Pool with the games table in place
async fn setup_pool() -> PgPool {
    let pool = PgPool::connect(&database_url())
        .await
        .expect("Failed to connect to test database");
    sqlx::raw_sql(GAMES_SCHEMA)
        .execute(&pool)
        .await
        .expect("Failed to create games table");
    pool
}

fn new_game(seed: u32) -> GameState {
    GameState::create(Player::new("alice", "Alice"), 10, Some(seed))
}

/// Phase column for hand-written rows, so no listing ever returns them
const UNLISTED: &str = "unlisted";

/// Store a document under `id` without going through the repository.
async fn insert_raw(pool: &PgPool, id: Uuid, phase: &str, state: serde_json::Value) {
    sqlx::query(
        "INSERT INTO games (id, phase, round_number, state, created_at, updated_at)
         VALUES ($1, $2, 1, $3, NOW(), NOW())",
    )
    .bind(id)
    .bind(phase)
    .bind(Json(state))
    .execute(pool)
    .await
    .expect("Failed to insert raw row");
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_migrate_is_idempotent() {
    let config = DatabaseConfig {
        database_url: database_url(),
        ..DatabaseConfig::development()
    };
    let db = Database::new(&config).await.unwrap();
    db.migrate().await.unwrap();
    db.migrate().await.unwrap();

    let before = db.count_games().await.unwrap();
    db.games().put(&new_game(1)).await.unwrap();
    assert_eq!(db.count_games().await.unwrap(), before + 1);
    db.close().await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_upsert_replaces_state() {
    let repo = PgGameRepository::new(setup_pool().await);
    let state = new_game(1);
    repo.put(&state).await.unwrap();
    assert_eq!(repo.get(state.id()).await.unwrap(), Some(state.clone()));

    let joined = state.join(Player::new("bob", "Bob")).unwrap();
    repo.put(&joined).await.unwrap();
    assert_eq!(repo.get(state.id()).await.unwrap(), Some(joined.clone()));

    // The phase column follows the document.
    let waiting = repo.list_by_phase(Phase::Waiting).await.unwrap();
    assert!(waiting.iter().all(|game| game.id() != state.id()));
    let playing = repo.list_by_phase(Phase::Move1).await.unwrap();
    assert!(playing.contains(&joined));
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_get_missing() {
    let repo = PgGameRepository::new(setup_pool().await);
    assert_eq!(repo.get(Uuid::new_v4()).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_list_orders_by_recency() {
    let repo = PgGameRepository::new(setup_pool().await);
    let older = new_game(1);
    tokio::time::sleep(Duration::from_millis(5)).await;
    let newer = new_game(2);
    repo.put(&older).await.unwrap();
    repo.put(&newer).await.unwrap();

    // Other runs may have left games behind; only the relative order matters.
    let ids: Vec<Uuid> = repo
        .list_by_phase(Phase::Waiting)
        .await
        .unwrap()
        .iter()
        .map(GameState::id)
        .filter(|id| *id == older.id() || *id == newer.id())
        .collect();
    assert_eq!(ids, vec![newer.id(), older.id()]);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_corrupt_rows_are_refused() {
    let pool = setup_pool().await;
    let repo = PgGameRepository::new(pool.clone());

    // A document stored under someone else's id.
    let stray = new_game(3);
    let wrong_id = Uuid::new_v4();
    insert_raw(&pool, wrong_id, UNLISTED, serde_json::to_value(&stray).unwrap()).await;
    assert!(matches!(
        repo.get(wrong_id).await,
        Err(RepositoryError::Corrupt { id, .. }) if id == wrong_id
    ));

    // A betting phase whose move lists belong to the previous move phase.
    let alice = PlayerId::new("alice");
    let bob = PlayerId::new("bob");
    let state = new_game(4)
        .join(Player::new("bob", "Bob"))
        .unwrap()
        .make_move(&alice, 0, 0)
        .unwrap()
        .make_move(&bob, 1, 1)
        .unwrap()
        .make_bet(&alice, 0)
        .unwrap()
        .make_bet(&bob, 0)
        .unwrap();
    assert_eq!(state.phase(), Phase::Move2);
    let mut document = serde_json::to_value(&state).unwrap();
    document["phase"] = serde_json::json!("bet2");
    insert_raw(&pool, state.id(), UNLISTED, document).await;
    assert!(matches!(
        repo.get(state.id()).await,
        Err(RepositoryError::Corrupt { id, .. }) if id == state.id()
    ));
}
