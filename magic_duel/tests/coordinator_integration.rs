//! Coordinator integration tests.
//!
//! Hammers one game from many tasks at once and checks that the actor lets
//! exactly the legal writes through, and that storage always holds the last
//! accepted state.

use std::sync::Arc;

use magic_duel::{
    GameCoordinator, GameState, Phase, Player, PlayerId, SessionError, TOTAL_COINS,
    db::{GameRepository, InMemoryGameRepository},
    game::{ErrorKind, GameError, Side},
    session::{CoordinatorConfig, StateChangeNotification},
};
use tokio::task::JoinSet;

fn setup() -> (Arc<GameCoordinator>, Arc<InMemoryGameRepository>) {
    let repo = Arc::new(InMemoryGameRepository::new());
    let coordinator = Arc::new(GameCoordinator::new(
        repo.clone(),
        CoordinatorConfig::default(),
    ));
    (coordinator, repo)
}

async fn started(coordinator: &GameCoordinator) -> GameState {
    let state = coordinator
        .create_game(Player::new("alice", "Alice"), 10, Some(8))
        .await
        .unwrap();
    coordinator
        .join(state.id(), Player::new("bob", "Bob"))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_moves() {
    let (coordinator, repo) = setup();
    let game_id = started(&coordinator).await.id();

    let mut tasks = JoinSet::new();
    for i in 0..20u8 {
        let coordinator = coordinator.clone();
        let who = if i % 2 == 0 { "alice" } else { "bob" };
        tasks.spawn(async move {
            coordinator
                .make_move(game_id, &PlayerId::new(who), i % 6, (i + 1) % 6)
                .await
        });
    }

    let mut accepted = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(_) => accepted += 1,
            Err(SessionError::Game(GameError::AlreadyActed | GameError::InvalidPhase(_))) => {}
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    // One move each, then the game is in the betting phase.
    assert_eq!(accepted, 2);
    let stored = repo.get(game_id).await.unwrap().unwrap();
    assert_eq!(stored.phase(), Phase::Bet1);
    assert_eq!(stored.seat(Side::Player1).moves.len(), 2);
    assert_eq!(stored.seat(Side::Player2).moves.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bets_conserve_coins() {
    let (coordinator, repo) = setup();
    let game_id = started(&coordinator).await.id();
    coordinator
        .make_move(game_id, &PlayerId::new("alice"), 0, 0)
        .await
        .unwrap();
    coordinator
        .make_move(game_id, &PlayerId::new("bob"), 1, 1)
        .await
        .unwrap();

    // Both players race to put in the same raise many times over.
    let mut tasks = JoinSet::new();
    for i in 0..40u32 {
        let coordinator = coordinator.clone();
        let who = if i % 2 == 0 { "alice" } else { "bob" };
        tasks.spawn(async move { coordinator.make_bet(game_id, &PlayerId::new(who), 5).await });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(state) => assert_eq!(state.total_coins(), TOTAL_COINS),
            Err(err) => assert!(
                matches!(err.kind(), ErrorKind::Conflict | ErrorKind::Economic),
                "unexpected error: {err}"
            ),
        }
    }

    let stored = repo.get(game_id).await.unwrap().unwrap();
    stored.check_invariants().unwrap();
    assert_eq!(stored.total_coins(), TOTAL_COINS);
}

#[tokio::test]
async fn test_both_players_see_every_change() {
    let (coordinator, _) = setup();
    let game_id = started(&coordinator).await.id();
    let alice = PlayerId::new("alice");
    let bob = PlayerId::new("bob");

    let mut alice_rx = coordinator.subscribe(game_id, &alice).await.unwrap();
    let mut bob_rx = coordinator.subscribe(game_id, &bob).await.unwrap();

    coordinator.make_move(game_id, &alice, 2, 2).await.unwrap();
    coordinator.make_move(game_id, &bob, 3, 3).await.unwrap();

    for rx in [&mut alice_rx, &mut bob_rx] {
        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first,
            StateChangeNotification::StateChanged {
                phase: Phase::Move1,
                ..
            }
        ));
        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second,
            StateChangeNotification::StateChanged {
                phase: Phase::Bet1,
                ..
            }
        ));
    }

    // Views fetched through the coordinator match the stored state.
    let view = coordinator.view(game_id, &bob).await.unwrap();
    assert_eq!(view.opponent.moves.as_slice(), &[2, 2]);
    assert_eq!(view.phase, Phase::Bet1);
}

#[tokio::test]
async fn test_list_by_phase() {
    let (coordinator, _) = setup();
    let waiting = coordinator
        .create_game(Player::new("carol", "Carol"), 5, Some(1))
        .await
        .unwrap();
    let playing = started(&coordinator).await;

    let listed = coordinator.list_games(Phase::Waiting).await.unwrap();
    assert_eq!(listed.iter().map(GameState::id).collect::<Vec<_>>(), vec![waiting.id()]);
    let listed = coordinator.list_games(Phase::Move1).await.unwrap();
    assert_eq!(listed.iter().map(GameState::id).collect::<Vec<_>>(), vec![playing.id()]);

    coordinator
        .leave_game(playing.id(), &PlayerId::new("bob"))
        .await
        .unwrap();
    assert!(coordinator.list_games(Phase::Move1).await.unwrap().is_empty());
    assert_eq!(coordinator.list_games(Phase::Ended).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_outsider_cannot_act() {
    let (coordinator, _) = setup();
    let game_id = started(&coordinator).await.id();
    let mallory = PlayerId::new("mallory");

    let err = coordinator.make_move(game_id, &mallory, 0, 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = coordinator.view(game_id, &mallory).await.unwrap_err();
    assert!(matches!(err, SessionError::Game(GameError::NotAParticipant(_))));
}
