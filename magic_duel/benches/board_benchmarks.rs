use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use magic_duel::{
    GameState, Player, PlayerId,
    game::{board::generate, scoring::compute_scores},
};

/// Game in the reveal phase after three move pairs and checked bets
fn setup_revealed_game(seed: u32) -> GameState {
    let alice = PlayerId::new("alice");
    let bob = PlayerId::new("bob");
    let mut game = GameState::create(Player::new("alice", "Alice"), 10, Some(seed))
        .join(Player::new("bob", "Bob"))
        .unwrap();

    for (column, row) in [(0, 5), (2, 3), (4, 1)] {
        game = game.make_move(&alice, column, row).unwrap();
        game = game.make_move(&bob, row, column).unwrap();
        game = game.make_bet(&alice, 0).unwrap();
        game = game.make_bet(&bob, 0).unwrap();
    }
    game
}

/// Benchmark board generation for a handful of seeds
fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("board_generate");

    for seed in [0u32, 1, 42, 12345, u32::MAX].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(seed), seed, |b, &seed| {
            b.iter(|| generate(seed));
        });
    }

    group.finish();
}

/// Benchmark generating 20 boards back to back, like 20 rounds of one game
fn bench_generate_20_rounds(c: &mut Criterion) {
    c.bench_function("board_generate_20_rounds", |b| {
        b.iter(|| (0..20u32).map(generate).collect::<Vec<_>>());
    });
}

/// Benchmark round scoring
fn bench_compute_scores(c: &mut Criterion) {
    let game = setup_revealed_game(7);
    let p1 = game.seat(magic_duel::game::Side::Player1).moves.clone();
    let p2 = game.seat(magic_duel::game::Side::Player2).moves.clone();

    c.bench_function("compute_scores", |b| {
        b.iter(|| compute_scores(game.board(), &p1, &p2));
    });
}

/// Benchmark a single state transition, which clones and re-validates the game
fn bench_state_transition(c: &mut Criterion) {
    let game = setup_revealed_game(7);
    let alice = PlayerId::new("alice");

    c.bench_function("reveal_transition", |b| {
        b.iter(|| game.make_reveal_move(&alice, 0));
    });
}

/// Benchmark view projection
fn bench_view(c: &mut Criterion) {
    let game = setup_revealed_game(7);
    let bob = PlayerId::new("bob");

    c.bench_function("view_for", |b| {
        b.iter(|| game.view_for(&bob));
    });
}

criterion_group!(board, bench_generate, bench_generate_20_rounds);

criterion_group!(
    game_operations,
    bench_compute_scores,
    bench_state_transition,
    bench_view,
);

criterion_main!(board, game_operations);
