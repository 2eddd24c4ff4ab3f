/// Property-based tests for board generation
///
/// Every seed must produce a magic square over 1..=36, and the same seed must
/// always produce the same board.
use magic_duel::{
    constants::{BOARD_CELLS, BOARD_SIZE, MAGIC_SUM},
    game::{
        Board,
        board::{generate, is_valid},
        scoring::{mirror, player1_cell, player2_cell},
    },
};
use proptest::prelude::*;

fn line_sums(board: &Board) -> Vec<u32> {
    let mut sums = Vec::with_capacity(2 * BOARD_SIZE + 2);
    for i in 0..BOARD_SIZE {
        sums.push((0..BOARD_SIZE).map(|c| u32::from(board.cell(i, c))).sum());
        sums.push((0..BOARD_SIZE).map(|r| u32::from(board.cell(r, i))).sum());
    }
    sums.push((0..BOARD_SIZE).map(|i| u32::from(board.cell(i, i))).sum());
    sums.push(
        (0..BOARD_SIZE)
            .map(|i| u32::from(board.cell(i, BOARD_SIZE - 1 - i)))
            .sum(),
    );
    sums
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_generated_board_is_magic(seed in any::<u32>()) {
        let board = generate(seed);
        prop_assert!(is_valid(&board), "seed {} gave\n{}", seed, board);
        for sum in line_sums(&board) {
            prop_assert_eq!(sum, MAGIC_SUM);
        }
    }

    #[test]
    fn prop_generated_board_is_permutation(seed in any::<u32>()) {
        let board = generate(seed);
        let mut cells = board.cells().to_vec();
        cells.sort_unstable();
        let expected: Vec<u8> = (1..=BOARD_CELLS as u8).collect();
        prop_assert_eq!(cells, expected);
    }

    #[test]
    fn prop_generation_is_deterministic(seed in any::<u32>()) {
        prop_assert_eq!(generate(seed), generate(seed));
    }

    #[test]
    fn prop_player2_coordinates_are_mirrored(seed in 0u32..16, column in 0u8..6, row in 0u8..6) {
        let board = generate(seed);
        let flipped_row = mirror(row).unwrap();
        let flipped_column = mirror(column).unwrap();
        prop_assert_eq!(
            player1_cell(&board, column, row),
            Some(board.cell(flipped_row as usize, column as usize))
        );
        prop_assert_eq!(
            player2_cell(&board, column, row),
            Some(board.cell(flipped_column as usize, row as usize))
        );
        // Swapping roles transposes the lookup.
        prop_assert_eq!(player1_cell(&board, column, row), player2_cell(&board, row, column));
    }
}
