//! Round scoring.
//!
//! Each player picks three columns for themselves and assigns three rows to
//! their opponent. Player 2 sees the board from the opposite orientation, so
//! every coordinate player 2 supplies goes through [`mirror`] before it
//! touches the shared board.

use serde::{Deserialize, Serialize};

use super::{
    board::Board,
    constants::{BOARD_SIZE, MOVES_PER_ROUND, REVEALED_MOVE_LIST_LEN},
    entities::{MoveList, Winner, in_board_range},
};

/// Both players' scores for one round.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Scores {
    pub player1: u32,
    pub player2: u32,
}

impl Scores {
    pub fn winner(&self) -> Winner {
        match self.player1.cmp(&self.player2) {
            std::cmp::Ordering::Greater => Winner::Player1,
            std::cmp::Ordering::Less => Winner::Player2,
            std::cmp::Ordering::Equal => Winner::Tie,
        }
    }
}

/// Flip a row or column index to the opposite side of the board. `None`
/// for an index off the board.
pub const fn mirror(coordinate: u8) -> Option<u8> {
    (BOARD_SIZE as u8 - 1).checked_sub(coordinate)
}

/// Cell player 1 scores when they chose `p1_column` and player 2 assigned
/// them `p2_row` (in player 2's orientation).
pub fn player1_cell(board: &Board, p1_column: u8, p2_row: u8) -> Option<u8> {
    if !in_board_range(p1_column) {
        return None;
    }
    Some(board.cell(mirror(p2_row)? as usize, p1_column as usize))
}

/// Cell player 2 scores when they chose `p2_column` (in their orientation)
/// and player 1 assigned them `p1_row`.
pub fn player2_cell(board: &Board, p2_column: u8, p1_row: u8) -> Option<u8> {
    if !in_board_range(p1_row) {
        return None;
    }
    Some(board.cell(mirror(p2_column)? as usize, p1_row as usize))
}

/// Scores over the three move pairs. Returns `None` if either list holds
/// fewer than six entries or an entry is off the board. Any reveal entry is
/// ignored: the reveal never changes the score.
pub fn compute_scores(board: &Board, p1_moves: &MoveList, p2_moves: &MoveList) -> Option<Scores> {
    let mut scores = Scores {
        player1: 0,
        player2: 0,
    };
    for i in 0..MOVES_PER_ROUND {
        let p1_column = p1_moves.chosen_column(i)?;
        let p1_row = p1_moves.assigned_row(i)?;
        let p2_column = p2_moves.chosen_column(i)?;
        let p2_row = p2_moves.assigned_row(i)?;
        scores.player1 += u32::from(player1_cell(board, p1_column, p2_row)?);
        scores.player2 += u32::from(player2_cell(board, p2_column, p1_row)?);
    }
    Some(scores)
}

/// Winner of a completed round. Both lists must include the reveal.
pub fn determine_winner(board: &Board, p1_moves: &MoveList, p2_moves: &MoveList) -> Option<Winner> {
    if p1_moves.len() != REVEALED_MOVE_LIST_LEN || p2_moves.len() != REVEALED_MOVE_LIST_LEN {
        return None;
    }
    compute_scores(board, p1_moves, p2_moves).map(|scores| scores.winner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_board() -> Board {
        Board::from_cells(&(1..=36).collect::<Vec<u8>>()).unwrap()
    }

    #[test]
    fn test_mirror() {
        assert_eq!(mirror(0), Some(5));
        assert_eq!(mirror(5), Some(0));
        assert_eq!(mirror(2), Some(3));
        for c in 0..6 {
            assert_eq!(mirror(c).and_then(mirror), Some(c));
        }
    }

    #[test]
    fn test_off_board_coordinates() {
        let board = sorted_board();
        assert_eq!(mirror(6), None);
        assert_eq!(mirror(u8::MAX), None);
        assert_eq!(player1_cell(&board, 6, 0), None);
        assert_eq!(player1_cell(&board, 0, 6), None);
        assert_eq!(player2_cell(&board, 6, 0), None);
        assert_eq!(player2_cell(&board, 0, 6), None);
    }

    #[test]
    fn test_cells_for_worked_example_moves() {
        // Player 1 plays (0, 0), player 2 plays (5, 5).
        let board = sorted_board();
        // Player 1: row mirror(5) = 0, column 0.
        assert_eq!(player1_cell(&board, 0, 5), Some(board.cell(0, 0)));
        // Player 2: row mirror(5) = 0, column 0 (player 1's assigned row).
        assert_eq!(player2_cell(&board, 5, 0), Some(board.cell(0, 0)));
    }

    #[test]
    fn test_mirror_is_applied_to_player2_only() {
        let board = sorted_board();
        // Player 1 chose column 2; player 2 assigned row 1 -> board row 4.
        assert_eq!(player1_cell(&board, 2, 1), Some(board.cell(4, 2)));
        // Player 2 chose column 1 -> board row 4; player 1 assigned row 3 -> column 3.
        assert_eq!(player2_cell(&board, 1, 3), Some(board.cell(4, 3)));
    }

    #[test]
    fn test_compute_scores() {
        let board = sorted_board();
        let p1 = MoveList::from(vec![0, 0, 1, 1, 2, 2]);
        let p2 = MoveList::from(vec![5, 5, 4, 4, 3, 3]);
        let scores = compute_scores(&board, &p1, &p2).unwrap();
        // Player 1: (0,0)=1, (1,1)=8, (2,2)=15.
        assert_eq!(scores.player1, 1 + 8 + 15);
        // Player 2: (0,0)=1, (1,1)=8, (2,2)=15.
        assert_eq!(scores.player2, 1 + 8 + 15);
        assert_eq!(scores.winner(), Winner::Tie);
    }

    #[test]
    fn test_reveal_does_not_change_scores() {
        let board = sorted_board();
        let p1 = MoveList::from(vec![5, 0, 4, 1, 3, 2]);
        let p2 = MoveList::from(vec![0, 0, 0, 0, 0, 0]);
        let without = compute_scores(&board, &p1, &p2).unwrap();

        let p1_revealed = MoveList::from(vec![5, 0, 4, 1, 3, 2, 3]);
        let p2_revealed = MoveList::from(vec![0, 0, 0, 0, 0, 0, 0]);
        let with = compute_scores(&board, &p1_revealed, &p2_revealed).unwrap();
        assert_eq!(without, with);
    }

    #[test]
    fn test_determine_winner() {
        let board = sorted_board();
        // Player 2 assigns row 0 -> player 1 lands on board row 5 (31..=36).
        let p1 = MoveList::from(vec![5, 0, 5, 0, 5, 0, 5]);
        // Player 1 assigns row 0 -> player 2 lands in column 0.
        let p2 = MoveList::from(vec![5, 0, 5, 0, 5, 0, 5]);
        // Player 1: 36 * 3; player 2: board(0, 0) * 3 = 3.
        assert_eq!(determine_winner(&board, &p1, &p2), Some(Winner::Player1));
        assert_eq!(determine_winner(&board, &p2, &p1), Some(Winner::Player1));

        let p2 = MoveList::from(vec![0, 5, 0, 5, 0, 5, 0]);
        // Player 1: board(0, 5) * 3 = 18; player 2: board(5, 0) * 3 = 93.
        assert_eq!(determine_winner(&board, &p1, &p2), Some(Winner::Player2));
    }

    #[test]
    fn test_incomplete_lists() {
        let board = sorted_board();
        let full = MoveList::from(vec![0, 0, 0, 0, 0, 0, 0]);
        let short = MoveList::from(vec![0, 0, 0, 0]);
        assert_eq!(compute_scores(&board, &full, &short), None);
        assert_eq!(determine_winner(&board, &full, &short), None);
        // Six moves score, but a winner needs the reveal.
        let six = MoveList::from(vec![0, 0, 0, 0, 0, 0]);
        assert!(compute_scores(&board, &six, &six).is_some());
        assert_eq!(determine_winner(&board, &six, &six), None);
    }

    #[test]
    fn test_out_of_range_entries() {
        let board = sorted_board();
        let bad = MoveList::from(vec![6, 0, 0, 0, 0, 0, 0]);
        let good = MoveList::from(vec![0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(compute_scores(&board, &bad, &good), None);
    }
}
