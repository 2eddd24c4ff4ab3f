//! Magic square board and its generator.
//!
//! Boards are 6×6 permutations of 1..=36 where every row, every column, and
//! both main diagonals sum to [`MAGIC_SUM`]. [`generate`] finds one with a
//! tabu local search driven by a seeded Mulberry32 generator, so the same
//! seed always yields the same board.
//!
//! ## Search outline
//!
//! 1. Shuffle 1..=36 (Fisher–Yates).
//! 2. Pick the non-tabu cell with the largest error (the summed deviation of
//!    every line through it) and try swapping it with every other non-tabu
//!    cell, keeping the swap that most reduces total deviation.
//! 3. If nothing strictly improves, the cell becomes tabu for
//!    [`TABU_TENURE`] iterations. Tabu cells are periodically released at
//!    random.
//! 4. After [`MAX_STALE_ITERATIONS`] fruitless iterations the board is
//!    scrambled with [`SCRAMBLE_SWAPS`] random swaps, and after
//!    [`MAX_SCRAMBLES`] scrambles the search restarts from a new permutation.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::constants::{BOARD_CELLS, BOARD_SIZE, MAGIC_SUM};

/// Iterations a cell stays excluded after failing to improve.
pub const TABU_TENURE: u64 = 2 * BOARD_SIZE as u64;

/// How often (in iterations) tabu cells get a chance to be released.
pub const TABU_DECAY_INTERVAL: u64 = 6;

/// Chance, in percent, that a tabu cell is released on a decay pass.
pub const TABU_RESET_PERCENT: u32 = 10;

/// Consecutive non-improving iterations before the board is scrambled.
pub const MAX_STALE_ITERATIONS: u32 = 12;

/// Random pairwise swaps applied by a scramble.
pub const SCRAMBLE_SWAPS: usize = 35;

/// Scrambles tolerated before restarting from a fresh permutation.
pub const MAX_SCRAMBLES: u32 = 25;

#[derive(Debug, Eq, Error, PartialEq)]
pub enum BoardError {
    #[error("board needs {BOARD_CELLS} cells, got {0}")]
    WrongLength(usize),
    #[error("cell value {0} is outside 1..={BOARD_CELLS}")]
    ValueOutOfRange(u8),
    #[error("cell value {0} appears more than once")]
    DuplicateValue(u8),
}

/// An immutable 6×6 board stored row-major.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Board {
    cells: [u8; BOARD_CELLS],
}

impl Board {
    /// Build a board from row-major values. The values must be a
    /// permutation of 1..=36; magic sums are not required here, see
    /// [`is_valid`].
    pub fn from_cells(values: &[u8]) -> Result<Self, BoardError> {
        if values.len() != BOARD_CELLS {
            return Err(BoardError::WrongLength(values.len()));
        }
        let mut seen = [false; BOARD_CELLS];
        let mut cells = [0u8; BOARD_CELLS];
        for (slot, &value) in cells.iter_mut().zip(values) {
            if value == 0 || value as usize > BOARD_CELLS {
                return Err(BoardError::ValueOutOfRange(value));
            }
            let idx = value as usize - 1;
            if seen[idx] {
                return Err(BoardError::DuplicateValue(value));
            }
            seen[idx] = true;
            *slot = value;
        }
        Ok(Self { cells })
    }

    /// Value at `row`, `col`. Both must be below [`BOARD_SIZE`].
    pub fn cell(&self, row: usize, col: usize) -> u8 {
        self.cells[row * BOARD_SIZE + col]
    }

    pub fn cells(&self) -> &[u8; BOARD_CELLS] {
        &self.cells
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.cells[row * BOARD_SIZE..(row + 1) * BOARD_SIZE]
    }
}

impl TryFrom<Vec<u8>> for Board {
    type Error = BoardError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_cells(&value)
    }
}

impl From<Board> for Vec<u8> {
    fn from(value: Board) -> Self {
        value.cells.to_vec()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..BOARD_SIZE {
            let repr = self
                .row(row)
                .iter()
                .map(|v| format!("{v:>3}"))
                .collect::<String>();
            writeln!(f, "{repr}")?;
        }
        Ok(())
    }
}

/// Total absolute distance of all 14 lines from [`MAGIC_SUM`].
pub fn deviation(board: &Board) -> u32 {
    LineSums::new(&board.cells).deviation()
}

/// Whether every row, column and main diagonal hits [`MAGIC_SUM`].
pub fn is_valid(board: &Board) -> bool {
    deviation(board) == 0
}

/// Mulberry32: a tiny 32-bit mixing generator. Reproducible across
/// platforms, which is all the board search needs.
#[derive(Clone, Debug)]
struct BoardRng {
    state: u32,
}

impl BoardRng {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform-ish integer in `0..bound`.
    fn below(&mut self, bound: usize) -> usize {
        (self.next_u32() % bound as u32) as usize
    }
}

/// Running sums of every line, so a candidate swap is scored without
/// re-adding the whole board.
#[derive(Clone, Copy, Debug)]
struct LineSums {
    rows: [i32; BOARD_SIZE],
    cols: [i32; BOARD_SIZE],
    diagonal: i32,
    anti_diagonal: i32,
}

impl LineSums {
    fn new(cells: &[u8; BOARD_CELLS]) -> Self {
        let mut sums = Self {
            rows: [0; BOARD_SIZE],
            cols: [0; BOARD_SIZE],
            diagonal: 0,
            anti_diagonal: 0,
        };
        for (idx, &value) in cells.iter().enumerate() {
            sums.add(idx, i32::from(value));
        }
        sums
    }

    fn add(&mut self, idx: usize, delta: i32) {
        let (row, col) = (idx / BOARD_SIZE, idx % BOARD_SIZE);
        self.rows[row] += delta;
        self.cols[col] += delta;
        if row == col {
            self.diagonal += delta;
        }
        if row + col == BOARD_SIZE - 1 {
            self.anti_diagonal += delta;
        }
    }

    /// Sums after exchanging the values at `a` and `b`.
    fn swapped(&self, cells: &[u8; BOARD_CELLS], a: usize, b: usize) -> Self {
        let delta = i32::from(cells[b]) - i32::from(cells[a]);
        let mut next = *self;
        next.add(a, delta);
        next.add(b, -delta);
        next
    }

    fn deviation(&self) -> u32 {
        self.rows
            .iter()
            .copied()
            .chain(self.cols.iter().copied())
            .chain([self.diagonal, self.anti_diagonal])
            .map(line_error)
            .sum()
    }

    fn cell_error(&self, idx: usize) -> u32 {
        let (row, col) = (idx / BOARD_SIZE, idx % BOARD_SIZE);
        let mut error = line_error(self.rows[row]) + line_error(self.cols[col]);
        if row == col {
            error += line_error(self.diagonal);
        }
        if row + col == BOARD_SIZE - 1 {
            error += line_error(self.anti_diagonal);
        }
        error
    }
}

fn line_error(sum: i32) -> u32 {
    sum.abs_diff(MAGIC_SUM as i32)
}

fn shuffled(rng: &mut BoardRng) -> [u8; BOARD_CELLS] {
    let mut cells = [0u8; BOARD_CELLS];
    for (idx, cell) in cells.iter_mut().enumerate() {
        *cell = idx as u8 + 1;
    }
    for i in (1..BOARD_CELLS).rev() {
        let j = rng.below(i + 1);
        cells.swap(i, j);
    }
    cells
}

/// Tabu search state for one generation run.
struct Search {
    rng: BoardRng,
    cells: [u8; BOARD_CELLS],
    sums: LineSums,
    deviation: u32,
    /// Iteration until which each cell is excluded from selection.
    tabu_until: [u64; BOARD_CELLS],
    iteration: u64,
    stale: u32,
    scrambles: u32,
    restarts: u32,
}

impl Search {
    fn new(seed: u32) -> Self {
        let mut rng = BoardRng::new(seed);
        let cells = shuffled(&mut rng);
        let sums = LineSums::new(&cells);
        Self {
            rng,
            cells,
            sums,
            deviation: sums.deviation(),
            tabu_until: [0; BOARD_CELLS],
            iteration: 0,
            stale: 0,
            scrambles: 0,
            restarts: 0,
        }
    }

    fn run(mut self) -> Board {
        while self.deviation > 0 {
            self.step();
        }
        debug!(
            "board search converged after {} iterations ({} scrambles, {} restarts)",
            self.iteration, self.scrambles, self.restarts
        );
        Board { cells: self.cells }
    }

    fn step(&mut self) {
        self.iteration += 1;

        let mut candidates: Vec<usize> = (0..BOARD_CELLS)
            .filter(|&idx| self.tabu_until[idx] <= self.iteration)
            .collect();
        if candidates.is_empty() {
            self.tabu_until = [0; BOARD_CELLS];
            candidates = (0..BOARD_CELLS).collect();
        }

        // First cell with the largest error wins ties.
        let mut target = candidates[0];
        let mut target_error = self.sums.cell_error(target);
        for &idx in &candidates[1..] {
            let error = self.sums.cell_error(idx);
            if error > target_error {
                target = idx;
                target_error = error;
            }
        }

        let mut best = self.deviation;
        let mut best_partner = None;
        for &partner in &candidates {
            if partner == target {
                continue;
            }
            let trial = self.sums.swapped(&self.cells, target, partner).deviation();
            if trial < best {
                best = trial;
                best_partner = Some(partner);
            }
        }

        match best_partner {
            Some(partner) => {
                self.sums = self.sums.swapped(&self.cells, target, partner);
                self.cells.swap(target, partner);
                self.deviation = best;
                self.stale = 0;
            }
            None => {
                self.tabu_until[target] = self.iteration + TABU_TENURE;
                self.stale += 1;
            }
        }

        if self.iteration % TABU_DECAY_INTERVAL == 0 {
            self.decay_tabu();
        }

        if self.stale >= MAX_STALE_ITERATIONS {
            self.escalate();
        }
    }

    fn decay_tabu(&mut self) {
        for idx in 0..BOARD_CELLS {
            if self.tabu_until[idx] > self.iteration
                && (self.rng.below(100) as u32) < TABU_RESET_PERCENT
            {
                self.tabu_until[idx] = 0;
            }
        }
    }

    /// Scramble, or restart once scrambles stop paying off.
    fn escalate(&mut self) {
        self.scrambles += 1;
        self.stale = 0;
        self.tabu_until = [0; BOARD_CELLS];

        if self.scrambles > MAX_SCRAMBLES {
            self.cells = shuffled(&mut self.rng);
            self.scrambles = 0;
            self.restarts += 1;
            trace!("board search restart #{}", self.restarts);
        } else {
            for _ in 0..SCRAMBLE_SWAPS {
                let a = self.rng.below(BOARD_CELLS);
                let b = self.rng.below(BOARD_CELLS);
                self.cells.swap(a, b);
            }
        }

        self.sums = LineSums::new(&self.cells);
        self.deviation = self.sums.deviation();
    }
}

/// Generate the magic square for `seed`. Deterministic and infallible.
pub fn generate(seed: u32) -> Board {
    Search::new(seed).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_magic(board: &Board) {
        for i in 0..BOARD_SIZE {
            let row: u32 = (0..BOARD_SIZE).map(|c| u32::from(board.cell(i, c))).sum();
            let col: u32 = (0..BOARD_SIZE).map(|r| u32::from(board.cell(r, i))).sum();
            assert_eq!(row, MAGIC_SUM, "row {i} of\n{board}");
            assert_eq!(col, MAGIC_SUM, "column {i} of\n{board}");
        }
        let diagonal: u32 = (0..BOARD_SIZE).map(|i| u32::from(board.cell(i, i))).sum();
        let anti: u32 = (0..BOARD_SIZE)
            .map(|i| u32::from(board.cell(i, BOARD_SIZE - 1 - i)))
            .sum();
        assert_eq!(diagonal, MAGIC_SUM);
        assert_eq!(anti, MAGIC_SUM);
    }

    #[test]
    fn test_magic_sum_constant() {
        assert_eq!(MAGIC_SUM, 111);
    }

    #[test]
    fn test_generate_produces_magic_square() {
        for seed in [0, 1, 42, 12345] {
            let board = generate(seed);
            assert_magic(&board);
            assert!(is_valid(&board));
            assert_eq!(deviation(&board), 0);
        }
    }

    #[test]
    fn test_generate_is_permutation() {
        let board = generate(7);
        let mut values = board.cells().to_vec();
        values.sort_unstable();
        assert_eq!(values, (1..=36).collect::<Vec<u8>>());
    }

    #[test]
    fn test_generate_is_deterministic() {
        assert_eq!(generate(12345), generate(12345));
        assert_eq!(generate(u32::MAX), generate(u32::MAX));
    }

    #[test]
    fn test_distinct_seeds_give_distinct_boards() {
        assert_ne!(generate(1), generate(2));
    }

    #[test]
    fn test_deviation_of_sorted_board() {
        let board = Board::from_cells(&(1..=36).collect::<Vec<u8>>()).unwrap();
        // Rows of 1..=36 sum to 21, 57, 93, 129, 165, 201: deviation 90+54+18+18+54+90.
        // Columns sum to 96, 102, ..., 126: deviation 15+9+3+3+9+15.
        // Diagonals: 1+8+15+22+29+36 = 111 and 6+11+16+21+26+31 = 111.
        assert_eq!(deviation(&board), 324 + 54);
        assert!(!is_valid(&board));
    }

    #[test]
    fn test_from_cells_rejects_bad_input() {
        assert_eq!(
            Board::from_cells(&[1, 2, 3]),
            Err(BoardError::WrongLength(3))
        );

        let mut values: Vec<u8> = (1..=36).collect();
        values[0] = 0;
        assert_eq!(
            Board::from_cells(&values),
            Err(BoardError::ValueOutOfRange(0))
        );

        values[0] = 2;
        assert_eq!(
            Board::from_cells(&values),
            Err(BoardError::DuplicateValue(2))
        );
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let board = generate(99);
        let json = serde_json::to_string(&board).unwrap();
        let restored: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(board, restored);

        assert!(serde_json::from_str::<Board>("[1,2,3]").is_err());
    }

    #[test]
    fn test_rng_matches_reference_sequence() {
        // Mulberry32 seeded with 0 and 1.
        let mut rng = BoardRng::new(0);
        assert_eq!(rng.next_u32(), 1_144_304_738);
        let mut rng = BoardRng::new(1);
        assert_eq!(rng.next_u32(), 2_693_262_067);
    }

    #[test]
    fn test_line_sums_swap_matches_full_recompute() {
        let mut cells: [u8; BOARD_CELLS] = std::array::from_fn(|i| i as u8 + 1);
        let sums = LineSums::new(&cells);
        let swapped = sums.swapped(&cells, 0, 35);
        cells.swap(0, 35);
        assert_eq!(swapped.deviation(), LineSums::new(&cells).deviation());
    }
}
