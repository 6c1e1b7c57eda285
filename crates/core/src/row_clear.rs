//! Row clearing
//!
//! A row qualifies when it holds at least `threshold` non-empty cells outside
//! active home zones. Clearing removes those cells, then every remaining cell
//! outside an active zone falls by the number of cleared rows below it. Cells
//! inside active zones never move; a falling cell whose destination lies in an
//! active zone is crushed.

use crate::board::Board;
use crate::types::{Cell, Coord};

/// Result of a clear pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearResult {
    /// Cleared rows, bottom first
    pub rows: Vec<i32>,
    /// Cells destroyed because their shifted position was inside an active zone
    pub crushed: Vec<Coord>,
}

impl ClearResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rows that would clear right now, bottom first
pub fn qualifying_rows(board: &Board, threshold: u16) -> Vec<i32> {
    (0..board.height() as i32)
        .rev()
        .filter(|&y| board.counted_fill(y) >= threshold)
        .collect()
}

/// Clear every qualifying row. A board with no qualifying row is left untouched.
pub fn clear_rows(board: &mut Board, threshold: u16) -> ClearResult {
    let rows = qualifying_rows(board, threshold);
    if rows.is_empty() {
        return ClearResult::default();
    }

    let width = board.width() as usize;
    let height = board.height() as i32;
    let mut next = vec![Cell::Empty; board.cells().len()];
    let mut crushed = Vec::new();

    // Zone content stays where it is.
    for y in 0..height {
        for x in 0..width as i32 {
            let c = Coord::new(x, y);
            if board.in_active_zone(c) {
                next[y as usize * width + x as usize] = board.get_at(c);
            }
        }
    }

    for y in 0..height {
        if rows.contains(&y) {
            continue;
        }
        let shift = rows.iter().filter(|&&r| r > y).count() as i32;
        for x in 0..width as i32 {
            let from = Coord::new(x, y);
            let cell = board.get_at(from);
            if cell.is_empty() || board.in_active_zone(from) {
                continue;
            }
            let to = Coord::new(x, y + shift);
            if board.in_active_zone(to) {
                crushed.push(to);
                continue;
            }
            next[to.y as usize * width + x as usize] = cell;
        }
    }

    board.replace_cells(next);
    ClearResult { rows, crushed }
}
