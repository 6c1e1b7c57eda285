//! Pieces module - Tetromino shape matrices and rotation with wall kicks
//!
//! Shapes live in a square bounding box (I: 4x4, O: 2x2, others: 3x3) and rotate
//! by transposing the matrix, so four quarter turns always restore the original.

use serde::Serialize;

use crate::types::{RotateDirection, TetrominoKind};

/// Offset of a single mino relative to the piece origin (dx, dy)
pub type MinoOffset = (i32, i32);

/// Square shape matrix of up to 4x4 cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ShapeMatrix {
    size: u8,
    rows: [[bool; 4]; 4],
}

impl ShapeMatrix {
    fn from_rows(size: u8, pattern: &[&str]) -> Self {
        let mut rows = [[false; 4]; 4];
        for (y, line) in pattern.iter().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                rows[y][x] = ch == '#';
            }
        }
        Self { size, rows }
    }

    /// Unrotated shape for a kind
    pub fn spawn(kind: TetrominoKind) -> Self {
        match kind {
            TetrominoKind::I => Self::from_rows(4, &["....", "####", "....", "...."]),
            TetrominoKind::O => Self::from_rows(2, &["##", "##"]),
            TetrominoKind::T => Self::from_rows(3, &[".#.", "###", "..."]),
            TetrominoKind::S => Self::from_rows(3, &[".##", "##.", "..."]),
            TetrominoKind::Z => Self::from_rows(3, &["##.", ".##", "..."]),
            TetrominoKind::J => Self::from_rows(3, &["#..", "###", "..."]),
            TetrominoKind::L => Self::from_rows(3, &["..#", "###", "..."]),
        }
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn is_filled(&self, dx: i32, dy: i32) -> bool {
        if dx < 0 || dy < 0 || dx >= self.size as i32 || dy >= self.size as i32 {
            return false;
        }
        self.rows[dy as usize][dx as usize]
    }

    /// Offsets of the filled cells, row-major
    pub fn offsets(&self) -> impl Iterator<Item = MinoOffset> + '_ {
        let n = self.size as i32;
        (0..n).flat_map(move |dy| {
            (0..n)
                .filter(move |&dx| self.rows[dy as usize][dx as usize])
                .map(move |dx| (dx, dy))
        })
    }

    /// Lowest and highest filled row offsets
    pub fn row_span(&self) -> (i32, i32) {
        let mut min = i32::MAX;
        let mut max = i32::MIN;
        for (_, dy) in self.offsets() {
            min = min.min(dy);
            max = max.max(dy);
        }
        (min, max)
    }

    /// Leftmost and rightmost filled column offsets
    pub fn col_span(&self) -> (i32, i32) {
        let mut min = i32::MAX;
        let mut max = i32::MIN;
        for (dx, _) in self.offsets() {
            min = min.min(dx);
            max = max.max(dx);
        }
        (min, max)
    }

    /// Quarter turn clockwise: new[r][c] = old[n-1-c][r]
    pub fn rotated_cw(&self) -> Self {
        let n = self.size as usize;
        let mut rows = [[false; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate().take(n) {
            for (c, cell) in row.iter_mut().enumerate().take(n) {
                *cell = self.rows[n - 1 - c][r];
            }
        }
        Self {
            size: self.size,
            rows,
        }
    }

    /// Quarter turn counter-clockwise: new[r][c] = old[c][n-1-r]
    pub fn rotated_ccw(&self) -> Self {
        let n = self.size as usize;
        let mut rows = [[false; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate().take(n) {
            for (c, cell) in row.iter_mut().enumerate().take(n) {
                *cell = self.rows[c][n - 1 - r];
            }
        }
        Self {
            size: self.size,
            rows,
        }
    }

    pub fn rotated(&self, direction: RotateDirection) -> Self {
        match direction {
            RotateDirection::Clockwise => self.rotated_cw(),
            RotateDirection::CounterClockwise => self.rotated_ccw(),
        }
    }

    /// Rows as strings (`#` filled, `.` empty), for debugging and tests
    pub fn to_rows(&self) -> Vec<String> {
        let n = self.size as usize;
        self.rows[..n]
            .iter()
            .map(|row| row[..n].iter().map(|&f| if f { '#' } else { '.' }).collect())
            .collect()
    }
}

/// Offsets tried in order when a rotation collides.
///
/// Unkicked first, then left, right, up, two left, two right, two up,
/// left+up, right+up. "Up" is towards row 0.
pub const WALL_KICKS: [(i32, i32); 9] = [
    (0, 0),
    (-1, 0),
    (1, 0),
    (0, -1),
    (-2, 0),
    (2, 0),
    (0, -2),
    (-1, -1),
    (1, -1),
];

/// Try to rotate a shape positioned at (x, y) with wall kicks.
///
/// `is_free(x, y)` reports whether a single board cell may hold a mino.
/// Returns the rotated shape and the kick offset that was applied.
pub fn try_rotate(
    shape: &ShapeMatrix,
    x: i32,
    y: i32,
    direction: RotateDirection,
    is_free: impl Fn(i32, i32) -> bool,
) -> Option<(ShapeMatrix, (i32, i32))> {
    let rotated = shape.rotated(direction);

    WALL_KICKS.iter().copied().find_map(|(kx, ky)| {
        let fits = rotated
            .offsets()
            .all(|(dx, dy)| is_free(x + kx + dx, y + ky + dy));
        fits.then_some((rotated, (kx, ky)))
    })
}
