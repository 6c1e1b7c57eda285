//! Board module - the shared grid and its home zones
//!
//! The board is a width x height grid where each cell is a tagged [`Cell`].
//! Uses a flat vector in row-major order for cache locality.
//! Coordinates: (x, y) where x grows to the right and y grows downwards.
//! Reads outside the grid return [`Cell::Empty`]; writes outside the grid are ignored.

use serde::{Deserialize, Serialize};

use crate::types::{Cell, Coord, PlayerId};

/// Axis-aligned rectangle in board coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, c: Coord) -> bool {
        c.x >= self.x && c.x < self.x + self.width && c.y >= self.y && c.y < self.y + self.height
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Top row index
    pub fn top(&self) -> i32 {
        self.y
    }

    /// Bottom row index (inclusive)
    pub fn bottom(&self) -> i32 {
        self.y + self.height - 1
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| Coord::new(x, y)))
    }
}

/// Protected per-player rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeZone {
    pub owner_id: PlayerId,
    pub rect: Rect,
    pub is_safe: bool,
    /// Session time (ms) of the owner's last action
    pub last_activity: u64,
}

impl HomeZone {
    pub fn new(owner_id: PlayerId, rect: Rect) -> Self {
        Self {
            owner_id,
            rect,
            is_safe: true,
            last_activity: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_safe
    }
}

/// The shared board store
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    width: u16,
    height: u16,
    /// Flat array of cells, row-major order (y * width + x)
    cells: Vec<Cell>,
    zones: Vec<HomeZone>,
}

impl Board {
    /// Create a new empty board
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; width as usize * height as usize],
            zones: Vec::new(),
        }
    }

    #[inline(always)]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some()
    }

    /// Get cell at (x, y); `Empty` when out of bounds
    pub fn get(&self, x: i32, y: i32) -> Cell {
        self.index(x, y)
            .map(|idx| self.cells[idx])
            .unwrap_or(Cell::Empty)
    }

    pub fn get_at(&self, c: Coord) -> Cell {
        self.get(c.x, c.y)
    }

    /// Set cell at (x, y). Returns false if out of bounds.
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        match self.index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    pub fn set_at(&mut self, c: Coord, cell: Cell) -> bool {
        self.set(c.x, c.y, cell)
    }

    /// In bounds and empty
    pub fn is_vacant(&self, x: i32, y: i32) -> bool {
        self.index(x, y)
            .map(|idx| self.cells[idx].is_empty())
            .unwrap_or(false)
    }

    /// In bounds and filled
    pub fn is_occupied(&self, x: i32, y: i32) -> bool {
        self.index(x, y)
            .map(|idx| !self.cells[idx].is_empty())
            .unwrap_or(false)
    }

    /// Occupied-cell count per row
    pub fn row_fill_counts(&self) -> Vec<u16> {
        self.cells
            .chunks(self.width as usize)
            .map(|row| row.iter().filter(|c| !c.is_empty()).count() as u16)
            .collect()
    }

    /// Occupied cells in row `y` that are not inside an active home zone
    pub fn counted_fill(&self, y: i32) -> u16 {
        (0..self.width as i32)
            .filter(|&x| {
                let c = Coord::new(x, y);
                !self.get_at(c).is_empty() && !self.in_active_zone(c)
            })
            .count() as u16
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Iterate `(coord, cell)` over every non-empty cell
    pub fn occupied(&self) -> impl Iterator<Item = (Coord, Cell)> + '_ {
        let width = self.width as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(move |(i, c)| (Coord::new((i % width) as i32, (i / width) as i32), *c))
    }

    /// Replace the whole grid (same dimensions)
    pub(crate) fn replace_cells(&mut self, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.cells.len());
        self.cells = cells;
    }

    /// Clear every cell (zones are kept)
    pub fn clear(&mut self) {
        self.cells.fill(Cell::Empty);
    }

    // ---- home zones ----

    pub fn home_zones(&self) -> &[HomeZone] {
        &self.zones
    }

    pub fn add_home_zone(&mut self, zone: HomeZone) {
        self.zones.push(zone);
    }

    pub fn home_zone_of(&self, owner: PlayerId) -> Option<&HomeZone> {
        self.zones.iter().find(|z| z.owner_id == owner)
    }

    pub fn home_zone_of_mut(&mut self, owner: PlayerId) -> Option<&mut HomeZone> {
        self.zones.iter_mut().find(|z| z.owner_id == owner)
    }

    /// Active zone containing `c`, if any
    pub fn active_zone_at(&self, c: Coord) -> Option<&HomeZone> {
        self.zones
            .iter()
            .find(|z| z.is_active() && z.rect.contains(c))
    }

    pub fn in_active_zone(&self, c: Coord) -> bool {
        self.active_zone_at(c).is_some()
    }

    /// `c` lies inside `owner`'s zone and that zone is active
    pub fn in_own_active_zone(&self, owner: PlayerId, c: Coord) -> bool {
        self.home_zone_of(owner)
            .map(|z| z.is_active() && z.rect.contains(c))
            .unwrap_or(false)
    }

    /// Build a board from ASCII rows for tests.
    ///
    /// `.` is empty, a digit `n` is a tetromino block owned by player `n`.
    #[cfg(test)]
    pub fn from_ascii(rows: &[&str]) -> Self {
        use crate::types::TetrominoKind;

        let height = rows.len() as u16;
        let width = rows.first().map(|r| r.len()).unwrap_or(0) as u16;
        let mut board = Board::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if let Some(owner) = ch.to_digit(10) {
                    board.set(
                        x as i32,
                        y as i32,
                        Cell::TetrominoBlock {
                            owner,
                            kind: TetrominoKind::O,
                            color: TetrominoKind::O.color_id(),
                        },
                    );
                }
            }
        }
        board
    }
}
