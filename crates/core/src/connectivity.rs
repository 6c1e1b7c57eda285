//! Connectivity validator - adjacency and king-path searches
//!
//! All searches are breadth-first over the 8 neighbours of a cell and visit each
//! cell at most once, so their cost is bounded by the board size.
//!
//! For an owner, a cell is *traversable* when it holds that owner's content
//! (tetromino block or chess marker) or lies inside that owner's active home zone.
//! A missing king never counts as reachable.

use std::collections::VecDeque;

use crate::board::Board;
use crate::types::{Cell, Coord, PlayerId};

/// Read access to a board, possibly with hypothetical cells layered on top
pub trait CellView {
    fn board(&self) -> &Board;

    fn cell(&self, c: Coord) -> Cell;
}

impl CellView for Board {
    fn board(&self) -> &Board {
        self
    }

    fn cell(&self, c: Coord) -> Cell {
        self.get_at(c)
    }
}

/// The live board plus not-yet-written cells
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a> {
    base: &'a Board,
    extra: &'a [(Coord, Cell)],
}

impl<'a> Overlay<'a> {
    pub fn new(base: &'a Board, extra: &'a [(Coord, Cell)]) -> Self {
        Self { base, extra }
    }
}

impl CellView for Overlay<'_> {
    fn board(&self) -> &Board {
        self.base
    }

    fn cell(&self, c: Coord) -> Cell {
        self.extra
            .iter()
            .find(|(at, _)| *at == c)
            .map(|(_, cell)| *cell)
            .unwrap_or_else(|| self.base.get_at(c))
    }
}

fn traversable(view: &impl CellView, owner: PlayerId, c: Coord) -> bool {
    let board = view.board();
    if !board.in_bounds(c.x, c.y) {
        return false;
    }
    view.cell(c).owner() == Some(owner) || board.in_own_active_zone(owner, c)
}

/// Adjacency-only test: some candidate touches an existing non-empty cell or an
/// active home zone. Candidates themselves do not count as existing structure.
pub fn touches_structure(board: &Board, candidates: &[Coord]) -> bool {
    candidates.iter().any(|c| {
        c.neighbours8().iter().any(|n| {
            !candidates.contains(n)
                && board.in_bounds(n.x, n.y)
                && (!board.get_at(*n).is_empty() || board.in_active_zone(*n))
        })
    })
}

/// King-path test: a search from `sources` over `owner`'s traversable cells reaches `king`.
pub fn reaches_king(
    view: &impl CellView,
    sources: &[Coord],
    owner: PlayerId,
    king: Option<Coord>,
) -> bool {
    let Some(king) = king else {
        return false;
    };
    let board = view.board();
    let width = board.width() as usize;
    let mut visited = vec![false; width * board.height() as usize];
    let mut queue = VecDeque::new();

    for &s in sources {
        if board.in_bounds(s.x, s.y) {
            let idx = s.y as usize * width + s.x as usize;
            if !visited[idx] {
                visited[idx] = true;
                queue.push_back(s);
            }
        }
    }

    while let Some(c) = queue.pop_front() {
        if c == king {
            return true;
        }
        for n in c.neighbours8() {
            if !traversable(view, owner, n) {
                continue;
            }
            let idx = n.y as usize * width + n.x as usize;
            if !visited[idx] {
                visited[idx] = true;
                queue.push_back(n);
            }
        }
    }
    false
}

/// Cells of `owner` that break the king-path invariant.
///
/// The search starts at the king; every owned cell it does not reach, that is not
/// the king and not inside any active home zone, is returned in row-major order.
pub fn orphaned_cells(view: &impl CellView, owner: PlayerId, king: Option<Coord>) -> Vec<Coord> {
    let board = view.board();
    let width = board.width() as usize;
    let height = board.height() as usize;
    let mut reached = vec![false; width * height];

    if let Some(king) = king.filter(|k| board.in_bounds(k.x, k.y)) {
        let mut queue = VecDeque::new();
        reached[king.y as usize * width + king.x as usize] = true;
        queue.push_back(king);
        while let Some(c) = queue.pop_front() {
            for n in c.neighbours8() {
                if !traversable(view, owner, n) {
                    continue;
                }
                let idx = n.y as usize * width + n.x as usize;
                if !reached[idx] {
                    reached[idx] = true;
                    queue.push_back(n);
                }
            }
        }
    }

    let mut orphans = Vec::new();
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let c = Coord::new(x, y);
            if view.cell(c).owner() != Some(owner) || Some(c) == king {
                continue;
            }
            if !reached[y as usize * width + x as usize] && !board.in_active_zone(c) {
                orphans.push(c);
            }
        }
    }
    orphans
}
