//! Tetromino engine - spawning, movement, rotation, gravity and landing checks
//!
//! A falling tetromino occupies a fixed footprint on the 2D board and hovers at a
//! `height` above it. Gravity only lowers the height; horizontal moves (`dx`, `dz`)
//! shift the footprint. The board is touched only when the piece lands.

use arrayvec::ArrayVec;
use serde::Serialize;

use crate::board::Board;
use crate::connectivity::{reaches_king, touches_structure, Overlay};
use crate::pieces::{self, ShapeMatrix};
use crate::types::{
    Cell, Coord, Facing, PlayerId, RotateDirection, Rotation, TetrominoId, TetrominoKind,
};

/// Why a tetromino was discarded instead of attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisintegrationReason {
    /// Footprint overlaps existing content or a home zone
    Collision,
    /// Footprint touches no existing structure
    NotAdjacent,
    /// No path from the footprint to the owner's king
    NoKingPath,
    /// Spawn position was already blocked
    SpawnBlocked,
    /// Turn time limit ran out while falling
    Timeout,
    /// Owner was eliminated while the piece was falling
    Eliminated,
    /// Attachment would have broken a board invariant
    Rejected,
}

impl DisintegrationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisintegrationReason::Collision => "collision",
            DisintegrationReason::NotAdjacent => "not_adjacent",
            DisintegrationReason::NoKingPath => "no_king_path",
            DisintegrationReason::SpawnBlocked => "spawn_blocked",
            DisintegrationReason::Timeout => "timeout",
            DisintegrationReason::Eliminated => "eliminated",
            DisintegrationReason::Rejected => "rejected",
        }
    }
}

/// Terminal outcome of a falling tetromino
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Landing {
    Attached { cells: ArrayVec<Coord, 4> },
    Disintegrated { reason: DisintegrationReason },
}

impl Landing {
    pub fn is_attached(&self) -> bool {
        matches!(self, Landing::Attached { .. })
    }
}

/// Active falling piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tetromino {
    pub id: TetrominoId,
    pub kind: TetrominoKind,
    pub owner: PlayerId,
    #[serde(skip)]
    pub shape: ShapeMatrix,
    pub rotation: Rotation,
    /// Column of the shape matrix origin
    pub x: i32,
    /// Row of the shape matrix origin
    pub y: i32,
    pub height: u8,
    /// Time accumulated towards the next one-unit drop
    pub fall_timer_ms: u32,
}

impl Tetromino {
    /// Create an unrotated tetromino with its matrix origin at (x, y)
    pub fn new(
        id: TetrominoId,
        kind: TetrominoKind,
        owner: PlayerId,
        (x, y): (i32, i32),
        height: u8,
    ) -> Self {
        Self {
            id,
            kind,
            owner,
            shape: ShapeMatrix::spawn(kind),
            rotation: Rotation::R0,
            x,
            y,
            height,
            fall_timer_ms: 0,
        }
    }

    /// Board cells of the footprint
    pub fn cells(&self) -> ArrayVec<Coord, 4> {
        self.cells_at(self.x, self.y)
    }

    fn cells_at(&self, x: i32, y: i32) -> ArrayVec<Coord, 4> {
        self.shape
            .offsets()
            .map(|(dx, dy)| Coord::new(x + dx, y + dy))
            .collect()
    }

    /// Cell written to the board for each mino
    pub fn block(&self) -> Cell {
        Cell::TetrominoBlock {
            owner: self.owner,
            kind: self.kind,
            color: self.kind.color_id(),
        }
    }

    /// Height including the progress towards the next drop, for smooth previews
    pub fn visual_height(&self, interval_ms: u32) -> f32 {
        if self.height == 0 || interval_ms == 0 {
            return self.height as f32;
        }
        let fraction = (self.fall_timer_ms as f32 / interval_ms as f32).min(1.0);
        self.height as f32 - fraction
    }

    /// Advance gravity by `elapsed_ms`. Returns true once the piece is at height 0.
    pub fn advance(&mut self, elapsed_ms: u32, interval_ms: u32) -> bool {
        let interval_ms = interval_ms.max(1);
        self.fall_timer_ms = self.fall_timer_ms.saturating_add(elapsed_ms);
        while self.height > 0 && self.fall_timer_ms >= interval_ms {
            self.fall_timer_ms -= interval_ms;
            self.height -= 1;
        }
        if self.height == 0 {
            self.fall_timer_ms = 0;
        }
        self.height == 0
    }
}

/// A single board cell may hold a falling mino
pub fn is_free(board: &Board, x: i32, y: i32) -> bool {
    board.is_vacant(x, y) && !board.in_active_zone(Coord::new(x, y))
}

/// Any footprint cell is out of bounds, occupied or inside an active home zone
pub fn collides(board: &Board, cells: &[Coord]) -> bool {
    cells.iter().any(|c| !is_free(board, c.x, c.y))
}

/// Matrix origin for a fresh `shape` owned by `owner`.
///
/// The footprint is centred on the owner's home zone and placed in the row band
/// directly in front of it, towards the middle of the board.
pub fn spawn_origin(board: &Board, owner: PlayerId, facing: Facing, shape: &ShapeMatrix) -> (i32, i32) {
    let (col_min, col_max) = shape.col_span();
    let (row_min, row_max) = shape.row_span();
    let span = col_max - col_min + 1;

    let Some(zone) = board.home_zone_of(owner) else {
        let x = (board.width() as i32 - span) / 2 - col_min;
        let y = board.height() as i32 / 2 - row_min;
        return (x, y);
    };

    // Centred on the zone, but never hanging over the board edge.
    let x = (zone.rect.x + (zone.rect.width - span) / 2 - col_min)
        .min(board.width() as i32 - 1 - col_max)
        .max(-col_min);
    let y = match facing {
        Facing::North => zone.rect.top() - 1 - row_max,
        Facing::South => zone.rect.bottom() + 1 - row_min,
    };
    (x, y)
}

/// Shift the footprint by (dx, dz), one cell at a time along x and then along z.
/// `None` as soon as an intermediate or final position collides.
pub fn try_shift(board: &Board, piece: &Tetromino, dx: i32, dz: i32) -> Option<Tetromino> {
    let (mut x, mut y) = (piece.x, piece.y);
    let steps = (0..dx.unsigned_abs())
        .map(|_| (dx.signum(), 0))
        .chain((0..dz.unsigned_abs()).map(|_| (0, dz.signum())));
    for (sx, sy) in steps {
        x += sx;
        y += sy;
        if collides(board, &piece.cells_at(x, y)) {
            return None;
        }
    }
    Some(Tetromino { x, y, ..*piece })
}

/// Rotate in place with wall kicks. `None` when every kick collides.
pub fn try_rotate(board: &Board, piece: &Tetromino, direction: RotateDirection) -> Option<Tetromino> {
    let (shape, (kx, ky)) = pieces::try_rotate(&piece.shape, piece.x, piece.y, direction, |x, y| {
        is_free(board, x, y)
    })?;
    let rotation = match direction {
        RotateDirection::Clockwise => piece.rotation.rotate_cw(),
        RotateDirection::CounterClockwise => piece.rotation.rotate_ccw(),
    };
    Some(Tetromino {
        shape,
        rotation,
        x: piece.x + kx,
        y: piece.y + ky,
        ..*piece
    })
}

/// Attachment test for a piece that reached the board.
///
/// Returns the footprint when the piece may be written, otherwise why it
/// disintegrates. Collision is checked first, then adjacency, then the king path.
pub fn check_attachment(
    board: &Board,
    piece: &Tetromino,
    king: Option<Coord>,
) -> Result<ArrayVec<Coord, 4>, DisintegrationReason> {
    let cells = piece.cells();
    if collides(board, &cells) {
        return Err(DisintegrationReason::Collision);
    }
    if !touches_structure(board, &cells) {
        return Err(DisintegrationReason::NotAdjacent);
    }

    let block = piece.block();
    let extra: ArrayVec<(Coord, Cell), 4> = cells.iter().map(|&c| (c, block)).collect();
    let view = Overlay::new(board, &extra);
    if !reaches_king(&view, &cells, piece.owner, king) {
        return Err(DisintegrationReason::NoKingPath);
    }
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{HomeZone, Rect};

    /// 10x20 board, zone for player 1 on cols 1..=8 rows 18..=19, king at (4, 19)
    fn setup() -> (Board, Coord) {
        let mut board = Board::new(10, 20);
        board.add_home_zone(HomeZone::new(1, Rect::new(1, 18, 8, 2)));
        let king = Coord::new(4, 19);
        board.set_at(
            king,
            Cell::ChessPieceMarker {
                piece_id: 1,
                owner: 1,
            },
        );
        (board, king)
    }

    fn spawn(board: &Board, kind: TetrominoKind) -> Tetromino {
        let shape = ShapeMatrix::spawn(kind);
        let origin = spawn_origin(board, 1, Facing::North, &shape);
        Tetromino::new(1, kind, 1, origin, 8)
    }

    #[test]
    fn test_spawn_sits_in_front_of_zone() {
        let (board, _) = setup();
        for kind in TetrominoKind::ALL {
            let piece = spawn(&board, kind);
            let cells = piece.cells();
            assert_eq!(cells.len(), 4);
            assert_eq!(cells.iter().map(|c| c.y).max(), Some(17), "{:?}", kind);
            assert!(!collides(&board, &cells), "{:?}", kind);
        }
    }

    #[test]
    fn test_spawn_centred_on_zone() {
        let (board, _) = setup();
        let piece = spawn(&board, TetrominoKind::O);
        let xs: Vec<i32> = piece.cells().iter().map(|c| c.x).collect();
        assert_eq!(xs.iter().min(), Some(&4));
        assert_eq!(xs.iter().max(), Some(&5));
    }

    #[test]
    fn test_south_facing_spawn_below_zone() {
        let mut board = Board::new(10, 20);
        board.add_home_zone(HomeZone::new(2, Rect::new(1, 0, 8, 2)));
        let shape = ShapeMatrix::spawn(TetrominoKind::T);
        let origin = spawn_origin(&board, 2, Facing::South, &shape);
        let piece = Tetromino::new(1, TetrominoKind::T, 2, origin, 8);
        assert_eq!(piece.cells().iter().map(|c| c.y).min(), Some(2));
    }

    #[test]
    fn test_shift_blocked_by_zone_and_walls() {
        let (board, _) = setup();
        let piece = spawn(&board, TetrominoKind::O);
        // Moving towards the zone collides.
        assert!(try_shift(&board, &piece, 0, 1).is_none());
        let moved = try_shift(&board, &piece, 0, -3).unwrap();
        assert_eq!(moved.y, piece.y - 3);
        assert!(try_shift(&board, &piece, -10, -3).is_none());
    }

    #[test]
    fn test_shift_cannot_pass_through_a_wall() {
        let (mut board, _) = setup();
        let piece = spawn(&board, TetrominoKind::O);
        let wall = Cell::TetrominoBlock {
            owner: 2,
            kind: TetrominoKind::I,
            color: 1,
        };
        for y in 0..18 {
            board.set(6, y, wall);
        }
        assert!(try_shift(&board, &piece, 3, 0).is_none());
        assert!(try_shift(&board, &piece, 1, 0).is_none());

        // The far side is free, it just cannot be reached.
        let beyond = Tetromino { x: piece.x + 3, ..piece };
        assert!(!collides(&board, &beyond.cells()));

        let left = try_shift(&board, &piece, -2, 0).unwrap();
        assert_eq!(left.x, piece.x - 2);
    }

    #[test]
    fn test_spawn_stays_on_board_next_to_narrow_edge_zones() {
        for zone in [Rect::new(0, 18, 2, 2), Rect::new(8, 18, 2, 2)] {
            let mut board = Board::new(10, 20);
            board.add_home_zone(HomeZone::new(1, zone));
            for kind in TetrominoKind::ALL {
                let piece = spawn(&board, kind);
                let cells = piece.cells();
                assert!(
                    cells.iter().all(|c| board.in_bounds(c.x, c.y)),
                    "{:?} next to {:?}: {:?}",
                    kind,
                    zone,
                    cells
                );
                assert!(!collides(&board, &cells), "{:?}", kind);
                assert_eq!(cells.iter().map(|c| c.y).max(), Some(17));
            }
        }
    }

    #[test]
    fn test_four_rotations_restore_position() {
        let (board, _) = setup();
        let piece = try_shift(&board, &spawn(&board, TetrominoKind::T), 0, -5).unwrap();
        let mut rotated = piece;
        for _ in 0..4 {
            rotated = try_rotate(&board, &rotated, RotateDirection::Clockwise).unwrap();
        }
        assert_eq!(rotated.cells(), piece.cells());
        assert_eq!(rotated.rotation, Rotation::R0);
    }

    #[test]
    fn test_advance_counts_down_height() {
        let (board, _) = setup();
        let mut piece = spawn(&board, TetrominoKind::I);
        assert!(!piece.advance(999, 1000));
        assert_eq!(piece.height, 8);
        assert!((piece.visual_height(1000) - 7.001).abs() < 1e-3);
        assert!(!piece.advance(1, 1000));
        assert_eq!(piece.height, 7);
        assert!(piece.advance(7000, 1000));
        assert_eq!(piece.height, 0);
    }

    #[test]
    fn test_attaches_in_front_of_zone() {
        let (board, king) = setup();
        let piece = spawn(&board, TetrominoKind::T);
        let cells = check_attachment(&board, &piece, Some(king)).unwrap();
        assert_eq!(cells.len(), 4);
    }

    #[test]
    fn test_isolated_piece_disintegrates() {
        let (board, king) = setup();
        let piece = try_shift(&board, &spawn(&board, TetrominoKind::T), 0, -8).unwrap();
        assert_eq!(
            check_attachment(&board, &piece, Some(king)),
            Err(DisintegrationReason::NotAdjacent)
        );
    }

    #[test]
    fn test_foreign_structure_gives_no_king_path() {
        let (mut board, king) = setup();
        let foreign = Cell::TetrominoBlock {
            owner: 2,
            kind: TetrominoKind::I,
            color: 1,
        };
        board.set(4, 5, foreign);
        let piece = try_shift(&board, &spawn(&board, TetrominoKind::O), 0, -10).unwrap();
        // O occupies rows 6..=7, touching the foreign block at (4, 5).
        assert_eq!(piece.cells().iter().map(|c| c.y).min(), Some(6));
        assert_eq!(
            check_attachment(&board, &piece, Some(king)),
            Err(DisintegrationReason::NoKingPath)
        );
    }

    #[test]
    fn test_missing_king_disintegrates() {
        let (board, _) = setup();
        let piece = spawn(&board, TetrominoKind::T);
        assert_eq!(
            check_attachment(&board, &piece, None),
            Err(DisintegrationReason::NoKingPath)
        );
    }

    #[test]
    fn test_occupied_footprint_collides() {
        let (mut board, king) = setup();
        let piece = spawn(&board, TetrominoKind::O);
        board.set_at(piece.cells()[0], Cell::TetrominoBlock {
            owner: 2,
            kind: TetrominoKind::O,
            color: 2,
        });
        assert_eq!(
            check_attachment(&board, &piece, Some(king)),
            Err(DisintegrationReason::Collision)
        );
    }
}
