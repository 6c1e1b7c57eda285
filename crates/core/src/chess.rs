//! Chess rules - piece records and move legality
//!
//! Legality here is purely geometric: piece movement patterns, path blocking and
//! what the destination may hold. Connectivity and capture side effects are
//! applied by the session.

use serde::Serialize;

use crate::board::{Board, Rect};
use crate::error::RejectReason;
use crate::types::{Cell, ChessPieceKind, Coord, Facing, PieceId, PlayerId};

/// A chess piece. Captured pieces stay in the registry with `captured_at` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChessPiece {
    pub id: PieceId,
    pub kind: ChessPieceKind,
    pub owner_id: PlayerId,
    pub position: Coord,
    pub has_moved: bool,
    /// Row the piece started on; pawns may double-step only from here
    pub start_row: i32,
    pub captured_at: Option<u64>,
}

impl ChessPiece {
    pub fn new(id: PieceId, kind: ChessPieceKind, owner_id: PlayerId, position: Coord) -> Self {
        Self {
            id,
            kind,
            owner_id,
            position,
            has_moved: false,
            start_row: position.y,
            captured_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.captured_at.is_none()
    }

    pub fn marker(&self) -> Cell {
        Cell::ChessPieceMarker {
            piece_id: self.id,
            owner: self.owner_id,
        }
    }
}

/// What a legal move does to its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Quiet,
    Capture(PieceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegalMove {
    pub kind: MoveKind,
    pub promotes_to: Option<ChessPieceKind>,
}

/// Row on which a pawn of `facing` promotes
pub fn promotion_row(board: &Board, facing: Facing) -> i32 {
    match facing {
        Facing::North => 0,
        Facing::South => board.height() as i32 - 1,
    }
}

/// Every intermediate cell between `from` and `to` (exclusive) is empty
fn path_clear(board: &Board, from: Coord, to: Coord) -> bool {
    let step_x = (to.x - from.x).signum();
    let step_y = (to.y - from.y).signum();
    let mut at = from.offset(step_x, step_y);
    while at != to {
        if !board.get_at(at).is_empty() {
            return false;
        }
        at = at.offset(step_x, step_y);
    }
    true
}

/// Validate moving `piece` to `to`.
///
/// The destination must be empty or hold an opposing chess piece. Tetromino
/// blocks are never capturable; landing on a friendly piece is reported as
/// `DestinationOccupied` (callers treat that as a re-selection first).
pub fn validate_move(
    board: &Board,
    piece: &ChessPiece,
    facing: Facing,
    to: Coord,
) -> Result<LegalMove, RejectReason> {
    if !board.in_bounds(to.x, to.y) {
        return Err(RejectReason::OutOfBounds);
    }
    let from = piece.position;
    if to == from {
        return Err(RejectReason::IllegalMove);
    }

    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let (adx, ady) = (dx.abs(), dy.abs());
    let target = board.get_at(to);
    let opposing = match target {
        Cell::ChessPieceMarker { piece_id, owner } if owner != piece.owner_id => Some(piece_id),
        _ => None,
    };

    match piece.kind {
        ChessPieceKind::Pawn => {
            let forward = facing.forward_dy();
            if dx == 0 && dy == forward {
                if !target.is_empty() {
                    return Err(RejectReason::IllegalMove);
                }
            } else if dx == 0 && dy == 2 * forward {
                if from.y != piece.start_row {
                    return Err(RejectReason::IllegalMove);
                }
                if !board.get_at(from.offset(0, forward)).is_empty() {
                    return Err(RejectReason::PathBlocked);
                }
                if !target.is_empty() {
                    return Err(RejectReason::IllegalMove);
                }
            } else if adx == 1 && dy == forward {
                if opposing.is_none() {
                    return Err(RejectReason::IllegalMove);
                }
            } else {
                return Err(RejectReason::IllegalMove);
            }
        }
        ChessPieceKind::Knight => {
            if !((adx == 1 && ady == 2) || (adx == 2 && ady == 1)) {
                return Err(RejectReason::IllegalMove);
            }
        }
        ChessPieceKind::King => {
            if adx.max(ady) != 1 {
                return Err(RejectReason::IllegalMove);
            }
        }
        ChessPieceKind::Rook | ChessPieceKind::Bishop | ChessPieceKind::Queen => {
            let straight = dx == 0 || dy == 0;
            let diagonal = adx == ady;
            let allowed = match piece.kind {
                ChessPieceKind::Rook => straight,
                ChessPieceKind::Bishop => diagonal,
                _ => straight || diagonal,
            };
            if !allowed {
                return Err(RejectReason::IllegalMove);
            }
            if !path_clear(board, from, to) {
                return Err(RejectReason::PathBlocked);
            }
        }
    }

    let kind = match (target, opposing) {
        (Cell::Empty, _) => MoveKind::Quiet,
        (_, Some(defender)) => MoveKind::Capture(defender),
        _ => return Err(RejectReason::DestinationOccupied),
    };

    let promotes_to = (piece.kind == ChessPieceKind::Pawn && to.y == promotion_row(board, facing))
        .then_some(ChessPieceKind::Knight);

    Ok(LegalMove { kind, promotes_to })
}

/// All squares `piece` could legally move to, row-major
pub fn legal_destinations(board: &Board, piece: &ChessPiece, facing: Facing) -> Vec<Coord> {
    let mut out = Vec::new();
    for y in 0..board.height() as i32 {
        for x in 0..board.width() as i32 {
            let to = Coord::new(x, y);
            if validate_move(board, piece, facing, to).is_ok() {
                out.push(to);
            }
        }
    }
    out
}

const BACK_RANK: [ChessPieceKind; 8] = [
    ChessPieceKind::Rook,
    ChessPieceKind::Knight,
    ChessPieceKind::Bishop,
    ChessPieceKind::Queen,
    ChessPieceKind::King,
    ChessPieceKind::Bishop,
    ChessPieceKind::Knight,
    ChessPieceKind::Rook,
];

/// Standard army inside `zone`.
///
/// The back rank sits on the zone edge facing away from the board centre with
/// pawns one row in front. Zones narrower than 8 columns or only one row deep
/// hold a lone king.
pub fn standard_army(zone: &Rect, facing: Facing) -> Vec<(ChessPieceKind, Coord)> {
    let back_row = match facing {
        Facing::North => zone.bottom(),
        Facing::South => zone.top(),
    };
    if zone.width < BACK_RANK.len() as i32 || zone.height < 2 {
        return vec![(ChessPieceKind::King, Coord::new(zone.x + zone.width / 2, back_row))];
    }

    let left = zone.x + (zone.width - BACK_RANK.len() as i32) / 2;
    let pawn_row = back_row + facing.forward_dy();
    let mut army = Vec::with_capacity(16);
    for (i, kind) in BACK_RANK.iter().enumerate() {
        army.push((*kind, Coord::new(left + i as i32, back_row)));
    }
    for i in 0..BACK_RANK.len() as i32 {
        army.push((ChessPieceKind::Pawn, Coord::new(left + i, pawn_row)));
    }
    army
}
