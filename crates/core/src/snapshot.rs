//! Read-only snapshots for renderers, persistence and the wire protocol
//!
//! Snapshots are plain owned data; they may be stale by the time they are read.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::board::{Board, HomeZone};
use crate::chess::ChessPiece;
use crate::phase::PlayerSnapshot;
use crate::types::{Cell, PieceId, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Tetromino,
    Chess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSnapshot {
    pub owner_id: PlayerId,
    pub kind: CellKind,
    /// Tetromino letter or chess piece kind
    pub subtype: String,
    pub color_id: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub width: u16,
    pub height: u16,
    /// Rows top to bottom; `None` for empty cells
    pub cells: Vec<Vec<Option<CellSnapshot>>>,
    pub home_zones: Vec<HomeZone>,
}

impl BoardSnapshot {
    /// `colors` maps owners to the colour id of their chess pieces
    pub fn capture(
        board: &Board,
        pieces: &BTreeMap<PieceId, ChessPiece>,
        colors: &BTreeMap<PlayerId, u8>,
    ) -> Self {
        let cells = board
            .cells()
            .chunks(board.width() as usize)
            .map(|row| {
                row.iter()
                    .map(|cell| match *cell {
                        Cell::Empty => None,
                        Cell::TetrominoBlock { owner, kind, color } => Some(CellSnapshot {
                            owner_id: owner,
                            kind: CellKind::Tetromino,
                            subtype: kind.as_str().to_string(),
                            color_id: color,
                        }),
                        Cell::ChessPieceMarker { piece_id, owner } => Some(CellSnapshot {
                            owner_id: owner,
                            kind: CellKind::Chess,
                            subtype: pieces
                                .get(&piece_id)
                                .map(|p| p.kind.as_str())
                                .unwrap_or("unknown")
                                .to_string(),
                            color_id: colors.get(&owner).copied().unwrap_or(0),
                        }),
                    })
                    .collect()
            })
            .collect();

        Self {
            width: board.width(),
            height: board.height(),
            cells,
            home_zones: board.home_zones().to_vec(),
        }
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&CellSnapshot> {
        if x < 0 || y < 0 {
            return None;
        }
        self.cells.get(y as usize)?.get(x as usize)?.as_ref()
    }
}

/// Whole-session view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub clock_ms: u64,
    pub board: BoardSnapshot,
    pub players: Vec<PlayerSnapshot>,
    pub pieces: Vec<ChessPiece>,
    pub winner_id: Option<PlayerId>,
    pub game_over: bool,
}
