//! Outbound game events
//!
//! Events are appended while a command or tick is processed and drained by the
//! host afterwards. They serialize as JSON objects tagged by `type`.

use serde::Serialize;

use crate::tetromino::DisintegrationReason;
use crate::types::{ChessPieceKind, Coord, Phase, PieceId, PlayerId, TetrominoId, TetrominoKind};

/// Why a player left the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// The king was captured by an opposing piece
    KingCaptured,
    /// The king was destroyed by a row clear
    KingLost,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum GameEvent {
    TetrominoSpawned {
        owner_id: PlayerId,
        tetromino_id: TetrominoId,
        kind: TetrominoKind,
        cells: Vec<Coord>,
        height: u8,
    },
    TetrominoHeld {
        owner_id: PlayerId,
        held: TetrominoKind,
    },
    TetrominoAttached {
        owner_id: PlayerId,
        tetromino_id: TetrominoId,
        kind: TetrominoKind,
        attachment_points: Vec<Coord>,
    },
    TetrominoDisintegrated {
        owner_id: PlayerId,
        tetromino_id: TetrominoId,
        reason: DisintegrationReason,
    },
    RowsCleared {
        owner_id: PlayerId,
        rows: Vec<i32>,
        score_delta: u32,
        score: u32,
        lines: u32,
        level: u32,
    },
    StructureCollapsed {
        owner_id: PlayerId,
        cells: Vec<Coord>,
    },
    ChessPieceSelected {
        owner_id: PlayerId,
        piece_id: PieceId,
        at: Coord,
    },
    ChessPieceMoved {
        owner_id: PlayerId,
        piece_id: PieceId,
        from: Coord,
        to: Coord,
        #[serde(skip_serializing_if = "Option::is_none")]
        captured_id: Option<PieceId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        promoted_to: Option<ChessPieceKind>,
    },
    /// A piece removed by a row clear or structure collapse
    ChessPieceLost {
        owner_id: PlayerId,
        piece_id: PieceId,
        at: Coord,
    },
    PhaseChanged {
        owner_id: PlayerId,
        new_phase: Phase,
    },
    GameOver {
        winner_id: Option<PlayerId>,
        loser_id: PlayerId,
        reason: GameOverReason,
    },
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::TetrominoSpawned { .. } => "tetromino_spawned",
            GameEvent::TetrominoHeld { .. } => "tetromino_held",
            GameEvent::TetrominoAttached { .. } => "tetromino_attached",
            GameEvent::TetrominoDisintegrated { .. } => "tetromino_disintegrated",
            GameEvent::RowsCleared { .. } => "rows_cleared",
            GameEvent::StructureCollapsed { .. } => "structure_collapsed",
            GameEvent::ChessPieceSelected { .. } => "chess_piece_selected",
            GameEvent::ChessPieceMoved { .. } => "chess_piece_moved",
            GameEvent::ChessPieceLost { .. } => "chess_piece_lost",
            GameEvent::PhaseChanged { .. } => "phase_changed",
            GameEvent::GameOver { .. } => "game_over",
        }
    }

    /// Player the event is about
    pub fn owner_id(&self) -> PlayerId {
        match *self {
            GameEvent::TetrominoSpawned { owner_id, .. }
            | GameEvent::TetrominoHeld { owner_id, .. }
            | GameEvent::TetrominoAttached { owner_id, .. }
            | GameEvent::TetrominoDisintegrated { owner_id, .. }
            | GameEvent::RowsCleared { owner_id, .. }
            | GameEvent::StructureCollapsed { owner_id, .. }
            | GameEvent::ChessPieceSelected { owner_id, .. }
            | GameEvent::ChessPieceMoved { owner_id, .. }
            | GameEvent::ChessPieceLost { owner_id, .. }
            | GameEvent::PhaseChanged { owner_id, .. } => owner_id,
            GameEvent::GameOver { loser_id, .. } => loser_id,
        }
    }
}
