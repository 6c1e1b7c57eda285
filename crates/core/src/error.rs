//! Error and rejection types
//!
//! Rejections are local outcomes: the state is unchanged and the caller gets a
//! stable reason code. Only [`InvariantViolation`] is escalated to the session.

use serde::Serialize;

use crate::types::{Coord, PieceId, PlayerId};

/// Why a command had no effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[error("player is not part of this session")]
    UnknownPlayer,
    #[error("player has been eliminated")]
    Eliminated,
    #[error("the game is over")]
    GameOver,
    #[error("command not allowed in the current phase")]
    WrongPhase,
    #[error("a tetromino is already falling")]
    AlreadyFalling,
    #[error("no falling tetromino")]
    NoActiveTetromino,
    #[error("target position collides")]
    Collision,
    #[error("rotation blocked after all wall kicks")]
    RotationBlocked,
    #[error("hold already used for this tetromino")]
    HoldUnavailable,
    #[error("held tetromino cannot be placed")]
    HoldBlocked,
    #[error("coordinates are outside the board")]
    OutOfBounds,
    #[error("no chess piece selected")]
    NoSelection,
    #[error("square does not hold one of your pieces")]
    NotYourPiece,
    #[error("move is not legal for this piece")]
    IllegalMove,
    #[error("path to the destination is blocked")]
    PathBlocked,
    #[error("destination is occupied")]
    DestinationOccupied,
    #[error("move would disconnect your structure from your king")]
    WouldDisconnect,
    #[error("mutation rejected: board invariant violated")]
    InvariantViolation,
}

impl RejectReason {
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::UnknownPlayer => "unknown_player",
            RejectReason::Eliminated => "eliminated",
            RejectReason::GameOver => "game_over",
            RejectReason::WrongPhase => "wrong_phase",
            RejectReason::AlreadyFalling => "already_falling",
            RejectReason::NoActiveTetromino => "no_active_tetromino",
            RejectReason::Collision => "collision",
            RejectReason::RotationBlocked => "rotation_blocked",
            RejectReason::HoldUnavailable => "hold_unavailable",
            RejectReason::HoldBlocked => "hold_blocked",
            RejectReason::OutOfBounds => "out_of_bounds",
            RejectReason::NoSelection => "no_selection",
            RejectReason::NotYourPiece => "not_your_piece",
            RejectReason::IllegalMove => "illegal_move",
            RejectReason::PathBlocked => "path_blocked",
            RejectReason::DestinationOccupied => "destination_occupied",
            RejectReason::WouldDisconnect => "would_disconnect",
            RejectReason::InvariantViolation => "invariant_violation",
        }
    }
}

/// Board state that should never occur under correct sequencing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("cell {at} of player {owner} has no path to its king")]
    Disconnected { owner: PlayerId, at: Coord },

    #[error("player {owner} has {count} kings")]
    KingCount { owner: PlayerId, count: usize },

    #[error("marker at {at} references unknown piece {piece_id}")]
    DanglingMarker { piece_id: PieceId, at: Coord },

    #[error("piece {piece_id} is not at its recorded position {at}")]
    MisplacedPiece { piece_id: PieceId, at: Coord },

    #[error("tetromino block at {at} inside an active home zone")]
    BlockInHomeZone { at: Coord },
}

/// Setup errors raised while building a session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("player {0} already joined")]
    DuplicatePlayer(PlayerId),

    #[error("no free seat on this board")]
    NoSeatAvailable,

    #[error("home zone is outside the board")]
    ZoneOutOfBounds,

    #[error("home zone overlaps another player's zone")]
    ZoneOverlap,

    #[error("army must contain exactly one king, found {0}")]
    KingCount(usize),

    #[error("setup square {0} is outside the home zone or already taken")]
    BadSetupSquare(Coord),

    #[error("the game is already over")]
    Finished,

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_match_serde_names() {
        for reason in [
            RejectReason::WrongPhase,
            RejectReason::WouldDisconnect,
            RejectReason::InvariantViolation,
            RejectReason::HoldUnavailable,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.code()));
        }
    }

    #[test]
    fn test_violation_display() {
        let v = InvariantViolation::Disconnected {
            owner: 2,
            at: Coord::new(3, 4),
        };
        assert_eq!(v.to_string(), "cell (3, 4) of player 2 has no path to its king");
    }
}
