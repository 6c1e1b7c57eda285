//! Protocol module - line-delimited JSON messages
//!
//! Every inbound line names the acting player, an optional `seq` echoed in the
//! reply, and a `type` selecting the command. Outbound lines are replies, game
//! events and session snapshots, all tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::core::{CommandOutcome, GameEvent, RejectReason, SessionSnapshot};
use crate::types::{GameCommand, PlayerId, RotateDirection};

// ============== Client -> Host Messages ==============

/// One parsed inbound line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    pub player: PlayerId,
    #[serde(default)]
    pub seq: u64,
    #[serde(flatten)]
    pub command: ClientCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Take the next free seat with the standard army
    Join,
    /// Ask for a full session snapshot
    Snapshot,
    SpawnTetromino,
    MoveTetromino {
        #[serde(default)]
        dx: i32,
        #[serde(default)]
        dz: i32,
    },
    RotateTetromino {
        direction: RotateDirection,
    },
    HardDrop,
    HoldTetromino,
    SelectChessPiece {
        x: i32,
        y: i32,
    },
    MoveChessPiece {
        x: i32,
        y: i32,
    },
}

impl ClientCommand {
    /// The engine command, or `None` for host-level requests
    pub fn game_command(self) -> Option<GameCommand> {
        let command = match self {
            ClientCommand::Join | ClientCommand::Snapshot => return None,
            ClientCommand::SpawnTetromino => GameCommand::SpawnTetromino,
            ClientCommand::MoveTetromino { dx, dz } => GameCommand::MoveTetromino { dx, dz },
            ClientCommand::RotateTetromino { direction } => GameCommand::RotateTetromino(direction),
            ClientCommand::HardDrop => GameCommand::HardDrop,
            ClientCommand::HoldTetromino => GameCommand::HoldTetromino,
            ClientCommand::SelectChessPiece { x, y } => GameCommand::SelectChessPiece { x, y },
            ClientCommand::MoveChessPiece { x, y } => GameCommand::MoveChessPiece { x, y },
        };
        Some(command)
    }
}

// ============== Host -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    /// The line is not valid JSON or names an unknown command
    #[serde(rename = "invalid_message")]
    InvalidMessage,
    /// Seat assignment or army placement failed
    #[serde(rename = "join_failed")]
    JoinFailed,
    /// The engine rejected the command; `reason` carries the detail
    #[serde(rename = "rejected")]
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    pub message: String,
}

/// Reply to one inbound line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerId>,
    pub seq: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CommandOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Reply(ReplyMessage),
    Event { event: GameEvent },
    Snapshot(SessionSnapshot),
}

impl OutboundMessage {
    /// Encode as one line (without the trailing newline)
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============== Message Parsing ==============

/// Parse a JSON line
pub fn parse_message(json: &str) -> Result<InboundMessage, serde_json::Error> {
    serde_json::from_str(json)
}

/// Pull `seq` out of a line that failed to parse so the error can still be matched
pub fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

// ============== Utility Functions ==============

pub fn create_ok(player: PlayerId, seq: u64, outcome: Option<CommandOutcome>) -> ReplyMessage {
    ReplyMessage {
        player: Some(player),
        seq,
        ok: true,
        outcome,
        error: None,
    }
}

pub fn create_rejected(player: PlayerId, seq: u64, reason: RejectReason) -> ReplyMessage {
    ReplyMessage {
        player: Some(player),
        seq,
        ok: false,
        outcome: None,
        error: Some(ErrorBody {
            code: ErrorCode::Rejected,
            reason: Some(reason),
            message: reason.to_string(),
        }),
    }
}

pub fn create_error(
    player: Option<PlayerId>,
    seq: u64,
    code: ErrorCode,
    message: &str,
) -> ReplyMessage {
    ReplyMessage {
        player,
        seq,
        ok: false,
        outcome: None,
        error: Some(ErrorBody {
            code,
            reason: None,
            message: message.to_string(),
        }),
    }
}
