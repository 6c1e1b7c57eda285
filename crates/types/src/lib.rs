//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the engine.
//! All types are plain data with no game logic, making them usable in any
//! context (rule engine, async host, JSON protocol, renderers).
//!
//! # Board Dimensions
//!
//! The default shared board is 30x30:
//!
//! - **Width**: 30 columns (indexed 0-29, left to right)
//! - **Height**: 30 rows (indexed 0-29, top to bottom)
//! - **Home zones**: 8x2 rectangles, one per seat
//!
//! # Timing Constants
//!
//! Timing values are in milliseconds:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Fixed timestep interval (~60 FPS) |
//! | `BASE_FALL_INTERVAL_MS` | 1000 | One height unit per second at level 1 |
//! | `TETROMINO_SPAWN_INTERVAL_MS` | 0 | Delay before a phase entry spawns |
//!
//! # Examples
//!
//! ```
//! use shaktris_types::{Cell, ChessPieceKind, Rotation, TetrominoKind};
//!
//! let kind = TetrominoKind::from_str("t").unwrap();
//! assert_eq!(kind, TetrominoKind::T);
//!
//! assert_eq!(Rotation::R0.rotate_cw(), Rotation::R90);
//! assert_eq!(ChessPieceKind::from_str("Knight"), Some(ChessPieceKind::Knight));
//! assert!(Cell::Empty.is_empty());
//! ```

use serde::{Deserialize, Serialize};

/// Default board width in cells
pub const DEFAULT_BOARD_WIDTH: u16 = 30;

/// Default board height in cells
pub const DEFAULT_BOARD_HEIGHT: u16 = 30;

/// Default number of counted cells that makes a row clear
pub const DEFAULT_ROW_CLEAR_THRESHOLD: u16 = 8;

/// Default home zone size
pub const DEFAULT_HOME_ZONE_WIDTH: u16 = 8;
pub const DEFAULT_HOME_ZONE_HEIGHT: u16 = 2;

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Gravity interval at level 1
pub const BASE_FALL_INTERVAL_MS: u32 = 1000;

/// Delay between entering the tetromino phase and the automatic spawn
pub const TETROMINO_SPAWN_INTERVAL_MS: u32 = 0;

/// Height above the attachment plane at which tetrominoes spawn
pub const DEFAULT_SPAWN_HEIGHT: u8 = 8;

/// Points per cleared-row count, multiplied by the level
pub const BASE_POINTS: [u32; 5] = [0, 100, 300, 500, 800];

/// Lines needed per level step
pub const LINES_PER_LEVEL: u32 = 10;

pub type PlayerId = u32;
pub type PieceId = u32;
pub type TetrominoId = u32;

/// A board coordinate. `y` grows downwards; row 0 is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The eight surrounding coordinates (may be out of bounds).
    pub fn neighbours8(self) -> [Coord; 8] {
        [
            self.offset(-1, -1),
            self.offset(0, -1),
            self.offset(1, -1),
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(-1, 1),
            self.offset(0, 1),
            self.offset(1, 1),
        ]
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Tetromino kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TetrominoKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl TetrominoKind {
    pub const ALL: [TetrominoKind; 7] = [
        TetrominoKind::I,
        TetrominoKind::O,
        TetrominoKind::T,
        TetrominoKind::S,
        TetrominoKind::Z,
        TetrominoKind::J,
        TetrominoKind::L,
    ];

    /// Parse kind from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i" => Some(TetrominoKind::I),
            "o" => Some(TetrominoKind::O),
            "t" => Some(TetrominoKind::T),
            "s" => Some(TetrominoKind::S),
            "z" => Some(TetrominoKind::Z),
            "j" => Some(TetrominoKind::J),
            "l" => Some(TetrominoKind::L),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TetrominoKind::I => "I",
            TetrominoKind::O => "O",
            TetrominoKind::T => "T",
            TetrominoKind::S => "S",
            TetrominoKind::Z => "Z",
            TetrominoKind::J => "J",
            TetrominoKind::L => "L",
        }
    }

    /// Palette index used by renderers
    pub fn color_id(&self) -> u8 {
        match self {
            TetrominoKind::I => 1,
            TetrominoKind::O => 2,
            TetrominoKind::T => 3,
            TetrominoKind::S => 4,
            TetrominoKind::Z => 5,
            TetrominoKind::J => 6,
            TetrominoKind::L => 7,
        }
    }
}

/// Rotation index (R0 = spawn orientation), clockwise quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn rotate_cw(&self) -> Self {
        match self {
            Rotation::R0 => Rotation::R90,
            Rotation::R90 => Rotation::R180,
            Rotation::R180 => Rotation::R270,
            Rotation::R270 => Rotation::R0,
        }
    }

    pub fn rotate_ccw(&self) -> Self {
        match self {
            Rotation::R0 => Rotation::R270,
            Rotation::R270 => Rotation::R180,
            Rotation::R180 => Rotation::R90,
            Rotation::R90 => Rotation::R0,
        }
    }

    /// Numeric index in 0..=3
    pub fn index(&self) -> u8 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotateDirection {
    Clockwise,
    CounterClockwise,
}

impl RotateDirection {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cw" | "clockwise" | "right" => Some(RotateDirection::Clockwise),
            "ccw" | "counter_clockwise" | "counterclockwise" | "left" => {
                Some(RotateDirection::CounterClockwise)
            }
            _ => None,
        }
    }
}

/// Chess piece kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChessPieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

impl ChessPieceKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pawn" | "p" => Some(ChessPieceKind::Pawn),
            "rook" | "r" => Some(ChessPieceKind::Rook),
            "knight" | "n" => Some(ChessPieceKind::Knight),
            "bishop" | "b" => Some(ChessPieceKind::Bishop),
            "queen" | "q" => Some(ChessPieceKind::Queen),
            "king" | "k" => Some(ChessPieceKind::King),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChessPieceKind::Pawn => "pawn",
            ChessPieceKind::Rook => "rook",
            ChessPieceKind::Knight => "knight",
            ChessPieceKind::Bishop => "bishop",
            ChessPieceKind::Queen => "queen",
            ChessPieceKind::King => "king",
        }
    }
}

/// Direction a player's pawns advance in.
///
/// `North` pawns move towards row 0, `South` pawns towards the bottom row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    North,
    South,
}

impl Facing {
    /// Row delta of one forward step
    pub fn forward_dy(&self) -> i32 {
        match self {
            Facing::North => -1,
            Facing::South => 1,
        }
    }
}

/// Per-player turn phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Tetromino,
    Chess,
}

impl Phase {
    pub fn next(&self) -> Self {
        match self {
            Phase::Tetromino => Phase::Chess,
            Phase::Chess => Phase::Tetromino,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Tetromino => "TETROMINO",
            Phase::Chess => "CHESS",
        }
    }
}

/// Content of one board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cell {
    #[default]
    Empty,
    TetrominoBlock {
        owner: PlayerId,
        kind: TetrominoKind,
        color: u8,
    },
    ChessPieceMarker {
        piece_id: PieceId,
        owner: PlayerId,
    },
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Owner of the content, `None` for empty cells
    pub fn owner(&self) -> Option<PlayerId> {
        match *self {
            Cell::Empty => None,
            Cell::TetrominoBlock { owner, .. } | Cell::ChessPieceMarker { owner, .. } => {
                Some(owner)
            }
        }
    }

    pub fn piece_id(&self) -> Option<PieceId> {
        match *self {
            Cell::ChessPieceMarker { piece_id, .. } => Some(piece_id),
            _ => None,
        }
    }
}

/// Player commands consumed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    SpawnTetromino,
    MoveTetromino { dx: i32, dz: i32 },
    RotateTetromino(RotateDirection),
    HardDrop,
    HoldTetromino,
    SelectChessPiece { x: i32, y: i32 },
    MoveChessPiece { x: i32, y: i32 },
}

impl GameCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameCommand::SpawnTetromino => "spawnTetromino",
            GameCommand::MoveTetromino { .. } => "moveTetromino",
            GameCommand::RotateTetromino(_) => "rotateTetromino",
            GameCommand::HardDrop => "hardDrop",
            GameCommand::HoldTetromino => "holdTetromino",
            GameCommand::SelectChessPiece { .. } => "selectChessPiece",
            GameCommand::MoveChessPiece { .. } => "moveChessPiece",
        }
    }

    /// Phase in which the command is accepted
    pub fn phase(&self) -> Phase {
        match self {
            GameCommand::SelectChessPiece { .. } | GameCommand::MoveChessPiece { .. } => {
                Phase::Chess
            }
            _ => Phase::Tetromino,
        }
    }
}
