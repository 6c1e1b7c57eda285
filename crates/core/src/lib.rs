//! Core rule engine - pure, deterministic, and testable
//!
//! Tetromino gravity and collision, board connectivity, row clearing, chess move
//! legality and the per-player phase state machine, all on one shared board.
//! Nothing in this crate performs I/O or spawns tasks; time only advances when
//! the host calls [`GameSession::tick`] (or `tick_player`).
//!
//! # Module Structure
//!
//! - [`board`]: the shared grid and the home zone registry
//! - [`pieces`]: tetromino shape matrices and wall-kick rotation
//! - [`tetromino`]: spawning, movement, gravity and the attachment check
//! - [`connectivity`]: adjacency, king-path and orphan searches
//! - [`row_clear`]: threshold row clearing that spares home zones
//! - [`chess`]: chess piece records and move legality
//! - [`phase`]: per-player phase state and timers
//! - [`session`]: the [`GameSession`] aggregate tying everything together
//! - [`rng`]: seeded per-player 7-bag
//! - [`scoring`]: row clear points, levels and fall speed
//!
//! # Example
//!
//! ```
//! use shaktris_core::{GameConfig, GameSession, Landing};
//! use shaktris_core::types::{Phase, TetrominoKind};
//!
//! let mut session = GameSession::new(GameConfig::default()).unwrap();
//! session.join_player(1).unwrap();
//! session.join_player(2).unwrap();
//!
//! // A piece dropped straight from its spawn position rests on the home zone.
//! session.spawn_tetromino_kind(1, TetrominoKind::T).unwrap();
//! let landing = session.hard_drop(1).unwrap();
//! assert!(matches!(landing, Landing::Attached { .. }));
//! assert_eq!(session.player(1).unwrap().phase, Phase::Chess);
//! ```

pub mod board;
pub mod chess;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod events;
pub mod phase;
pub mod pieces;
pub mod rng;
pub mod row_clear;
pub mod scoring;
pub mod session;
pub mod snapshot;
pub mod tetromino;

pub use shaktris_types as types;

// Re-export commonly used types for convenience
pub use board::{Board, HomeZone, Rect};
pub use chess::ChessPiece;
pub use config::{ConfigError, GameConfig};
pub use error::{InvariantViolation, RejectReason, SessionError};
pub use events::{GameEvent, GameOverReason};
pub use phase::{PlayerSnapshot, PlayerState};
pub use session::{CommandOutcome, GameSession};
pub use snapshot::{BoardSnapshot, CellSnapshot, SessionSnapshot};
pub use tetromino::{DisintegrationReason, Landing, Tetromino};
