//! Phase coordinator - per-player turn state
//!
//! Each player alternates independently between the tetromino phase and the chess
//! phase; there is no global turn order. Any terminal tetromino outcome moves the
//! player to chess, a completed chess move moves them back.

use serde::Serialize;

use crate::config::GameConfig;
use crate::rng::TetrominoBag;
use crate::scoring::Stats;
use crate::tetromino::Tetromino;
use crate::types::{Facing, Phase, PieceId, PlayerId, TetrominoKind};

/// Timer-driven work due for a player after a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueWork {
    /// The automatic spawn delay elapsed
    pub spawn: bool,
    /// The turn time limit elapsed
    pub timed_out: bool,
}

/// Everything the session tracks for one player
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: PlayerId,
    pub facing: Facing,
    /// Colour id used for this player's chess pieces
    pub color: u8,
    pub phase: Phase,
    /// Time spent in the current phase
    pub phase_elapsed_ms: u32,
    /// Remaining delay before the automatic spawn, when one is pending
    pub spawn_timer_ms: Option<u32>,
    pub active: Option<Tetromino>,
    pub hold: Option<TetrominoKind>,
    pub can_hold: bool,
    pub bag: TetrominoBag,
    pub selected: Option<PieceId>,
    pub stats: Stats,
    /// Opposing pieces this player has captured
    pub captured: Vec<PieceId>,
    pub eliminated: bool,
}

impl PlayerState {
    /// New player in the tetromino phase with a spawn pending
    pub fn new(id: PlayerId, facing: Facing, color: u8, config: &GameConfig) -> Self {
        Self {
            id,
            facing,
            color,
            phase: Phase::Tetromino,
            phase_elapsed_ms: 0,
            spawn_timer_ms: Some(config.tetromino_spawn_interval_ms),
            active: None,
            hold: None,
            can_hold: true,
            bag: TetrominoBag::for_player(config.seed, id),
            selected: None,
            stats: Stats::default(),
            captured: Vec::new(),
            eliminated: false,
        }
    }

    /// Switch to `phase`, resetting the turn timer and selection.
    ///
    /// Entering the tetromino phase without a falling piece arms the spawn timer.
    /// Returns false when the player already was in `phase`.
    pub fn enter_phase(&mut self, phase: Phase, config: &GameConfig) -> bool {
        let changed = self.phase != phase;
        self.phase = phase;
        self.phase_elapsed_ms = 0;
        self.selected = None;
        self.spawn_timer_ms = match phase {
            Phase::Tetromino if self.active.is_none() => Some(config.tetromino_spawn_interval_ms),
            _ => None,
        };
        changed
    }

    /// Advance this player's timers by `elapsed_ms`
    pub fn tick_timers(&mut self, elapsed_ms: u32, config: &GameConfig) -> DueWork {
        let mut due = DueWork::default();
        if self.eliminated {
            return due;
        }

        self.phase_elapsed_ms = self.phase_elapsed_ms.saturating_add(elapsed_ms);
        if let Some(limit) = config.turn_time_limit_ms {
            if self.phase_elapsed_ms >= limit {
                due.timed_out = true;
                return due;
            }
        }

        if self.phase == Phase::Tetromino && self.active.is_none() {
            if let Some(remaining) = self.spawn_timer_ms {
                let remaining = remaining.saturating_sub(elapsed_ms);
                self.spawn_timer_ms = Some(remaining);
                due.spawn = remaining == 0;
            }
        }
        due
    }

    /// Kind the next spawn will draw
    pub fn next_kind(&self) -> TetrominoKind {
        self.bag.peek()
    }
}

/// Serializable view of a player
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub phase: Phase,
    pub facing: Facing,
    pub color: u8,
    pub active: Option<Tetromino>,
    pub hold: Option<TetrominoKind>,
    pub can_hold: bool,
    pub next: TetrominoKind,
    pub selected: Option<PieceId>,
    pub score: u32,
    pub lines: u32,
    pub level: u32,
    pub captured: Vec<PieceId>,
    pub eliminated: bool,
}

impl From<&PlayerState> for PlayerSnapshot {
    fn from(p: &PlayerState) -> Self {
        Self {
            id: p.id,
            phase: p.phase,
            facing: p.facing,
            color: p.color,
            active: p.active,
            hold: p.hold,
            can_hold: p.can_hold,
            next: p.next_kind(),
            selected: p.selected,
            score: p.stats.score,
            lines: p.stats.lines,
            level: p.stats.level,
            captured: p.captured.clone(),
            eliminated: p.eliminated,
        }
    }
}
