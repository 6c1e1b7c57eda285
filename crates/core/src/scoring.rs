//! Scoring module - row clear points, levels and fall speed
//!
//! `score += BASE_POINTS[cleared] * level`, where clears of more than four rows
//! score as four. Levels start at 1 and go up every ten lines.

use serde::Serialize;

use crate::config::GameConfig;
use crate::types::{BASE_POINTS, LINES_PER_LEVEL};

/// Per-player score counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub score: u32,
    pub lines: u32,
    pub level: u32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            score: 0,
            lines: 0,
            level: 1,
        }
    }
}

impl Stats {
    /// Apply a clear of `rows` rows. Returns the score delta and whether the level changed.
    pub fn record_clear(&mut self, rows: usize) -> (u32, bool) {
        let delta = line_clear_points(rows, self.level);
        self.score = self.score.saturating_add(delta);
        self.lines = self.lines.saturating_add(rows as u32);
        let level = level_for_lines(self.lines);
        let changed = level != self.level;
        self.level = level;
        (delta, changed)
    }
}

/// Points for clearing `rows` rows at `level`
pub fn line_clear_points(rows: usize, level: u32) -> u32 {
    BASE_POINTS[rows.min(BASE_POINTS.len() - 1)].saturating_mul(level)
}

/// Level for a running line total
pub fn level_for_lines(total_lines: u32) -> u32 {
    total_lines / LINES_PER_LEVEL + 1
}

/// Milliseconds per height unit at `level`
pub fn fall_interval_ms(config: &GameConfig, level: u32) -> u32 {
    let level = level.max(1);
    let interval = match config.fall_speed_table.as_slice() {
        [] => config.base_fall_interval_ms / level,
        table => {
            let idx = (level as usize - 1).min(table.len() - 1);
            table[idx]
        }
    };
    interval.max(1)
}
