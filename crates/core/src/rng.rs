//! RNG module - seeded tetromino randomizer
//!
//! Each player draws from an independent 7-bag: every bag holds one of each
//! tetromino kind, shuffled, so no kind starves for long. Seeds are derived from
//! the session seed and the player id, which keeps whole sessions replayable.

use crate::types::{PlayerId, TetrominoKind};

/// Simple LCG (Numerical Recipes constants)
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    pub fn new(seed: u32) -> Self {
        // Zero would be a fixed point for some multipliers; keep it out.
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Value in [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        self.next_u32() % max
    }

    /// Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

/// Per-player 7-bag generator
#[derive(Debug, Clone)]
pub struct TetrominoBag {
    bag: [TetrominoKind; 7],
    index: usize,
    rng: SimpleRng,
}

impl TetrominoBag {
    pub fn new(seed: u32) -> Self {
        let mut bag = Self {
            bag: TetrominoKind::ALL,
            index: 0,
            rng: SimpleRng::new(seed),
        };
        bag.refill();
        bag
    }

    /// Bag for `player` within a session seeded with `session_seed`
    pub fn for_player(session_seed: u32, player: PlayerId) -> Self {
        Self::new(session_seed ^ player.wrapping_mul(0x9E37_79B9))
    }

    fn refill(&mut self) {
        self.bag = TetrominoKind::ALL;
        self.rng.shuffle(&mut self.bag);
        self.index = 0;
    }

    /// Next kind without consuming it.
    ///
    /// When the bag is exhausted the next bag is previewed with a copy of the RNG,
    /// so the preview always matches the following `draw`.
    pub fn peek(&self) -> TetrominoKind {
        if self.index < self.bag.len() {
            return self.bag[self.index];
        }
        let mut preview = SimpleRng::new(self.rng.state());
        let mut next = TetrominoKind::ALL;
        preview.shuffle(&mut next);
        next[0]
    }

    pub fn draw(&mut self) -> TetrominoKind {
        if self.index >= self.bag.len() {
            self.refill();
        }
        let kind = self.bag[self.index];
        self.index += 1;
        kind
    }
}
