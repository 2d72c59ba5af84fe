//! RNG module - 7-bag random piece generation
//!
//! Implements the "7-bag" randomizer: each bag holds one of each piece kind,
//! shuffled with Fisher-Yates. Bags are drawn in full before the next one is
//! generated, and previewing extends the queue by whole bags so the alignment
//! never shifts.
//!
//! Randomness comes from a small LCG so that a seed fully determines a game.

use std::collections::VecDeque;

use arrayvec::ArrayVec;

use crate::types::PieceKind;

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // A zero state would stay degenerate for the first draw
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // High bits of an LCG are far better distributed than the low ones
        ((self.next_u32() as u64 * max as u64) >> 32) as u32
    }

    /// Shuffle a slice using Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    /// Current internal state (restarting from it replays the sequence)
    pub fn state(&self) -> u32 {
        self.state
    }
}

/// A freshly shuffled permutation of the seven kinds
pub fn generate_bag(rng: &mut SimpleRng) -> [PieceKind; 7] {
    let mut bag = PieceKind::ALL;
    rng.shuffle(&mut bag);
    bag
}

/// 7-bag piece generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceGenerator {
    queue: VecDeque<PieceKind>,
    rng: SimpleRng,
}

impl PieceGenerator {
    /// Create a generator whose first bag is already queued
    pub fn new(seed: u32) -> Self {
        let mut generator = Self {
            queue: VecDeque::with_capacity(14),
            rng: SimpleRng::new(seed),
        };
        generator.push_bag();
        generator
    }

    fn push_bag(&mut self) {
        let bag = generate_bag(&mut self.rng);
        self.queue.extend(bag);
    }

    /// Pop the next kind, refilling with a new bag first when empty
    pub fn next(&mut self) -> PieceKind {
        if self.queue.is_empty() {
            self.push_bag();
        }
        match self.queue.pop_front() {
            Some(kind) => kind,
            // push_bag always adds seven kinds
            None => PieceKind::I,
        }
    }

    /// The next `N` kinds without consuming them
    ///
    /// Takes `&mut self` because it may append whole bags to the queue.
    pub fn preview<const N: usize>(&mut self) -> ArrayVec<PieceKind, N> {
        while self.queue.len() < N {
            self.push_bag();
        }
        self.queue.iter().take(N).copied().collect()
    }

    /// Number of kinds already generated but not yet drawn
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl Default for PieceGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}
