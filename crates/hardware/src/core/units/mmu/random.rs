//! Replacement randomness for `tlbfill`.
//!
//! `tlbfill` lets hardware pick the victim slot. The choice is drawn from an
//! injected `RandomSource` so tests can script it; the default source is a
//! xorshift64 generator, which is cheap and never returns a stuck sequence.

/// Source of victim indices for random replacement.
pub trait RandomSource: Send {
    /// Returns a value uniformly distributed in `0..bound`.
    ///
    /// `bound` is never zero.
    fn next_below(&mut self, bound: usize) -> usize;
}

/// Xorshift64 generator.
#[derive(Clone, Debug)]
pub struct XorShiftRandom {
    state: u64,
}

impl XorShiftRandom {
    /// Creates a generator from a seed; a zero seed is replaced since xorshift would stick at 0.
    pub const fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl RandomSource for XorShiftRandom {
    fn next_below(&mut self, bound: usize) -> usize {
        // Upper bits of xorshift64 are better distributed than the low ones.
        ((u128::from(self.next_u64()) * bound as u128) >> 64) as usize
    }
}
