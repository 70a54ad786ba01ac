use std::cell::Cell;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};

/// A pseudo-random number generator based on Wang Yi's Wyrand.
///
/// See: https://github.com/wangyi-fudan/wyhash
#[derive(Clone, Debug)]
pub(crate) struct Rng {
    seed: Cell<u64>,
}

impl Rng {
    /// Creates a new RNG with the provided seed.
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            seed: Cell::new(seed),
        }
    }

    /// Creates a new RNG seeded from the process-wide hasher randomness.
    ///
    /// Two connector instances created back to back get unrelated seeds, so
    /// that a merger does not favour the same source on every run.
    pub(crate) fn from_entropy() -> Self {
        Self::new(RandomState::new().build_hasher().finish())
    }

    /// Generates a pseudo-random number within the range `0..2⁶⁴`.
    pub(crate) fn gen(&self) -> u64 {
        let seed = self.seed.get().wrapping_add(0xA0761D6478BD642F);
        self.seed.set(seed);
        let t = seed as u128 * (seed ^ 0xE7037ED1A0B428DB) as u128;
        (t as u64) ^ (t >> 64) as u64
    }

    /// Generates a pseudo-random index within the range `0..len`.
    ///
    /// This uses the fast (but slightly biased) multiply-shift method, which
    /// is more than good enough for picking among a handful of ports.
    pub(crate) fn gen_index(&self, len: usize) -> usize {
        ((self.gen() as u128 * len as u128) >> 64) as usize
    }
}
