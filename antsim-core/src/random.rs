//! Per-object deterministic random stream.
//!
//! Every simulated object carries its own [`Random`]; decisions about one
//! object never consume draws from another. The world keeps one more stream
//! that seeds newly created objects.

use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

const MULTIPLIER: i32 = 1_664_525;
const INCREMENT: i32 = 1_013_904_223;

/// Linear congruential stream producing bounded integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Random {
    pub seed: i32,
}

impl Random {
    pub const fn new(seed: i32) -> Self {
        Self { seed }
    }

    #[inline]
    fn advance(&mut self) -> i32 {
        self.seed = self.seed.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        (self.seed >> 16) & 0x7fff
    }

    /// Uniform-ish integer in `[0, bound)`. A non-positive bound yields 0
    /// without advancing the stream.
    #[inline]
    pub fn next(&mut self, bound: i32) -> i32 {
        if bound <= 0 {
            return 0;
        }
        ((self.advance() as i64 * bound as i64) >> 15) as i32
    }

    /// Integer in `[-bound, bound)`, used for symmetric jitter.
    #[inline]
    pub fn next_signed(&mut self, bound: i32) -> i32 {
        self.next(bound.saturating_mul(2)) - bound
    }
}

impl RngCore for Random {
    fn next_u32(&mut self) -> u32 {
        let hi = self.advance() as u32;
        let lo = self.advance() as u32;
        (hi << 17) ^ (lo << 2) ^ (hi >> 13)
    }

    fn next_u64(&mut self) -> u64 {
        ((self.next_u32() as u64) << 32) | self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Random {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(i32::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new((state ^ (state >> 32)) as i32)
    }
}
