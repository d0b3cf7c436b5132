//! Deterministic random-number port.
//!
//! A xorshift32 generator with a fixed default seed: identical inputs
//! produce identical runs, which the execution model requires. Hosts that
//! want varied sequences seed it explicitly.

use std::ops::RangeInclusive;

use super::PortDevice;

/// Port number claimed by the random source.
pub const RNG_PORT: u16 = 0x02;

const DEFAULT_SEED: u32 = 0x2545_F491;

/// Pseudo-random number source readable through `IN`.
#[derive(Debug, Clone)]
pub struct RandomSource {
    state: u32,
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource {
    /// Creates a source with the fixed default seed.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: DEFAULT_SEED,
        }
    }

    /// Creates a source with an explicit non-zero seed; zero falls back
    /// to the default (xorshift has a fixed point at zero).
    #[must_use]
    pub const fn with_seed(seed: u32) -> Self {
        Self {
            state: if seed == 0 { DEFAULT_SEED } else { seed },
        }
    }

    fn next_value(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

impl PortDevice for RandomSource {
    fn name(&self) -> &'static str {
        "rng"
    }

    fn ports(&self) -> RangeInclusive<u16> {
        RNG_PORT..=RNG_PORT
    }

    fn input(&mut self, _port: u16) -> u32 {
        self.next_value()
    }
}
