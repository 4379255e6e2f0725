//! Randomised delays for retry backoff and keepalive pacing

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::DelayRange;

/// Odd 64-bit constant used to spread per-session seeds apart
const SEED_SPREAD: u64 = 0x9E37_79B9_7F4A_7C15;

/// Per-session jitter source
///
/// Each session task owns one, so draws never contend and a seeded run
/// produces the same delays for the same session index.
#[derive(Debug, Clone)]
pub struct Jitter {
    rng: StdRng,
}

impl Jitter {
    /// Deterministic generator from `seed`
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generator for session `index`, deterministic when `seed` is set
    pub fn for_session(seed: Option<u64>, index: usize) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed ^ (index as u64).wrapping_mul(SEED_SPREAD)),
            None => Self::from_entropy(),
        }
    }

    /// Draw a delay uniformly from the inclusive `range`
    pub fn sample(&mut self, range: &DelayRange) -> Duration {
        if range.min_ms >= range.max_ms {
            return range.min();
        }
        Duration::from_millis(self.rng.gen_range(range.min_ms..=range.max_ms))
    }
}
