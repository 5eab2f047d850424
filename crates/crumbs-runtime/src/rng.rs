//! Injectable randomness for upgrade rolls and restock sizes.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// The single source of randomness a [`Game`](crate::Game) draws from.
pub trait RollSource: Send {
    /// Uniform draw in [0, 1).
    fn roll(&mut self) -> f64;
    /// Uniform integer in [lo, hi]. Returns `lo` when `hi <= lo`.
    fn pick(&mut self, lo: u32, hi: u32) -> u32;
}

/// Seeded ChaCha8 stream; reproducible for a given seed.
#[derive(Debug, Clone)]
pub struct SeededRolls {
    rng: ChaCha8Rng,
}

impl SeededRolls {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Seeded when `seed` is given, otherwise from OS entropy.
    pub fn from_seed_opt(seed: Option<u64>) -> Self {
        seed.map(Self::new).unwrap_or_else(Self::from_entropy)
    }
}

impl RollSource for SeededRolls {
    fn roll(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn pick(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }
}

/// Predetermined draws for tests.
///
/// Exhausted roll queues return `0.0` (every attempt succeeds); exhausted
/// pick queues return `hi`. Scripted picks are clamped into `[lo, hi]`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRolls {
    rolls: VecDeque<f64>,
    picks: VecDeque<u32>,
}

impl ScriptedRolls {
    pub fn new<R, P>(rolls: R, picks: P) -> Self
    where
        R: IntoIterator<Item = f64>,
        P: IntoIterator<Item = u32>,
    {
        Self {
            rolls: rolls.into_iter().collect(),
            picks: picks.into_iter().collect(),
        }
    }

    /// Only upgrade rolls; restocks land on the maximum.
    pub fn rolls<R: IntoIterator<Item = f64>>(rolls: R) -> Self {
        Self::new(rolls, [])
    }
}

impl RollSource for ScriptedRolls {
    fn roll(&mut self) -> f64 {
        self.rolls.pop_front().unwrap_or(0.0)
    }

    fn pick(&mut self, lo: u32, hi: u32) -> u32 {
        let hi = hi.max(lo);
        self.picks.pop_front().map_or(hi, |p| p.clamp(lo, hi))
    }
}
