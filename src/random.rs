// src/random.rs
//
// Seeded randomness for the benchmark engine.
//
// Every learner adapter owns one of these streams; all adapters in a run
// share the same seed value, producing correlated but independent streams.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic random stream backed by ChaCha8.
///
/// `None` seeds from OS entropy; a `Some` seed makes the stream fully
/// reproducible.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { rng }
    }

    /// Uniform draw in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Sample an index according to the given weights.
    ///
    /// Weights are assumed non-negative and approximately normalized (the
    /// caller validates); the final index absorbs any rounding shortfall.
    pub fn weighted_index(&mut self, weights: &[f64]) -> usize {
        debug_assert!(!weights.is_empty());

        let draw = self.next_f64();
        let mut cumulative = 0.0;

        for (index, weight) in weights.iter().enumerate() {
            cumulative += weight;
            if draw < cumulative {
                return index;
            }
        }

        weights.len() - 1
    }

    /// In-place Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            items.swap(i, j);
        }
    }
}
