//! Random target selection
//!
//! One generator is seeded once and shared by every timer. It sits behind a
//! std mutex that is never held across an await point.

use crate::error::{Result, TurmoilError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, MutexGuard};

/// Draws victims from candidate lists
#[derive(Debug)]
pub struct TargetSelector {
    rng: Mutex<StdRng>,
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetSelector {
    /// Create a selector seeded from the operating system
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Create a selector with a fixed seed (reproducible runs and tests)
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        // A panic while holding the lock cannot leave the generator invalid
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Pick one candidate uniformly at random
    ///
    /// # Errors
    ///
    /// Returns `TurmoilError::EmptyPopulation` if there are no candidates.
    pub fn pick_one(&self, candidates: &[String]) -> Result<String> {
        if candidates.is_empty() {
            return Err(TurmoilError::EmptyPopulation);
        }
        let index = self.rng().random_range(0..candidates.len());
        Ok(candidates[index].clone())
    }

    /// Pick `floor(len * fraction)` distinct candidates.
    ///
    /// A uniform permutation of the indices is drawn and its prefix taken, so
    /// every subset of that size is equally likely. The fraction is clamped
    /// to `[0, 1]`.
    pub fn pick_fraction(&self, candidates: &[String], fraction: f64) -> Vec<String> {
        let count = fraction_count(candidates.len(), fraction);
        if count == 0 {
            return Vec::new();
        }

        let mut indices: Vec<usize> = (0..candidates.len()).collect();
        indices.shuffle(&mut *self.rng());
        indices
            .into_iter()
            .take(count)
            .map(|i| candidates[i].clone())
            .collect()
    }

    /// One Bernoulli trial: true with the given probability
    pub fn roll(&self, probability: f64) -> bool {
        self.rng().random::<f64>() < probability
    }
}

/// `floor(len * fraction)` with the fraction clamped to `[0, 1]`
pub fn fraction_count(len: usize, fraction: f64) -> usize {
    if !fraction.is_finite() {
        return 0;
    }
    let count = (len as f64 * fraction.clamp(0.0, 1.0)).floor() as usize;
    count.min(len)
}
