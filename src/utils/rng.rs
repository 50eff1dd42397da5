use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Process-wide random source for win rolls and Fisher-Yates shuffles.
///
/// A single `StdRng` behind a lock keeps batches deterministic when a seed
/// is configured; the critical sections are short and never held across
/// await points.
#[derive(Clone)]
pub struct SharedRng {
    inner: Arc<Mutex<StdRng>>,
}

impl SharedRng {
    /// Seeded from OS entropy.
    pub fn new() -> Self {
        SharedRng {
            inner: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        SharedRng {
            inner: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    pub fn from_config(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::seeded(s),
            None => Self::new(),
        }
    }

    /// Uniform roll in `[0, 1)`.
    pub fn roll(&self) -> f64 {
        let mut rng = self.inner.lock().expect("rng lock poisoned");
        rng.random::<f64>()
    }

    /// In-place Fisher-Yates permutation.
    pub fn shuffle<T>(&self, items: &mut [T]) {
        let mut rng = self.inner.lock().expect("rng lock poisoned");
        items.shuffle(&mut *rng);
    }
}

impl Default for SharedRng {
    fn default() -> Self {
        Self::new()
    }
}
