/// Error filter with fully random coefficients.
///
/// The base matrix only contributes its shape: its causal slots are the
/// candidate taps, and its number of populated coefficients is how many taps
/// are active per pixel (or a random count when `randomize_count` is set).
/// After every pixel the active slots are re-picked and a unit of weight is
/// split between them, so each pixel's kernel sums to exactly 1.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;

use super::diffuse_weighted;
use super::matrix::MatrixErrorFilter;
use crate::error::Result;
use crate::matrix::{ErrorMatrix, Tap};
use crate::module::{Module, RunInfo};

const RNG_SALT: u64 = 0x7261_6e64;

#[derive(Debug, Clone)]
pub struct RandomizedMatrixErrorFilter {
    inner: MatrixErrorFilter,
    randomize_count: bool,
    slots: Vec<Tap>,
    weights: Vec<f32>,
    rng: Option<StdRng>,
}

impl RandomizedMatrixErrorFilter {
    pub fn new(matrix: ErrorMatrix, randomize_count: bool) -> Self {
        Self {
            inner: MatrixErrorFilter::new(matrix),
            randomize_count,
            slots: Vec::new(),
            weights: Vec::new(),
            rng: None,
        }
    }

    pub fn matrix(&self) -> &ErrorMatrix {
        self.inner.matrix()
    }

    pub fn randomize_count(&self) -> bool {
        self.randomize_count
    }

    /// Every causal slot of the base matrix.
    pub fn slots(&self) -> &[Tap] {
        &self.slots
    }

    /// Current weights, parallel to `slots`. Inactive slots are 0.
    pub fn active_weights(&self) -> &[f32] {
        &self.weights
    }

    /// Pick new active slots and split a unit of weight between them.
    pub fn regenerate(&mut self) {
        let Some(rng) = self.rng.as_mut() else {
            return;
        };
        let capacity = self.slots.len();
        if capacity == 0 {
            return;
        }
        let count = if self.randomize_count {
            rng.gen_range(1..=capacity)
        } else {
            self.inner.matrix().coefficient_count().clamp(1, capacity)
        };

        let mut picked = index::sample(&mut *rng, capacity, count).into_vec();
        picked.sort_unstable();

        self.weights.iter_mut().for_each(|w| *w = 0.0);
        let mut remaining = 1.0f32;
        let (last, rest) = match picked.split_last() {
            Some(split) => split,
            None => return,
        };
        for &slot in rest {
            let w = rng.gen_range(0.0..=remaining);
            self.weights[slot] = w;
            remaining -= w;
        }
        self.weights[*last] = remaining.max(0.0);
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.inner.is_initialized()
    }

    #[inline]
    pub fn get_error(&self) -> f32 {
        self.inner.get_error()
    }

    pub fn set_error(&mut self, error: f32, _source: f32) {
        if let Some(buffer) = self.inner.buffer.as_mut() {
            diffuse_weighted(buffer, &self.slots, &self.weights, error);
        }
    }

    pub fn move_next(&mut self) {
        self.inner.move_next();
        if self.inner.is_initialized() {
            self.regenerate();
        }
    }
}

impl Module for RandomizedMatrixErrorFilter {
    fn name(&self) -> &'static str {
        "Randomized matrix error filter"
    }

    fn description(&self) -> &'static str {
        "Regenerates error coefficients at random for every pixel"
    }

    fn init(&mut self, run: &RunInfo) -> Result<()> {
        self.inner.init(run)?;
        self.slots = self.inner.matrix().taps();
        self.weights = vec![0.0; self.slots.len()];
        self.rng = Some(run.rng(RNG_SALT));
        self.regenerate();
        Ok(())
    }
}
