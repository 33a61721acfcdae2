//! Hour-of-day demand curve
//!
//! `load = 0.6 + 0.3 * sin((hour - 6) * pi / 12)`: trough at midnight, mean at
//! 06:00 and 18:00, peak at noon. Gaussian noise is added per row and the
//! result clipped to [0.3, 1.0].

use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

use crate::config::defaults;

#[derive(Debug, Clone, Copy)]
pub struct LoadCycle {
    noise: Normal<f64>,
}

impl LoadCycle {
    pub fn new() -> Result<Self, rand_distr::NormalError> {
        Ok(Self {
            noise: Normal::new(0.0, defaults::LOAD_NOISE_STD)?,
        })
    }

    /// Noise-free load for an absolute hour index.
    pub fn expected(hour: usize) -> f64 {
        let hour_of_day = (hour % 24) as f64;
        defaults::LOAD_AMPLITUDE.mul_add(
            ((hour_of_day - defaults::LOAD_PHASE_HOUR) * PI / 12.0).sin(),
            defaults::LOAD_BASE,
        )
    }

    /// Noisy, clipped load for `n_rows` consecutive hours starting at `first_hour`.
    pub fn sample<R: Rng + ?Sized>(&self, first_hour: usize, n_rows: usize, rng: &mut R) -> Vec<f64> {
        (0..n_rows)
            .map(|i| {
                (Self::expected(first_hour + i) + self.noise.sample(rng))
                    .clamp(defaults::LOAD_MIN, defaults::LOAD_MAX)
            })
            .collect()
    }
}
