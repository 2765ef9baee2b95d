//! Laplace mechanism for count queries.

use crate::{validate_epsilon, DpResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sensitivity of a count query: adding or removing one subject changes the count by at most 1.
pub const COUNT_SENSITIVITY: f64 = 1.0;

/// Draws one sample from a Laplace distribution using the inverse CDF.
///
/// `u` is drawn uniformly from `(-0.5, 0.5]` and mapped to
/// `location - scale * sign(u) * ln(1 - 2|u|)`. The single point `u = 0.5` maps to an infinite
/// value and is redrawn.
pub fn sample_laplace<R: Rng + ?Sized>(rng: &mut R, location: f64, scale: f64) -> f64 {
    loop {
        // gen::<f64>() is uniform on [0, 1)
        let u = 0.5 - rng.gen::<f64>();
        let magnitude = 1.0 - 2.0 * u.abs();
        if magnitude > 0.0 {
            return location - scale * u.signum() * magnitude.ln();
        }
    }
}

/// Adds Laplace noise to counts.
///
/// The sampler owns its random source. [`LaplaceSampler::from_entropy`] is what a run uses by
/// default; [`LaplaceSampler::seeded`] gives a reproducible sequence of noisy counts.
#[derive(Debug, Clone)]
pub struct LaplaceSampler<R = StdRng> {
    rng: R,
}

impl LaplaceSampler<StdRng> {
    /// Sampler seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Sampler with a fixed seed. Two samplers built from the same seed produce the same noise.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> LaplaceSampler<R> {
    /// Wraps an arbitrary random source.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Returns `max(0, round(true_count + noise))` with `noise ~ Laplace(0, 1 / epsilon)`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DpError::InvalidEpsilon`] if `epsilon` is not finite and positive.
    pub fn add_noise(&mut self, true_count: u64, epsilon: f64) -> DpResult<u64> {
        validate_epsilon(epsilon)?;
        let scale = COUNT_SENSITIVITY / epsilon;
        let noise = sample_laplace(&mut self.rng, 0.0, scale);
        let noisy = clamp_to_count(true_count as f64 + noise);
        tracing::trace!(true_count, epsilon, noisy, "added laplace noise");
        Ok(noisy)
    }
}

fn clamp_to_count(value: f64) -> u64 {
    let rounded = value.round();
    if rounded.is_nan() || rounded <= 0.0 {
        0
    } else {
        // `as` saturates at u64::MAX
        rounded as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DpError;
    use std::collections::HashSet;

    #[test]
    fn noisy_count_is_never_negative() {
        let mut sampler = LaplaceSampler::seeded(7);
        for count in [0u64, 1, 2, 5, 100] {
            for epsilon in [0.01, 0.1, 1.0, 10.0] {
                for _ in 0..200 {
                    let noisy = sampler.add_noise(count, epsilon).expect("valid epsilon");
                    // u64 cannot go below zero; guard against wrap-around to huge values instead
                    assert!(noisy < count + 100_000, "count {count}, epsilon {epsilon}: {noisy}");
                }
            }
        }
    }

    #[test]
    fn zero_count_is_accepted() {
        let mut sampler = LaplaceSampler::seeded(1);
        let noisy = sampler.add_noise(0, 1.0).expect("zero count is valid");
        assert!(noisy < 1_000);
    }

    #[test]
    fn large_epsilon_converges_to_true_count() {
        let mut sampler = LaplaceSampler::seeded(99);
        for count in [0u64, 3, 42, 10_000] {
            for _ in 0..500 {
                assert_eq!(sampler.add_noise(count, 1e9).expect("valid"), count);
            }
        }
    }

    #[test]
    fn unseeded_calls_differ() {
        let mut sampler = LaplaceSampler::from_entropy();
        let outputs: HashSet<u64> = (0..100)
            .map(|_| sampler.add_noise(1_000, 0.1).expect("valid"))
            .collect();
        assert!(outputs.len() > 1);
    }

    #[test]
    fn same_seed_reproduces_noise() {
        let mut first = LaplaceSampler::seeded(2024);
        let mut second = LaplaceSampler::seeded(2024);
        let a: Vec<u64> = (0..50).map(|_| first.add_noise(25, 0.5).unwrap()).collect();
        let b: Vec<u64> = (0..50).map(|_| second.add_noise(25, 0.5).unwrap()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_epsilon_is_rejected() {
        let mut sampler = LaplaceSampler::seeded(0);
        assert_eq!(
            sampler.add_noise(10, 0.0),
            Err(DpError::InvalidEpsilon(0.0))
        );
        assert!(matches!(
            sampler.add_noise(10, -2.0),
            Err(DpError::InvalidEpsilon(_))
        ));
    }

    #[test]
    fn samples_follow_laplace_moments() {
        let mut rng = StdRng::seed_from_u64(31);
        let scale = 2.0;
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| sample_laplace(&mut rng, 0.0, scale)).collect();

        let mean = samples.iter().sum::<f64>() / n as f64;
        let mean_abs = samples.iter().map(|s| s.abs()).sum::<f64>() / n as f64;

        // E[X] = location, E[|X - location|] = scale
        assert!(mean.abs() < 0.1, "mean {mean}");
        assert!((mean_abs - scale).abs() < 0.1, "mean |x| {mean_abs}");
    }

    #[test]
    fn location_shifts_samples() {
        let mut rng = StdRng::seed_from_u64(5);
        let n = 5_000;
        let mean = (0..n)
            .map(|_| sample_laplace(&mut rng, 50.0, 0.5))
            .sum::<f64>()
            / n as f64;
        assert!((mean - 50.0).abs() < 0.1, "mean {mean}");
    }

    #[test]
    fn clamp_rounds_and_floors_at_zero() {
        assert_eq!(clamp_to_count(-3.7), 0);
        assert_eq!(clamp_to_count(-0.4), 0);
        assert_eq!(clamp_to_count(0.5), 1);
        assert_eq!(clamp_to_count(6.49), 6);
        assert_eq!(clamp_to_count(f64::NAN), 0);
    }
}
