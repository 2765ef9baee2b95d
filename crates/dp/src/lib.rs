//! # Differential privacy for measure counts
//!
//! Counts returned by the measure-evaluation service are published only after Laplace noise has
//! been added to them. This crate holds that step and nothing else:
//! - [`LaplaceSampler`] perturbs a single count (sensitivity 1) for a given epsilon
//! - [`PrivacyBudget`] caps the summed epsilon across every count released in one run
//!
//! The random source is injectable so that noisy output can be reproduced from a fixed seed.

mod budget;
mod laplace;

pub use budget::PrivacyBudget;
pub use laplace::{sample_laplace, LaplaceSampler, COUNT_SENSITIVITY};

/// Errors returned by the privacy layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DpError {
    #[error("epsilon must be a finite value greater than 0, got {0}")]
    InvalidEpsilon(f64),

    #[error("privacy budget must be a finite value greater than 0, got {0}")]
    InvalidBudget(f64),

    #[error("privacy budget exhausted: requested {requested}, remaining {remaining}")]
    BudgetExhausted { requested: f64, remaining: f64 },
}

/// Type alias for Results that can fail with a [`DpError`].
pub type DpResult<T> = Result<T, DpError>;

/// Checks that `epsilon` can parameterise a Laplace mechanism.
pub fn validate_epsilon(epsilon: f64) -> DpResult<()> {
    if epsilon.is_finite() && epsilon > 0.0 {
        Ok(())
    } else {
        Err(DpError::InvalidEpsilon(epsilon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_epsilon_accepts_positive_values() {
        assert!(validate_epsilon(1.0).is_ok());
        assert!(validate_epsilon(1e-9).is_ok());
    }

    #[test]
    fn validate_epsilon_rejects_zero_negative_and_non_finite() {
        for epsilon in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(validate_epsilon(epsilon), Err(DpError::InvalidEpsilon(_))),
                "epsilon {epsilon} should be rejected"
            );
        }
    }
}
