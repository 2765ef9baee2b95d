//! Sequential-composition accounting across the counts released in one run.

use crate::{validate_epsilon, DpError, DpResult};

// Absorbs float drift when many small epsilons add up to exactly the total.
const BUDGET_TOLERANCE: f64 = 1e-9;

/// Running total of epsilon spent, optionally capped.
///
/// Under sequential composition the privacy loss of a run is the sum of the epsilons of every
/// count it publishes. An uncapped budget only records what was spent.
#[derive(Clone, Debug, PartialEq)]
pub struct PrivacyBudget {
    total: Option<f64>,
    spent: f64,
}

impl Default for PrivacyBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl PrivacyBudget {
    /// Budget that never refuses a spend.
    pub fn unlimited() -> Self {
        Self {
            total: None,
            spent: 0.0,
        }
    }

    /// Budget capped at `total`.
    ///
    /// # Errors
    ///
    /// Returns [`DpError::InvalidBudget`] if `total` is not finite and positive.
    pub fn capped(total: f64) -> DpResult<Self> {
        if !(total.is_finite() && total > 0.0) {
            return Err(DpError::InvalidBudget(total));
        }
        Ok(Self {
            total: Some(total),
            spent: 0.0,
        })
    }

    /// Epsilon spent so far.
    pub fn spent(&self) -> f64 {
        self.spent
    }

    /// Epsilon still available, or `None` when uncapped.
    pub fn remaining(&self) -> Option<f64> {
        self.total.map(|total| (total - self.spent).max(0.0))
    }

    /// Checks whether `epsilon` could be spent without recording it.
    pub fn check(&self, epsilon: f64) -> DpResult<()> {
        validate_epsilon(epsilon)?;
        if let Some(total) = self.total {
            if self.spent + epsilon > total + BUDGET_TOLERANCE {
                return Err(DpError::BudgetExhausted {
                    requested: epsilon,
                    remaining: (total - self.spent).max(0.0),
                });
            }
        }
        Ok(())
    }

    /// Records `epsilon` as spent if the budget allows it.
    pub fn try_spend(&mut self, epsilon: f64) -> DpResult<()> {
        self.check(epsilon)?;
        self.spent += epsilon;
        Ok(())
    }
}
