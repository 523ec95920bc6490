//! Linear option models and their incremental learner

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::trace;

use linopt_core::{ensure_finite, ensure_finite_mat, DiscreteAction, RLError, Result, Reward};

use crate::option::OptionLibrary;

/// Linear expectation model of one option.
///
/// `F` maps φ to the expected discounted feature vector at option
/// termination; `b` maps φ to the expected discounted cumulative reward
/// collected while the option runs. Both are learned incrementally; no
/// closed-form solve is involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearOptionModel {
    /// Transition model (n×n)
    pub f: Array2<f64>,
    /// Reward model (n)
    pub b: Array1<f64>,
}

impl LinearOptionModel {
    /// Zero-initialized model for an `n`-dimensional feature space
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            f: Array2::zeros((n, n)),
            b: Array1::zeros(n),
        }
    }

    /// Expected discounted next feature vector `F·φ`
    #[must_use]
    pub fn predict_next(&self, phi: &Array1<f64>) -> Array1<f64> {
        self.f.dot(phi)
    }

    /// Expected discounted cumulative reward `b·φ`
    #[must_use]
    pub fn predict_reward(&self, phi: &Array1<f64>) -> f64 {
        self.b.dot(phi)
    }

    /// Validate shapes against the feature dimension `n`
    pub fn check_dims(&self, n: usize) -> Result<()> {
        if self.f.nrows() != n {
            return Err(RLError::DimensionMismatch {
                expected: n,
                actual: self.f.nrows(),
            });
        }
        if self.f.ncols() != n {
            return Err(RLError::DimensionMismatch {
                expected: n,
                actual: self.f.ncols(),
            });
        }
        if self.b.len() != n {
            return Err(RLError::DimensionMismatch {
                expected: n,
                actual: self.b.len(),
            });
        }
        Ok(())
    }
}

/// Incremental learner for option transition and reward models.
///
/// For every option whose internal greedy policy at φ′ agrees with the
/// executed action, with `β′ = β(φ′)` and the feature-space eligibility term
/// `η = φ − γ·(1 − β′)·φ′`:
///
/// ```text
/// F ← F + α·(γ·β′·φ′ − F·η) ⊗ φ
/// b ← b + α·(r − b·η)·φ
/// ```
///
/// The residuals bootstrap on the model's own prediction while the option
/// continues; with β ≡ 1 both reduce to the plain one-step regression toward
/// `γ·φ′` and `r`.
#[derive(Debug, Clone)]
pub struct ModelLearner {
    alpha: f64,
    gamma: f64,
}

impl ModelLearner {
    /// Create a learner with step size `alpha` and discount `gamma`
    #[must_use]
    pub fn new(alpha: f64, gamma: f64) -> Self {
        Self { alpha, gamma }
    }

    /// Update the model of every consistent option from one real transition.
    ///
    /// Options without an attached model are skipped silently. Returns the
    /// indices of the options whose model was updated.
    pub fn update(
        &self,
        library: &mut OptionLibrary,
        phi: &Array1<f64>,
        action: DiscreteAction,
        reward: Reward,
        phi_next: &Array1<f64>,
    ) -> Result<Vec<usize>> {
        if !reward.value().is_finite() {
            return Err(RLError::NonFinite("reward"));
        }

        let mut updated = Vec::new();
        for index in 0..library.len() {
            if library.option(index).greedy_action(phi_next) != action {
                continue;
            }
            let beta_next = library.option(index).beta(phi_next);
            let Some(model) = library.model_mut(index) else {
                continue;
            };

            let eta = phi - &(phi_next * (self.gamma * (1.0 - beta_next)));
            let residual = phi_next * (self.gamma * beta_next) - model.f.dot(&eta);
            let outer = residual
                .insert_axis(Axis(1))
                .dot(&phi.view().insert_axis(Axis(0)));
            model.f.scaled_add(self.alpha, &outer);

            let reward_residual = reward.value() - model.b.dot(&eta);
            model.b.scaled_add(self.alpha * reward_residual, phi);

            ensure_finite_mat("F", model.f.view())?;
            ensure_finite("b", model.b.view())?;
            updated.push(index);
        }

        trace!(updated = updated.len(), "model learning step");
        Ok(updated)
    }
}
