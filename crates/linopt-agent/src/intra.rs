//! Intra-option value learning from shared real experience
//!
//! Every option whose internal policy agrees with the primitive action the
//! agent actually executed receives credit for the transition, regardless of
//! which option is nominally running. This is what makes the update
//! off-policy: one real step trains many options at once.

use ndarray::Array1;
use tracing::trace;

use linopt_core::{ensure_finite, DiscreteAction, RLError, Result, Reward};

use crate::option::OptionLibrary;

/// Intra-option Q-learning over an option library
#[derive(Debug, Clone)]
pub struct IntraOptionLearner {
    alpha: f64,
    gamma: f64,
}

impl IntraOptionLearner {
    /// Create a learner with step size `alpha` and discount `gamma`
    #[must_use]
    pub fn new(alpha: f64, gamma: f64) -> Self {
        Self { alpha, gamma }
    }

    /// One intra-option sweep over the library for a real transition
    /// `(φ, a, r, φ′)`.
    ///
    /// For each option `o` whose greedy action at φ′ equals the executed
    /// action, the bootstrap target blends continuation and termination by
    /// the termination probability itself:
    ///
    /// ```text
    /// U = (1 − β_o(φ′))·(θ_o·φ′) + β_o(φ′)·max_{o′ eligible}(θ_{o′}·φ′)
    /// θ_o ← θ_o + α·(r + γ·U − θ_o·φ)·φ
    /// ```
    ///
    /// Inconsistent options are left byte-identical. Returns the indices of
    /// the options updated.
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
        let best_next = library.best_eligible_value(phi_next)?;

        let mut updated = Vec::new();
        for index in 0..library.len() {
            let option = library.option(index);
            if option.greedy_action(phi_next) != action {
                continue;
            }

            let beta_next = option.beta(phi_next);
            let u = (1.0 - beta_next) * option.value(phi_next) + beta_next * best_next;
            let td = reward.value() + self.gamma * u - option.value(phi);

            let option = library.option_mut(index);
            option.theta.scaled_add(self.alpha * td, phi);
            ensure_finite("theta", option.theta.view())?;
            updated.push(index);
        }

        trace!(updated = updated.len(), "intra-option learning step");
        Ok(updated)
    }

    /// Terminal-step sweep: no next state exists, so the target is the final
    /// reward alone and consistency is judged at the last feature vector φ.
    pub fn update_terminal(
        &self,
        library: &mut OptionLibrary,
        phi: &Array1<f64>,
        action: DiscreteAction,
        reward: Reward,
    ) -> Result<Vec<usize>> {
        if !reward.value().is_finite() {
            return Err(RLError::NonFinite("reward"));
        }

        let mut updated = Vec::new();
        for index in 0..library.len() {
            if library.option(index).greedy_action(phi) != action {
                continue;
            }

            let option = library.option_mut(index);
            let td = reward.value() - option.value(phi);
            option.theta.scaled_add(self.alpha * td, phi);
            ensure_finite("theta", option.theta.view())?;
            updated.push(index);
        }

        trace!(updated = updated.len(), "terminal intra-option step");
        Ok(updated)
    }
}
