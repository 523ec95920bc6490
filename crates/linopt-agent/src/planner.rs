//! Dyna-style planning backups from learned option models
//!
//! Planning reuses the option models in place of real transitions: one
//! simulated Bellman backup per modeled option per real step, decoupled from
//! the reward the environment actually produced and from the consistency
//! gate of the learners.

use ndarray::Array1;
use tracing::trace;

use linopt_core::{ensure_finite, Result};

use crate::option::OptionLibrary;

/// One-backup-per-step planner over modeled options.
///
/// With `V_max = max_{o′ modeled} θ_{o′}·(F_{o′}·φ)`, every modeled option
/// receives
///
/// ```text
/// θ_o ← θ_o + α·(b_o·φ + V_max − θ_o·φ)·φ
/// ```
///
/// `V_max` is computed from the parameters as they stood before the sweep,
/// and carries no extra discount: `F` and `b` already predict discounted
/// quantities.
#[derive(Debug, Clone)]
pub struct DynaPlanner {
    alpha: f64,
}

impl DynaPlanner {
    /// Create a planner with step size `alpha`
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// Run one planning sweep at `phi`.
    ///
    /// Options without a model are skipped without error; a library with no
    /// models at all makes the sweep a no-op. Returns the number of options
    /// backed up.
    pub fn plan(&self, library: &mut OptionLibrary, phi: &Array1<f64>) -> Result<usize> {
        // Model-predicted reward and successor value per option, gathered
        // before any theta moves.
        let mut predicted_rewards = vec![None; library.len()];
        let mut v_max = f64::NEG_INFINITY;
        for index in 0..library.len() {
            let Some(model) = library.model(index) else {
                continue;
            };
            let next_value = library.option(index).theta.dot(&model.predict_next(phi));
            v_max = v_max.max(next_value);
            predicted_rewards[index] = Some(model.predict_reward(phi));
        }
        if v_max == f64::NEG_INFINITY {
            return Ok(0);
        }

        let mut backed_up = 0;
        for index in 0..library.len() {
            let Some(predicted_reward) = predicted_rewards[index] else {
                continue;
            };
            let option = library.option_mut(index);
            let td = predicted_reward + v_max - option.value(phi);
            option.theta.scaled_add(self.alpha * td, phi);
            ensure_finite("theta", option.theta.view())?;
            backed_up += 1;
        }

        trace!(backed_up, "planning sweep");
        Ok(backed_up)
    }
}
