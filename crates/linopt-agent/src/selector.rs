//! Epsilon-greedy selection over the option library

use ndarray::Array1;
use rand::Rng;
use tracing::trace;

use linopt_core::{RLError, Result};

use crate::option::OptionLibrary;

/// Behavior policy over options: continues a running option until it
/// terminates, then selects a new one epsilon-greedily among the options
/// whose initiation predicate holds.
#[derive(Debug, Clone)]
pub struct OptionSelector {
    epsilon: f64,
    running: Option<usize>,
}

impl OptionSelector {
    /// Create a selector with exploration rate `epsilon`
    #[must_use]
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.clamp(0.0, 1.0),
            running: None,
        }
    }

    /// Current exploration rate
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Set the exploration rate
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    /// Index of the currently running option, if any
    #[must_use]
    pub fn running(&self) -> Option<usize> {
        self.running
    }

    /// Forget the running option (episode boundary)
    pub fn reset(&mut self) {
        self.running = None;
    }

    /// Continue the running option unless it terminates at `phi`; otherwise
    /// pick a new option and record it as running.
    ///
    /// The draw order is fixed: one termination draw when an option is
    /// running, one epsilon draw when selecting, one uniform index draw when
    /// exploring. An empty eligible set is a configuration error, never a
    /// silent null choice.
    pub fn select_or_continue<R: Rng + ?Sized>(
        &mut self,
        library: &OptionLibrary,
        phi: &Array1<f64>,
        rng: &mut R,
    ) -> Result<usize> {
        if let Some(index) = self.running {
            if !library.option(index).terminate(phi, rng) {
                trace!(option = index, "continuing running option");
                return Ok(index);
            }
        }

        let eligible = library.eligible(phi);
        if eligible.is_empty() {
            return Err(RLError::NoEligibleOption);
        }

        let choice = if rng.gen::<f64>() < self.epsilon {
            eligible[uniform_index(rng, eligible.len())]
        } else {
            let mut best = eligible[0];
            let mut best_value = library.option(best).value(phi);
            for &index in &eligible[1..] {
                let value = library.option(index).value(phi);
                if value > best_value {
                    best = index;
                    best_value = value;
                }
            }
            best
        };

        trace!(option = choice, "selected new option");
        self.running = Some(choice);
        Ok(choice)
    }
}

/// Uniform index in `0..len` from a single `[0, 1)` draw
fn uniform_index<R: Rng + ?Sized>(rng: &mut R, len: usize) -> usize {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = (rng.gen::<f64>() * len as f64) as usize;
    index.min(len - 1)
}
