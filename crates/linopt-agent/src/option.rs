//! Linear options and the option library
//!
//! A linear option extends the options framework from tabular state to an
//! n-dimensional feature space: its value parameters, termination function,
//! and internal policy are all defined over φ rather than over raw states.

use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};

use linopt_core::{DiscreteAction, RLError, Result};

use crate::model::LinearOptionModel;

/// Termination function β(φ), selected at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Termination {
    /// Terminate with a fixed probability at every step.
    ///
    /// `Constant(1.0)` reduces the option to a single primitive decision.
    Constant(f64),
    /// Terminate exactly when an indicator feature is active
    /// (committed-until-subgoal behavior)
    Indicator {
        /// Index of the indicator feature in φ
        feature: usize,
        /// Activation threshold
        threshold: f64,
    },
}

impl Termination {
    /// Termination probability at `phi`
    #[must_use]
    pub fn beta(&self, phi: &Array1<f64>) -> f64 {
        match *self {
            Self::Constant(p) => p,
            Self::Indicator { feature, threshold } => {
                if phi[feature] > threshold {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Initiation predicate, selected at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Initiation {
    /// The option may start in every state
    Everywhere,
    /// The option may start only where an indicator feature is active
    Indicator {
        /// Index of the indicator feature in φ
        feature: usize,
        /// Activation threshold
        threshold: f64,
    },
}

impl Initiation {
    /// Whether the option may be started at `phi`
    #[must_use]
    pub fn allows(&self, phi: &Array1<f64>) -> bool {
        match *self {
            Self::Everywhere => true,
            Self::Indicator { feature, threshold } => phi[feature] > threshold,
        }
    }
}

/// A temporally extended action with linear value parameters over feature space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearOption {
    /// Option-value parameters θ
    pub theta: Array1<f64>,
    /// Per-primitive-action value parameters backing the internal greedy policy
    pub action_thetas: Vec<Array1<f64>>,
    /// Termination function
    pub termination: Termination,
    /// Initiation predicate
    pub initiation: Initiation,
}

impl LinearOption {
    /// Create an option with zeroed parameters for an `n`-dimensional feature
    /// space and `num_actions` primitive actions
    pub fn new(
        n: usize,
        num_actions: usize,
        termination: Termination,
        initiation: Initiation,
    ) -> Result<Self> {
        if let Termination::Constant(p) = &termination {
            if !p.is_finite() || !(0.0..=1.0).contains(p) {
                return Err(RLError::Agent(format!(
                    "termination probability {p} outside [0, 1]"
                )));
            }
        }
        if num_actions == 0 {
            return Err(RLError::InvalidAction(
                "an option needs at least one primitive action".into(),
            ));
        }

        Ok(Self {
            theta: Array1::zeros(n),
            action_thetas: vec![Array1::zeros(n); num_actions],
            termination,
            initiation,
        })
    }

    /// Whether the option may be started at `phi`
    #[must_use]
    pub fn initiate(&self, phi: &Array1<f64>) -> bool {
        self.initiation.allows(phi)
    }

    /// Termination probability at `phi`
    #[must_use]
    pub fn beta(&self, phi: &Array1<f64>) -> f64 {
        self.termination.beta(phi)
    }

    /// Stochastic termination: exactly one uniform draw per call, compared
    /// against `beta(phi)`
    pub fn terminate<R: Rng + ?Sized>(&self, phi: &Array1<f64>, rng: &mut R) -> bool {
        rng.gen::<f64>() < self.beta(phi)
    }

    /// Internal greedy policy: `argmax_a θ_a·φ`, ties to the first index
    #[must_use]
    pub fn greedy_action(&self, phi: &Array1<f64>) -> DiscreteAction {
        let mut best = 0;
        let mut best_value = self.action_thetas[0].dot(phi);
        for (a, theta) in self.action_thetas.iter().enumerate().skip(1) {
            let value = theta.dot(phi);
            if value > best_value {
                best = a;
                best_value = value;
            }
        }
        DiscreteAction(best)
    }

    /// Option value `θ·φ`
    #[must_use]
    pub fn value(&self, phi: &Array1<f64>) -> f64 {
        self.theta.dot(phi)
    }

    /// Number of primitive actions in the internal policy's table
    #[must_use]
    pub fn num_actions(&self) -> usize {
        self.action_thetas.len()
    }

    /// Validate every parameter against feature dimension `n`
    pub fn check_dims(&self, n: usize) -> Result<()> {
        if self.theta.len() != n {
            return Err(RLError::DimensionMismatch {
                expected: n,
                actual: self.theta.len(),
            });
        }
        for theta in &self.action_thetas {
            if theta.len() != n {
                return Err(RLError::DimensionMismatch {
                    expected: n,
                    actual: theta.len(),
                });
            }
        }
        if let Termination::Indicator { feature, .. } = &self.termination {
            if *feature >= n {
                return Err(RLError::DimensionMismatch {
                    expected: n,
                    actual: *feature,
                });
            }
        }
        if let Initiation::Indicator { feature, .. } = &self.initiation {
            if *feature >= n {
                return Err(RLError::DimensionMismatch {
                    expected: n,
                    actual: *feature,
                });
            }
        }
        Ok(())
    }
}

/// Fixed collection of options and their optionally attached models.
///
/// Option identity is positional: the index in construction order, stable
/// for the lifetime of a run and across save/load. Options are never added
/// or removed while an agent is running.
#[derive(Debug, Clone)]
pub struct OptionLibrary {
    options: Vec<LinearOption>,
    models: Vec<Option<LinearOptionModel>>,
    n: usize,
    num_actions: usize,
}

impl OptionLibrary {
    /// Build a library, validating every option against the feature
    /// dimension `n` and the primitive action count
    pub fn new(options: Vec<LinearOption>, n: usize, num_actions: usize) -> Result<Self> {
        if options.is_empty() {
            return Err(RLError::Agent("option library is empty".into()));
        }
        for option in &options {
            option.check_dims(n)?;
            if option.num_actions() != num_actions {
                return Err(RLError::DimensionMismatch {
                    expected: num_actions,
                    actual: option.num_actions(),
                });
            }
        }

        let models = vec![None; options.len()];
        Ok(Self {
            options,
            models,
            n,
            num_actions,
        })
    }

    /// Number of options
    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Whether the library holds no options
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Feature dimension n shared by every option and model
    #[must_use]
    pub fn feature_len(&self) -> usize {
        self.n
    }

    /// Primitive action count shared by every option
    #[must_use]
    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Option at `index`
    #[must_use]
    pub fn option(&self, index: usize) -> &LinearOption {
        &self.options[index]
    }

    /// Mutable option at `index`
    pub fn option_mut(&mut self, index: usize) -> &mut LinearOption {
        &mut self.options[index]
    }

    /// All options in identity order
    #[must_use]
    pub fn options(&self) -> &[LinearOption] {
        &self.options
    }

    /// Model attached to the option at `index`, if any
    #[must_use]
    pub fn model(&self, index: usize) -> Option<&LinearOptionModel> {
        self.models[index].as_ref()
    }

    /// Mutable model attached to the option at `index`, if any
    pub fn model_mut(&mut self, index: usize) -> Option<&mut LinearOptionModel> {
        self.models[index].as_mut()
    }

    /// Attach a model to the option at `index`
    pub fn attach_model(&mut self, index: usize, model: LinearOptionModel) -> Result<()> {
        if index >= self.options.len() {
            return Err(RLError::Agent(format!(
                "no option at index {index} to attach a model to"
            )));
        }
        model.check_dims(self.n)?;
        self.models[index] = Some(model);
        Ok(())
    }

    /// Attach a zero-initialized model to every option
    pub fn attach_zero_models(&mut self) {
        for slot in &mut self.models {
            *slot = Some(LinearOptionModel::new(self.n));
        }
    }

    /// Indices of options whose initiation predicate holds at `phi`
    #[must_use]
    pub fn eligible(&self, phi: &Array1<f64>) -> Vec<usize> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, option)| option.initiate(phi))
            .map(|(index, _)| index)
            .collect()
    }

    /// Highest option value `θ·φ` over the initiation-eligible set.
    ///
    /// An empty eligible set is a configuration error.
    pub fn best_eligible_value(&self, phi: &Array1<f64>) -> Result<f64> {
        self.options
            .iter()
            .filter(|option| option.initiate(phi))
            .map(|option| option.value(phi))
            .fold(None, |best: Option<f64>, value| {
                Some(best.map_or(value, |b| b.max(value)))
            })
            .ok_or(RLError::NoEligibleOption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ForcedRng;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn option_with_thetas(thetas: &[&[f64]]) -> LinearOption {
        let n = thetas[0].len();
        let mut option = LinearOption::new(
            n,
            thetas.len(),
            Termination::Constant(1.0),
            Initiation::Everywhere,
        )
        .unwrap();
        for (slot, theta) in option.action_thetas.iter_mut().zip(thetas) {
            *slot = Array1::from_iter(theta.iter().copied());
        }
        option
    }

    #[test]
    fn test_greedy_action_breaks_ties_toward_first_index() {
        let option = option_with_thetas(&[&[0.0, 1.0], &[0.0, 1.0], &[0.0, 0.5]]);
        let phi = arr1(&[0.0, 1.0]);
        assert_eq!(option.greedy_action(&phi), DiscreteAction(0));
    }

    #[test]
    fn test_greedy_action_selects_highest_value() {
        let option = option_with_thetas(&[&[1.0, 0.0], &[0.0, 2.0]]);
        let phi = arr1(&[0.0, 1.0]);
        assert_eq!(option.greedy_action(&phi), DiscreteAction(1));
    }

    #[test]
    fn test_indicator_termination_fires_on_active_feature() {
        let option = LinearOption::new(
            3,
            1,
            Termination::Indicator {
                feature: 2,
                threshold: 0.5,
            },
            Initiation::Everywhere,
        )
        .unwrap();

        assert_eq!(option.beta(&arr1(&[0.0, 0.0, 1.0])), 1.0);
        assert_eq!(option.beta(&arr1(&[1.0, 1.0, 0.0])), 0.0);
    }

    #[test]
    fn test_terminate_uses_a_single_uniform_draw() {
        let option = LinearOption::new(
            2,
            1,
            Termination::Constant(0.5),
            Initiation::Everywhere,
        )
        .unwrap();
        let phi = arr1(&[1.0, 0.0]);

        let mut rng = ForcedRng::from_f64s(&[0.25, 0.75]);
        assert!(option.terminate(&phi, &mut rng));
        assert!(!option.terminate(&phi, &mut rng));
        assert!(rng.is_exhausted());
    }

    #[test]
    fn test_terminate_matches_beta_empirically() {
        let option = LinearOption::new(
            2,
            1,
            Termination::Constant(0.3),
            Initiation::Everywhere,
        )
        .unwrap();
        let phi = arr1(&[1.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(42);

        let draws = 20_000;
        let fired = (0..draws)
            .filter(|_| option.terminate(&phi, &mut rng))
            .count();
        #[allow(clippy::cast_precision_loss)]
        let rate = fired as f64 / f64::from(draws);
        assert_abs_diff_eq!(rate, 0.3, epsilon = 0.02);
    }

    #[test]
    fn test_invalid_termination_probability_is_rejected() {
        assert!(LinearOption::new(2, 1, Termination::Constant(1.5), Initiation::Everywhere).is_err());
        assert!(
            LinearOption::new(2, 1, Termination::Constant(f64::NAN), Initiation::Everywhere)
                .is_err()
        );
    }

    #[test]
    fn test_library_rejects_mismatched_dimensions() {
        let good = LinearOption::new(3, 2, Termination::Constant(1.0), Initiation::Everywhere)
            .unwrap();
        let bad = LinearOption::new(4, 2, Termination::Constant(1.0), Initiation::Everywhere)
            .unwrap();

        let err = OptionLibrary::new(vec![good, bad], 3, 2).unwrap_err();
        assert!(matches!(err, RLError::DimensionMismatch { expected: 3, actual: 4 }));
    }

    #[test]
    fn test_library_rejects_indicator_out_of_range() {
        let option = LinearOption::new(
            2,
            1,
            Termination::Indicator {
                feature: 5,
                threshold: 0.5,
            },
            Initiation::Everywhere,
        )
        .unwrap();

        assert!(OptionLibrary::new(vec![option], 2, 1).is_err());
    }

    #[test]
    fn test_eligible_respects_initiation_indicators() {
        let everywhere =
            LinearOption::new(3, 1, Termination::Constant(1.0), Initiation::Everywhere).unwrap();
        let restricted = LinearOption::new(
            3,
            1,
            Termination::Constant(1.0),
            Initiation::Indicator {
                feature: 1,
                threshold: 0.5,
            },
        )
        .unwrap();
        let library = OptionLibrary::new(vec![everywhere, restricted], 3, 1).unwrap();

        assert_eq!(library.eligible(&arr1(&[1.0, 0.0, 0.0])), vec![0]);
        assert_eq!(library.eligible(&arr1(&[0.0, 1.0, 0.0])), vec![0, 1]);
    }

    #[test]
    fn test_best_eligible_value_errors_when_no_option_applies() {
        let restricted = LinearOption::new(
            2,
            1,
            Termination::Constant(1.0),
            Initiation::Indicator {
                feature: 0,
                threshold: 0.5,
            },
        )
        .unwrap();
        let library = OptionLibrary::new(vec![restricted], 2, 1).unwrap();

        let err = library.best_eligible_value(&arr1(&[0.0, 1.0])).unwrap_err();
        assert!(matches!(err, RLError::NoEligibleOption));
    }

    proptest! {
        #[test]
        fn prop_beta_stays_within_unit_interval(
            p in 0.0f64..=1.0,
            x in -1e6f64..1e6,
            y in -1e6f64..1e6,
        ) {
            let constant = LinearOption::new(
                2, 1, Termination::Constant(p), Initiation::Everywhere,
            ).unwrap();
            let indicator = LinearOption::new(
                2,
                1,
                Termination::Indicator { feature: 0, threshold: 0.0 },
                Initiation::Everywhere,
            ).unwrap();
            let phi = arr1(&[x, y]);

            prop_assert!((0.0..=1.0).contains(&constant.beta(&phi)));
            prop_assert!((0.0..=1.0).contains(&indicator.beta(&phi)));
        }
    }
}
