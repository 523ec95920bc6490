//! The Dyna options agent
//!
//! Interleaves one step of intra-option learning and model learning from
//! real experience with one planning backup from the learned option models,
//! every real step. Acting is hierarchical: an epsilon-greedy behavior
//! policy picks among options, and the running option's internal policy
//! emits the primitive action.

use std::path::Path;

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use linopt_core::{
    project_checked, Agent, AgentConfig, DiscreteAction, FeatureProjection, RLError, Result,
    Reward,
};

use crate::intra::IntraOptionLearner;
use crate::model::ModelLearner;
use crate::option::OptionLibrary;
use crate::persist;
use crate::planner::DynaPlanner;
use crate::qlearner::epsilon_schedule;
use crate::schedule::Schedule;
use crate::selector::OptionSelector;

/// Configuration for [`DynaOptionAgent`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynaAgentConfig {
    /// Base learning parameters
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Final exploration rate when decaying epsilon; `None` keeps it constant
    pub epsilon_end: Option<f64>,
    /// Steps over which epsilon decays to `epsilon_end`
    pub epsilon_decay_steps: usize,
}

impl Default for DynaAgentConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            epsilon_end: None,
            epsilon_decay_steps: 0,
        }
    }
}

/// Hierarchical agent over a fixed library of linear options.
///
/// Exactly one agent drives one library; every stochastic draw comes from
/// the agent's own seeded generator in a fixed per-step order, so a fixed
/// seed, library, and environment trace reproduce the run bit for bit.
pub struct DynaOptionAgent {
    config: DynaAgentConfig,
    library: OptionLibrary,
    projection: Box<dyn FeatureProjection>,
    selector: OptionSelector,
    intra: IntraOptionLearner,
    model_learner: ModelLearner,
    planner: DynaPlanner,
    epsilon: Box<dyn Schedule>,
    rng: StdRng,
    last_phi: Option<Array1<f64>>,
    last_action: Option<DiscreteAction>,
    steps: usize,
    debug: bool,
}

impl std::fmt::Debug for DynaOptionAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynaOptionAgent")
            .field("config", &self.config)
            .field("steps", &self.steps)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl DynaOptionAgent {
    /// Create an agent over `library`, which must match the projection's
    /// output dimension
    pub fn new(
        config: DynaAgentConfig,
        library: OptionLibrary,
        projection: Box<dyn FeatureProjection>,
    ) -> Result<Self> {
        if library.feature_len() != projection.output_len() {
            return Err(RLError::DimensionMismatch {
                expected: projection.output_len(),
                actual: library.feature_len(),
            });
        }

        let rng = match config.base.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let epsilon = epsilon_schedule(
            config.base.epsilon,
            config.epsilon_end,
            config.epsilon_decay_steps,
        );
        let selector = OptionSelector::new(config.base.epsilon);
        let intra = IntraOptionLearner::new(config.base.alpha, config.base.gamma);
        let model_learner = ModelLearner::new(config.base.alpha, config.base.gamma);
        let planner = DynaPlanner::new(config.base.alpha);

        Ok(Self {
            config,
            library,
            projection,
            selector,
            intra,
            model_learner,
            planner,
            epsilon,
            rng,
            last_phi: None,
            last_action: None,
            steps: 0,
            debug: false,
        })
    }

    /// The option library this agent drives
    #[must_use]
    pub fn library(&self) -> &OptionLibrary {
        &self.library
    }

    /// The agent's configuration
    #[must_use]
    pub fn config(&self) -> &DynaAgentConfig {
        &self.config
    }

    /// Index of the option currently running, if any
    #[must_use]
    pub fn running_option(&self) -> Option<usize> {
        self.selector.running()
    }

    /// Total primitive steps taken so far
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Persist the option library (and attached models) to `path`
    pub fn save_options(&self, path: &Path) -> Result<()> {
        persist::save_library(&self.library, path)
    }

    /// Replace the library with one previously saved by [`Self::save_options`].
    ///
    /// The file must match this agent's option count, feature dimension, and
    /// action count; anything else is a schema mismatch.
    pub fn load_options(&mut self, path: &Path) -> Result<()> {
        self.library = persist::load_library(
            path,
            self.library.feature_len(),
            self.library.num_actions(),
            self.library.len(),
        )?;
        Ok(())
    }

    /// Select or continue an option at `phi` and emit its internal action
    fn act(&mut self, phi: &Array1<f64>) -> Result<DiscreteAction> {
        self.selector.set_epsilon(self.epsilon.value(self.steps));
        let index = self
            .selector
            .select_or_continue(&self.library, phi, &mut self.rng)?;
        let action = self.library.option(index).greedy_action(phi);
        if self.debug {
            debug!(option = index, action = action.0, "acting");
        }
        Ok(action)
    }
}

impl Agent for DynaOptionAgent {
    fn first_action(&mut self, s: &[f64]) -> Result<DiscreteAction> {
        let phi = project_checked(self.projection.as_ref(), s)?;

        self.selector.reset();
        let action = self.act(&phi)?;
        self.last_phi = Some(phi);
        self.last_action = Some(action);
        self.steps += 1;
        Ok(action)
    }

    fn next_action(&mut self, reward: Reward, s: &[f64]) -> Result<DiscreteAction> {
        let phi_next = project_checked(self.projection.as_ref(), s)?;

        // Learning half: every option consistent with the executed action
        // gets value and model credit from the real transition.
        if let (Some(phi), Some(action)) = (self.last_phi.as_ref(), self.last_action) {
            let value_updates =
                self.intra
                    .update(&mut self.library, phi, action, reward, &phi_next)?;
            let model_updates =
                self.model_learner
                    .update(&mut self.library, phi, action, reward, &phi_next)?;
            if self.debug {
                debug!(
                    value_updates = value_updates.len(),
                    model_updates = model_updates.len(),
                    "learning step"
                );
            }
        }

        // Planning half: one simulated backup per modeled option, never
        // gated on consistency.
        self.planner.plan(&mut self.library, &phi_next)?;

        let action = self.act(&phi_next)?;
        self.last_phi = Some(phi_next);
        self.last_action = Some(action);
        self.steps += 1;
        Ok(action)
    }

    fn last_action(&mut self, reward: Reward) -> Result<()> {
        if let (Some(phi), Some(action)) = (self.last_phi.take(), self.last_action.take()) {
            self.intra
                .update_terminal(&mut self.library, &phi, action, reward)?;
        }
        self.selector.reset();
        Ok(())
    }

    fn set_debug(&mut self, on: bool) {
        self.debug = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearOptionModel;
    use crate::option::{Initiation, LinearOption, Termination};
    use linopt_core::IdentityProjection;
    use ndarray::arr1;

    /// Two single-decision options over n = 2, each committed to one action.
    fn library() -> OptionLibrary {
        let mut toward_zero =
            LinearOption::new(2, 2, Termination::Constant(1.0), Initiation::Everywhere).unwrap();
        toward_zero.action_thetas[0] = arr1(&[1.0, 1.0]);
        let mut toward_one =
            LinearOption::new(2, 2, Termination::Constant(1.0), Initiation::Everywhere).unwrap();
        toward_one.action_thetas[1] = arr1(&[1.0, 1.0]);
        OptionLibrary::new(vec![toward_zero, toward_one], 2, 2).unwrap()
    }

    fn agent(seed: u64, epsilon: f64) -> DynaOptionAgent {
        let config = DynaAgentConfig {
            base: AgentConfig {
                alpha: 0.1,
                gamma: 0.9,
                epsilon,
                seed: Some(seed),
            },
            ..DynaAgentConfig::default()
        };
        DynaOptionAgent::new(config, library(), Box::new(IdentityProjection::new(2))).unwrap()
    }

    #[test]
    fn test_projection_and_library_dimensions_must_agree() {
        let config = DynaAgentConfig::default();
        let err = DynaOptionAgent::new(config, library(), Box::new(IdentityProjection::new(5)))
            .unwrap_err();
        assert!(matches!(
            err,
            RLError::DimensionMismatch { expected: 5, actual: 2 }
        ));
    }

    #[test]
    fn test_first_action_comes_from_the_selected_options_policy() {
        let mut agent = agent(4, 0.0);
        let action = agent.first_action(&[1.0, 0.0]).unwrap();

        // With all thetas zero the greedy selector ties to option 0, whose
        // internal policy is committed to action 0.
        assert_eq!(action, DiscreteAction(0));
        assert_eq!(agent.running_option(), Some(0));
    }

    #[test]
    fn test_planning_runs_even_when_no_option_is_consistent() {
        let mut agent = agent(4, 0.0);
        agent.library.attach_zero_models();
        // Give option 1's model a reward prediction so its planning backup
        // moves theta even though action 0 keeps being executed.
        agent.library.model_mut(1).unwrap().b = arr1(&[1.0, 0.0]);

        agent.first_action(&[1.0, 0.0]).unwrap();
        agent.next_action(Reward::new(0.0), &[1.0, 0.0]).unwrap();

        // Option 1 is never consistent with action 0 (its policy says 1),
        // yet planning moved its value parameters.
        assert!(agent.library().option(1).theta[0] > 0.0);
    }

    #[test]
    fn test_non_finite_observation_is_fatal() {
        let mut agent = agent(4, 0.0);
        let err = agent.first_action(&[f64::NAN, 0.0]).unwrap_err();
        assert!(matches!(err, RLError::NonFinite("phi")));
    }

    #[test]
    fn test_last_action_without_history_is_a_no_op() {
        let mut agent = agent(4, 0.0);
        agent.last_action(Reward::new(1.0)).unwrap();
        assert_eq!(agent.library().option(0).theta, arr1(&[0.0, 0.0]));
    }

    #[test]
    fn test_episode_boundary_forgets_the_running_option() {
        let mut agent = agent(4, 0.0);
        agent.first_action(&[1.0, 0.0]).unwrap();
        assert!(agent.running_option().is_some());

        agent.last_action(Reward::new(0.0)).unwrap();
        assert_eq!(agent.running_option(), None);
    }

    #[test]
    fn test_fixed_seed_reproduces_updates_bit_for_bit() {
        let run = || {
            let mut agent = agent(99, 0.3);
            agent.library.attach_zero_models();
            let mut actions = vec![agent.first_action(&[1.0, 0.0]).unwrap()];
            for step in 0..40 {
                let s = [1.0, f64::from(step % 3)];
                actions.push(agent.next_action(Reward::new(0.25), &s).unwrap());
            }
            (actions, agent)
        };

        let (actions_a, agent_a) = run();
        let (actions_b, agent_b) = run();
        assert_eq!(actions_a, actions_b);
        for index in 0..agent_a.library().len() {
            assert_eq!(
                agent_a.library().option(index).theta,
                agent_b.library().option(index).theta
            );
            assert_eq!(agent_a.library().model(index), agent_b.library().model(index));
        }
    }

    #[test]
    fn test_attached_model_survives_planning_without_learning() {
        let mut agent = agent(4, 0.0);
        agent
            .library
            .attach_model(0, LinearOptionModel::new(2))
            .unwrap();

        agent.first_action(&[1.0, 0.0]).unwrap();
        agent.next_action(Reward::new(1.0), &[0.0, 1.0]).unwrap();
        assert!(agent.library().model(0).is_some());
        assert!(agent.library().model(1).is_none());
    }
}
