//! Linear Q-learning over primitive actions
//!
//! The workhorse for pretraining: one `LinearQAgent` is trained per subgoal
//! (behind a [`crate::decorator::RewardDecorator`]) and its action-value
//! table then becomes the internal policy of a [`crate::option::LinearOption`]
//! in the shared library.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use linopt_core::{
    ensure_finite, project_checked, Agent, AgentConfig, DiscreteAction, DiscreteSpace,
    FeatureProjection, RLError, Result, Reward,
};

use crate::option::{Initiation, LinearOption, Termination};
use crate::schedule::{ConstantSchedule, LinearSchedule, Schedule};

/// Configuration for [`LinearQAgent`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearQConfig {
    /// Base learning parameters
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Final exploration rate when decaying epsilon; `None` keeps it constant
    pub epsilon_end: Option<f64>,
    /// Steps over which epsilon decays to `epsilon_end`
    pub epsilon_decay_steps: usize,
}

impl Default for LinearQConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            epsilon_end: None,
            epsilon_decay_steps: 0,
        }
    }
}

pub(crate) fn epsilon_schedule(
    epsilon: f64,
    epsilon_end: Option<f64>,
    decay_steps: usize,
) -> Box<dyn Schedule> {
    match epsilon_end {
        Some(end) if decay_steps > 0 => Box::new(LinearSchedule::new(epsilon, end, decay_steps)),
        _ => Box::new(ConstantSchedule { value: epsilon }),
    }
}

/// Q-learning agent with one linear value parameter vector per primitive
/// action, epsilon-greedy over actions
pub struct LinearQAgent {
    config: LinearQConfig,
    thetas: Vec<Array1<f64>>,
    action_space: DiscreteSpace,
    projection: Box<dyn FeatureProjection>,
    epsilon: Box<dyn Schedule>,
    rng: StdRng,
    last_phi: Option<Array1<f64>>,
    last_action: Option<DiscreteAction>,
    steps: usize,
    debug: bool,
}

impl LinearQAgent {
    /// Create an agent with zeroed action-value parameters
    pub fn new(
        config: LinearQConfig,
        num_actions: usize,
        projection: Box<dyn FeatureProjection>,
    ) -> Result<Self> {
        if num_actions == 0 {
            return Err(RLError::InvalidAction(
                "agent needs at least one primitive action".into(),
            ));
        }

        let n = projection.output_len();
        let rng = match config.base.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let epsilon = epsilon_schedule(
            config.base.epsilon,
            config.epsilon_end,
            config.epsilon_decay_steps,
        );

        Ok(Self {
            config,
            thetas: vec![Array1::zeros(n); num_actions],
            action_space: DiscreteSpace::new(num_actions),
            projection,
            epsilon,
            rng,
            last_phi: None,
            last_action: None,
            steps: 0,
            debug: false,
        })
    }

    /// The learned action-value parameter vectors, one per primitive action
    #[must_use]
    pub fn thetas(&self) -> &[Array1<f64>] {
        &self.thetas
    }

    /// Total primitive steps taken so far
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Package the learned action-value table as a linear option for the
    /// shared library
    pub fn into_option(self, termination: Termination, initiation: Initiation) -> Result<LinearOption> {
        let n = self.projection.output_len();
        let mut option = LinearOption::new(n, self.thetas.len(), termination, initiation)?;
        option.action_thetas = self.thetas;
        Ok(option)
    }

    fn greedy_action(&self, phi: &Array1<f64>) -> DiscreteAction {
        let mut best = 0;
        let mut best_value = self.thetas[0].dot(phi);
        for (a, theta) in self.thetas.iter().enumerate().skip(1) {
            let value = theta.dot(phi);
            if value > best_value {
                best = a;
                best_value = value;
            }
        }
        DiscreteAction(best)
    }

    fn best_value(&self, phi: &Array1<f64>) -> f64 {
        self.thetas
            .iter()
            .map(|theta| theta.dot(phi))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn epsilon_greedy(&mut self, phi: &Array1<f64>) -> DiscreteAction {
        if self.rng.gen::<f64>() < self.epsilon.value(self.steps) {
            self.action_space.sample(&mut self.rng)
        } else {
            self.greedy_action(phi)
        }
    }
}

impl Agent for LinearQAgent {
    fn first_action(&mut self, s: &[f64]) -> Result<DiscreteAction> {
        let phi = project_checked(self.projection.as_ref(), s)?;
        let action = self.epsilon_greedy(&phi);

        self.last_phi = Some(phi);
        self.last_action = Some(action);
        self.steps += 1;
        Ok(action)
    }

    fn next_action(&mut self, reward: Reward, s: &[f64]) -> Result<DiscreteAction> {
        if !reward.value().is_finite() {
            return Err(RLError::NonFinite("reward"));
        }
        let phi_next = project_checked(self.projection.as_ref(), s)?;

        if let (Some(phi), Some(action)) = (self.last_phi.as_ref(), self.last_action) {
            let td = reward.value() + self.config.base.gamma * self.best_value(&phi_next)
                - self.thetas[action.0].dot(phi);
            self.thetas[action.0].scaled_add(self.config.base.alpha * td, phi);
            ensure_finite("theta", self.thetas[action.0].view())?;
            if self.debug {
                debug!(action = action.0, td, "q-learning update");
            }
        }

        let action = self.epsilon_greedy(&phi_next);
        self.last_phi = Some(phi_next);
        self.last_action = Some(action);
        self.steps += 1;
        Ok(action)
    }

    fn last_action(&mut self, reward: Reward) -> Result<()> {
        if !reward.value().is_finite() {
            return Err(RLError::NonFinite("reward"));
        }

        if let (Some(phi), Some(action)) = (self.last_phi.take(), self.last_action.take()) {
            let td = reward.value() - self.thetas[action.0].dot(&phi);
            self.thetas[action.0].scaled_add(self.config.base.alpha * td, &phi);
            ensure_finite("theta", self.thetas[action.0].view())?;
        }
        Ok(())
    }

    fn set_debug(&mut self, on: bool) {
        self.debug = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use linopt_core::IdentityProjection;
    use ndarray::arr1;

    fn greedy_agent() -> LinearQAgent {
        let config = LinearQConfig {
            base: AgentConfig {
                alpha: 0.5,
                gamma: 0.9,
                epsilon: 0.0,
                seed: Some(11),
            },
            ..LinearQConfig::default()
        };
        LinearQAgent::new(config, 2, Box::new(IdentityProjection::new(2))).unwrap()
    }

    #[test]
    fn test_q_update_moves_the_executed_action_only() {
        let mut agent = greedy_agent();

        // All thetas zero: greedy ties resolve to action 0.
        let action = agent.first_action(&[1.0, 0.0]).unwrap();
        assert_eq!(action, DiscreteAction(0));

        // td = 1 + 0.9 * 0 - 0 = 1; theta_0 += 0.5 * [1, 0].
        agent.next_action(Reward::new(1.0), &[0.0, 1.0]).unwrap();
        assert_abs_diff_eq!(agent.thetas()[0][0], 0.5, epsilon = 1e-12);
        assert_eq!(agent.thetas()[1], arr1(&[0.0, 0.0]));
    }

    #[test]
    fn test_terminal_update_uses_reward_alone() {
        let mut agent = greedy_agent();
        agent.first_action(&[1.0, 0.0]).unwrap();
        agent.next_action(Reward::new(1.0), &[0.0, 1.0]).unwrap();

        // Cached state is now phi' = [0, 1], action 0.
        agent.last_action(Reward::new(2.0)).unwrap();
        assert_abs_diff_eq!(agent.thetas()[0][0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(agent.thetas()[0][1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_last_action_without_history_is_a_no_op() {
        let mut agent = greedy_agent();
        agent.last_action(Reward::new(5.0)).unwrap();
        assert_eq!(agent.thetas()[0], arr1(&[0.0, 0.0]));
    }

    #[test]
    fn test_into_option_preserves_the_action_value_table() {
        let mut agent = greedy_agent();
        agent.first_action(&[1.0, 0.0]).unwrap();
        agent.next_action(Reward::new(1.0), &[0.0, 1.0]).unwrap();
        let thetas = agent.thetas().to_vec();

        let option = agent
            .into_option(
                Termination::Indicator {
                    feature: 1,
                    threshold: 0.5,
                },
                Initiation::Everywhere,
            )
            .unwrap();

        assert_eq!(option.action_thetas, thetas);
        assert_eq!(option.theta, arr1(&[0.0, 0.0]));
    }

    #[test]
    fn test_same_seed_reproduces_the_action_sequence() {
        let make = || {
            let config = LinearQConfig {
                base: AgentConfig {
                    alpha: 0.1,
                    gamma: 0.9,
                    epsilon: 0.5,
                    seed: Some(123),
                },
                ..LinearQConfig::default()
            };
            LinearQAgent::new(config, 3, Box::new(IdentityProjection::new(2))).unwrap()
        };

        let mut first = make();
        let mut second = make();

        let mut trace_a = vec![first.first_action(&[1.0, 0.0]).unwrap()];
        let mut trace_b = vec![second.first_action(&[1.0, 0.0]).unwrap()];
        for step in 0..50 {
            let s = [f64::from(step % 2), 1.0];
            trace_a.push(first.next_action(Reward::new(0.5), &s).unwrap());
            trace_b.push(second.next_action(Reward::new(0.5), &s).unwrap());
        }

        assert_eq!(trace_a, trace_b);
        assert_eq!(first.thetas(), second.thetas());
    }

    #[test]
    fn test_epsilon_decay_reaches_its_floor() {
        let schedule = epsilon_schedule(1.0, Some(0.1), 100);
        assert_abs_diff_eq!(schedule.value(0), 1.0);
        assert_abs_diff_eq!(schedule.value(100), 0.1);
        assert_abs_diff_eq!(schedule.value(1_000), 0.1);

        let constant = epsilon_schedule(0.3, None, 100);
        assert_abs_diff_eq!(constant.value(50), 0.3);
    }
}
