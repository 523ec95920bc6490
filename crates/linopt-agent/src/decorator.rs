//! Reward decoration for pretraining option policies toward subgoals
//!
//! When learning the internal policy of a single option, the task's true
//! reward is replaced by a subgoal-specific pseudo-reward. The decorator
//! hides that substitution from an ordinary learning agent, which trains as
//! if the pseudo-reward were the environment's own signal.

use linopt_core::{Agent, DiscreteAction, Result, Reward};

/// A subgoal's pseudo-reward function and termination predicate.
///
/// Both are pure functions of the reward and raw observation; a subgoal
/// carries no mutable state.
pub trait Subgoal: Send + Sync {
    /// Reward substituted for the environment's signal
    fn pseudo_reward(&self, reward: Reward, s: &[f64]) -> Reward;

    /// Whether the subgoal is reached at `s`
    fn is_subgoal(&self, s: &[f64]) -> bool;
}

/// Subgoal keyed to a single indicator element of the raw observation
#[derive(Debug, Clone)]
pub struct IndicatorSubgoal {
    /// Index of the indicator in the raw observation
    pub feature: usize,
    /// Activation threshold
    pub threshold: f64,
    /// Reward substituted when the indicator is active
    pub success_reward: f64,
    /// Reward substituted on every other step
    pub step_reward: f64,
}

impl Subgoal for IndicatorSubgoal {
    fn pseudo_reward(&self, _reward: Reward, s: &[f64]) -> Reward {
        if self.is_subgoal(s) {
            Reward::new(self.success_reward)
        } else {
            Reward::new(self.step_reward)
        }
    }

    fn is_subgoal(&self, s: &[f64]) -> bool {
        s.get(self.feature).map_or(false, |&x| x > self.threshold)
    }
}

/// Shields a learning agent from the environment's reward function.
///
/// Holds only a borrow of the wrapped agent, forwards the whole capability
/// set, and substitutes the subgoal pseudo-reward in `next_action`. Its own
/// `terminal` predicate tells the pretraining loop when the subgoal episode
/// is over, independent of the environment's terminal signal.
pub struct RewardDecorator<'a, A: Agent, S: Subgoal> {
    agent: &'a mut A,
    subgoal: S,
}

impl<'a, A: Agent, S: Subgoal> RewardDecorator<'a, A, S> {
    /// Wrap `agent`, substituting `subgoal`'s pseudo-reward
    pub fn new(agent: &'a mut A, subgoal: S) -> Self {
        Self { agent, subgoal }
    }

    /// Whether the pretraining episode should stop at `s`
    #[must_use]
    pub fn terminal(&self, s: &[f64]) -> bool {
        self.subgoal.is_subgoal(s)
    }

    /// The wrapped subgoal
    #[must_use]
    pub fn subgoal(&self) -> &S {
        &self.subgoal
    }
}

impl<A: Agent, S: Subgoal> Agent for RewardDecorator<'_, A, S> {
    fn first_action(&mut self, s: &[f64]) -> Result<DiscreteAction> {
        self.agent.first_action(s)
    }

    fn next_action(&mut self, reward: Reward, s: &[f64]) -> Result<DiscreteAction> {
        self.agent.next_action(self.subgoal.pseudo_reward(reward, s), s)
    }

    fn last_action(&mut self, reward: Reward) -> Result<()> {
        self.agent.last_action(reward)
    }

    fn set_debug(&mut self, on: bool) {
        self.agent.set_debug(on);
    }
}
