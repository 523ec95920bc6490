//! Agent capability set and base configuration

use serde::{Deserialize, Serialize};

use crate::{DiscreteAction, Result, Reward};

/// Base configuration shared by learning agents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Learning rate
    pub alpha: f64,
    /// Discount factor
    pub gamma: f64,
    /// Exploration rate
    pub epsilon: f64,
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.99,
            epsilon: 0.1,
            seed: None,
        }
    }
}

/// Core agent trait: the sense/act capability set driven by a control loop.
///
/// An episode is one `first_action`, any number of `next_action` calls, and
/// a closing `last_action` carrying the final reward.
pub trait Agent {
    /// Begin an episode at observation `s` and return the first primitive action
    fn first_action(&mut self, s: &[f64]) -> Result<DiscreteAction>;

    /// Learn from reward `reward`, observe `s`, and return the next primitive action
    fn next_action(&mut self, reward: Reward, s: &[f64]) -> Result<DiscreteAction>;

    /// Absorb the final reward of the episode
    fn last_action(&mut self, reward: Reward) -> Result<()>;

    /// Toggle verbose per-step debug output
    fn set_debug(&mut self, _on: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_round_trips_through_json() {
        let config = AgentConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AgentConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back.alpha, config.alpha);
        assert_eq!(back.gamma, config.gamma);
        assert_eq!(back.epsilon, config.epsilon);
        assert_eq!(back.seed, None);
    }
}
