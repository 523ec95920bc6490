//! Episode tracking around any environment

use chrono::{DateTime, Utc};
use linopt_core::{DiscreteAction, Environment, Reward};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Statistics for one episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Episode ID
    pub id: String,
    /// Total reward
    pub total_reward: f64,
    /// Number of steps
    pub steps: usize,
    /// Start time
    pub start_time: DateTime<Utc>,
    /// End time
    pub end_time: Option<DateTime<Utc>>,
}

/// Environment wrapper that records per-episode statistics.
///
/// Each `reset` closes the current episode (if any) and opens a new one;
/// `apply` accumulates reward and step counts into it.
pub struct TrackedEnvironment<E> {
    /// Inner environment
    pub env: E,
    episode: Option<Episode>,
    completed: Vec<Episode>,
}

impl<E: Environment> TrackedEnvironment<E> {
    /// Wrap an environment
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode: None,
            completed: Vec::new(),
        }
    }

    /// Statistics of the episode in progress, if any
    #[must_use]
    pub fn episode(&self) -> Option<&Episode> {
        self.episode.as_ref()
    }

    /// Statistics of every finished episode, oldest first
    #[must_use]
    pub fn completed(&self) -> &[Episode] {
        &self.completed
    }
}

impl<E: Environment> Environment for TrackedEnvironment<E> {
    fn sensation(&self) -> Vec<f64> {
        self.env.sensation()
    }

    fn apply(&mut self, action: DiscreteAction) -> Reward {
        let reward = self.env.apply(action);
        if let Some(episode) = &mut self.episode {
            episode.total_reward += reward.value();
            episode.steps += 1;
            if self.env.terminal() && episode.end_time.is_none() {
                episode.end_time = Some(Utc::now());
            }
        }
        reward
    }

    fn terminal(&self) -> bool {
        self.env.terminal()
    }

    fn reset(&mut self) {
        if let Some(mut episode) = self.episode.take() {
            if episode.end_time.is_none() {
                episode.end_time = Some(Utc::now());
            }
            info!(
                id = %episode.id,
                total_reward = episode.total_reward,
                steps = episode.steps,
                "episode finished"
            );
            self.completed.push(episode);
        }

        self.env.reset();
        self.episode = Some(Episode {
            id: uuid::Uuid::new_v4().to_string(),
            total_reward: 0.0,
            steps: 0,
            start_time: Utc::now(),
            end_time: None,
        });
    }

    fn num_actions(&self) -> usize {
        self.env.num_actions()
    }
}
