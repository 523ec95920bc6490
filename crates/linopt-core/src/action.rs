//! Primitive action representation

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Discrete primitive action id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteAction(pub usize);

/// Discrete space of `n` primitive actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteSpace {
    /// Number of primitive actions
    pub n: usize,
}

impl DiscreteSpace {
    /// Create a new discrete action space
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Sample a uniformly random action from the supplied generator
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DiscreteAction {
        DiscreteAction(rng.gen_range(0..self.n))
    }

    /// Check if an action id is valid within this space
    #[must_use]
    pub fn contains(&self, action: DiscreteAction) -> bool {
        action.0 < self.n
    }
}
