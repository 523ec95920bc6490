//! Core traits and types for the linear-options reinforcement learning engine
//!
//! This crate provides the foundational abstractions shared by the learning
//! and planning crates: discrete primitive actions, the agent capability set,
//! the environment collaborator contract, feature projection, and the error
//! taxonomy.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod agent;
pub mod environment;
pub mod error;
pub mod feature;
pub mod reward;

// Re-export core traits and types
pub use action::{DiscreteAction, DiscreteSpace};
pub use agent::{Agent, AgentConfig};
pub use environment::Environment;
pub use error::{RLError, Result};
pub use feature::{ensure_finite, ensure_finite_mat, project_checked, FeatureProjection, IdentityProjection};
pub use reward::Reward;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Agent, AgentConfig, DiscreteAction, DiscreteSpace, Environment, FeatureProjection,
        Result, Reward,
    };
}
