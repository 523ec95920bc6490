//! Deterministic test environments for the linear-options engine
//!
//! This crate provides small environments implementing the engine's
//! environment contract, plus an episode-tracking wrapper. They carry no
//! physics or rendering; they exist to exercise agents deterministically.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod rooms;
pub mod tracked;

// Re-export environments
pub use rooms::FourRooms;
pub use tracked::{Episode, TrackedEnvironment};

// Re-export core types
pub use linopt_core::{DiscreteAction, Environment, Reward};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{FourRooms, TrackedEnvironment};
    pub use linopt_core::prelude::*;
}
