//! Linear options, intra-option learning, and Dyna planning agents
//!
//! This crate implements the learning and planning engine of the
//! linear-options architecture:
//! - linear options with initiation, termination, and internal policies
//! - linear expectation models of option transitions and rewards
//! - intra-option value learning and model learning from shared experience
//! - Dyna-style planning backups that reuse the learned models
//! - an epsilon-greedy behavior policy over the option library
//! - pretraining of option policies behind a reward decorator

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod decorator;
pub mod dyna;
pub mod intra;
pub mod model;
pub mod option;
pub mod persist;
pub mod planner;
pub mod qlearner;
pub mod schedule;
pub mod selector;

// Re-export agents
pub use dyna::{DynaAgentConfig, DynaOptionAgent};
pub use qlearner::{LinearQAgent, LinearQConfig};

// Re-export option machinery
pub use model::{LinearOptionModel, ModelLearner};
pub use option::{Initiation, LinearOption, OptionLibrary, Termination};
pub use planner::DynaPlanner;
pub use selector::OptionSelector;

// Re-export learning components
pub use decorator::{IndicatorSubgoal, RewardDecorator, Subgoal};
pub use intra::IntraOptionLearner;
pub use persist::{load_library, save_library, ModelRecord, OptionRecord};
pub use schedule::{ConstantSchedule, LinearSchedule, Schedule};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        DynaAgentConfig, DynaOptionAgent, Initiation, LinearOption, LinearOptionModel,
        LinearQAgent, LinearQConfig, OptionLibrary, RewardDecorator, Termination,
    };
    pub use linopt_core::prelude::*;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Test doubles for scripting stochastic draws

    use std::collections::VecDeque;

    use rand::RngCore;

    /// RNG whose `f64` draws follow a scripted sequence.
    ///
    /// Encodes each value through the same 53-bit transform `rand` uses for
    /// the standard `f64` distribution, so `rng.gen::<f64>()` reproduces the
    /// scripted values exactly. Draws past the script panic, which makes
    /// tests assert the exact number of draws consumed.
    pub(crate) struct ForcedRng {
        draws: VecDeque<u64>,
    }

    impl ForcedRng {
        pub(crate) fn from_f64s(values: &[f64]) -> Self {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let draws = values
                .iter()
                .map(|v| ((v * (1u64 << 53) as f64) as u64) << 11)
                .collect();
            Self { draws }
        }

        pub(crate) fn is_exhausted(&self) -> bool {
            self.draws.is_empty()
        }
    }

    impl RngCore for ForcedRng {
        fn next_u32(&mut self) -> u32 {
            #[allow(clippy::cast_possible_truncation)]
            let word = self.next_u64() as u32;
            word
        }

        fn next_u64(&mut self) -> u64 {
            self.draws.pop_front().expect("draw past scripted sequence")
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(8) {
                let bytes = self.next_u64().to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    #[test]
    fn test_forced_rng_reproduces_scripted_f64s() {
        use rand::Rng;

        let mut rng = ForcedRng::from_f64s(&[0.0, 0.25, 0.75]);
        assert_eq!(rng.gen::<f64>(), 0.0);
        assert_eq!(rng.gen::<f64>(), 0.25);
        assert_eq!(rng.gen::<f64>(), 0.75);
        assert!(rng.is_exhausted());
    }
}
