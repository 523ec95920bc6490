//! Shared helpers for integration tests
#![allow(dead_code)]

use linopt_agent::{Initiation, LinearOption, OptionLibrary, Termination};
use linopt_core::{Agent, Environment};
use linopt_env::FourRooms;
use ndarray::Array1;

/// Drive one episode and return the primitive actions taken.
///
/// The episode ends when the environment signals terminal or after
/// `max_steps` rewards, whichever comes first.
pub fn run_episode<E: Environment, A: Agent>(
    env: &mut E,
    agent: &mut A,
    max_steps: usize,
) -> Vec<usize> {
    env.reset();
    let mut actions = Vec::new();
    let mut action = agent.first_action(&env.sensation()).unwrap();
    actions.push(action.0);

    for _ in 0..max_steps {
        let reward = env.apply(action);
        if env.terminal() {
            agent.last_action(reward).unwrap();
            return actions;
        }
        action = agent.next_action(reward, &env.sensation()).unwrap();
        actions.push(action.0);
    }
    actions
}

/// Library of four options over the four-rooms observation, each committed
/// to one direction and terminating with a fixed probability.
pub fn directional_library() -> OptionLibrary {
    let n = FourRooms::SENSATION_LEN;
    let options = (0..FourRooms::NUM_ACTIONS)
        .map(|direction| {
            let mut option = LinearOption::new(
                n,
                FourRooms::NUM_ACTIONS,
                Termination::Constant(0.25),
                Initiation::Everywhere,
            )
            .unwrap();
            // Bias the internal policy toward this option's direction; the
            // observation is non-negative with positive coordinates, so the
            // biased action always wins the argmax.
            option.action_thetas[direction] = Array1::from_elem(n, 0.1);
            option
        })
        .collect();
    OptionLibrary::new(options, n, FourRooms::NUM_ACTIONS).unwrap()
}
