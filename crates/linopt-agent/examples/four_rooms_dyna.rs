//! Example: Dyna options agent learning in the four-rooms gridworld

use linopt_agent::{
    DynaAgentConfig, DynaOptionAgent, Initiation, LinearOption, OptionLibrary, Termination,
};
use linopt_core::{Agent, AgentConfig, Environment, IdentityProjection};
use linopt_env::{FourRooms, TrackedEnvironment};
use ndarray::Array1;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Four options, one committed to each direction, terminating at doorways
    let n = FourRooms::SENSATION_LEN;
    let options = (0..FourRooms::NUM_ACTIONS)
        .map(|direction| {
            let mut option = LinearOption::new(
                n,
                FourRooms::NUM_ACTIONS,
                Termination::Indicator {
                    feature: FourRooms::DOORWAY_FEATURE,
                    threshold: 0.5,
                },
                Initiation::Everywhere,
            )?;
            option.action_thetas[direction] = Array1::from_elem(n, 0.1);
            Ok(option)
        })
        .collect::<Result<Vec<_>, linopt_core::RLError>>()?;
    let mut library = OptionLibrary::new(options, n, FourRooms::NUM_ACTIONS)?;
    library.attach_zero_models();

    let config = DynaAgentConfig {
        base: AgentConfig {
            alpha: 0.05,
            gamma: 0.95,
            epsilon: 0.3,
            seed: Some(42),
        },
        epsilon_end: Some(0.05),
        epsilon_decay_steps: 5_000,
    };
    let mut agent = DynaOptionAgent::new(config, library, Box::new(IdentityProjection::new(n)))?;

    let mut env = TrackedEnvironment::new(FourRooms::new());
    let num_episodes = 50;
    let max_steps = 500;

    for episode in 0..num_episodes {
        env.reset();
        let mut action = agent.first_action(&env.sensation())?;

        for _ in 0..max_steps {
            let reward = env.apply(action);
            if env.terminal() {
                agent.last_action(reward)?;
                break;
            }
            action = agent.next_action(reward, &env.sensation())?;
        }

        if let Some(stats) = env.episode() {
            println!(
                "Episode {}: Total Reward = {:.2}, Steps = {}",
                episode + 1,
                stats.total_reward,
                stats.steps
            );
        }
    }

    let finished = env.completed();
    let avg_steps: f64 = finished.iter().map(|e| e.steps as f64).sum::<f64>()
        / finished.len().max(1) as f64;
    println!("\nAverage steps over {} episodes: {:.1}", finished.len(), avg_steps);

    Ok(())
}
