//! Random-policy rollouts over a few registered environments.
//!
//! Demonstrates: registry lookup → reset(seed) → sample joint actions →
//! step until done → episode returns → render.

use posgrid_bench::random_joint_action;
use posgrid_core::seeded_rng;
use posgrid_engine::{Environment, RenderMode};
use posgrid_envs::grid_world_registry;

fn main() {
    println!("=== posgrid random rollouts ===\n");
    let reg = grid_world_registry().unwrap();
    println!("{} grid-world ids registered\n", reg.len());

    for id in [
        "TwoPaths7x7-v0",
        "PursuitEvasion8x8-v0",
        "LBF5x5-n2-f1-v2",
        "Driving7x7-n2-v0",
    ] {
        let mut env = reg.make(id).unwrap();
        let mut rng = seeded_rng(7);
        println!("{id}");
        for episode in 0..3 {
            env.reset(Some(episode)).unwrap();
            let mut returns = vec![0.0; env.possible_agents().len()];
            let mut steps = 0;
            loop {
                let out = env.step(random_joint_action(&env, &mut rng)).unwrap();
                steps += 1;
                for (agent, r) in &out.rewards {
                    returns[agent.index()] += r;
                }
                if out.all_done {
                    let truncated = out.truncated.values().any(|&t| t);
                    println!(
                        "  episode {episode}: {steps:>3} steps, truncated={truncated:<5}, returns={returns:?}"
                    );
                    break;
                }
            }
        }
        if let Some(frame) = env.render(RenderMode::Ansi) {
            println!("{frame}");
        }
    }
}
