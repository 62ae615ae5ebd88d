//! Learning scenarios for the RL memory.

use larva_core::{AgentRng, RlMemoryConfig};
use larva_memory::RlMemory;
use std::collections::BTreeMap;

fn two_channel_config(state_specific_best: bool) -> RlMemoryConfig {
    RlMemoryConfig {
        channels: vec!["A".to_string(), "B".to_string()],
        gain_space: vec![-10.0, 10.0],
        update_interval: 1.0,
        train_dur: 300.0,
        state_specific_best,
        ..RlMemoryConfig::default()
    }
}

/// Reward is true on every tick where channel A currently has gain 10.
fn train(memory: &mut RlMemory, rng: &mut AgentRng, ticks: usize) {
    let dx = BTreeMap::new();
    for _ in 0..ticks {
        let reward = memory
            .current_gain()
            .map_or(false, |g| g.get("A") == Some(&10.0));
        memory.step(rng, &dx, reward);
    }
}

#[test]
fn test_learns_rewarded_gain() {
    for seed in [1u64, 7, 42, 1234] {
        let mut rng = AgentRng::seeded(seed);
        let mut memory = RlMemory::new(&two_channel_config(false), 0.1).unwrap();
        train(&mut memory, &mut rng, 3100);

        assert!(!memory.is_training(), "seed {}: still training", seed);
        assert_eq!(memory.best_gain()["A"], 10.0, "seed {}", seed);
        assert_eq!(memory.current_gain().unwrap()["A"], 10.0, "seed {}", seed);
    }
}

#[test]
fn test_learns_rewarded_gain_state_specific() {
    let cfg = RlMemoryConfig {
        state_buckets_per_side: 1,
        ..two_channel_config(true)
    };
    let mut rng = AgentRng::seeded(3);
    let mut memory = RlMemory::new(&cfg, 0.1).unwrap();
    train(&mut memory, &mut rng, 3100);
    assert_eq!(memory.best_gain()["A"], 10.0);
}

#[test]
fn test_same_seed_same_table() {
    let run = |seed| {
        let mut rng = AgentRng::seeded(seed);
        let mut memory = RlMemory::new(&two_channel_config(false), 0.1).unwrap();
        train(&mut memory, &mut rng, 1000);
        memory.q_table().row(0).to_vec()
    };
    assert_eq!(run(9), run(9));
}

#[test]
fn test_frozen_memory_stops_exploring() {
    let mut rng = AgentRng::seeded(5);
    let mut memory = RlMemory::new(&two_channel_config(false), 0.1).unwrap();
    train(&mut memory, &mut rng, 3100);
    let chosen = memory.current_gain();
    let dx = BTreeMap::new();
    for _ in 0..1000 {
        assert!(memory.step(&mut rng, &dx, false).is_none());
    }
    assert_eq!(memory.current_gain(), chosen);
}
