//! larva_bench: trajectory tests for the behavior core.
//!
//! Validates emergent behavior over long simulated time spans:
//! - One hour of free exploration (pause/run statistics)
//! - Feeding-dominated foraging (feed-chain lengths)
//! - Sensory drive steering the turner
//! - Long-run reproducibility from a seed

use larva_brain::{Brain, BrainInput};
use std::collections::BTreeMap;

/// Aggregates of one simulated run.
#[derive(Debug, Default, Clone, PartialEq)]
struct Trajectory {
    ticks: u64,
    distance: f64,
    angular_sum: f64,
    bites: u64,
}

impl Trajectory {
    fn mean_angular(&self) -> f64 {
        self.angular_sum / self.ticks.max(1) as f64
    }
}

/// Simulate `total_secs` with `field(tick)` supplying the readings.
fn simulate<F>(brain: &mut Brain, total_secs: f64, body_length: f64, mut field: F) -> Trajectory
where
    F: FnMut(u64) -> BTreeMap<String, f64>,
{
    let steps = (total_secs / brain.dt()).round() as u64;
    let mut traj = Trajectory::default();
    for t in 0..steps {
        let readings = field(t);
        let out = brain.step(&BrainInput::new(body_length, &readings));
        traj.ticks += 1;
        traj.distance += out.linear_activity * brain.dt();
        traj.angular_sum += out.angular_activity;
        traj.bites += out.feed as u64;
    }
    traj
}

#[cfg(test)]
mod tests {
    use super::*;
    use larva_core::{BrainConfig, IntermitterConfig, SensorConfig};

    fn empty_field(_: u64) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }

    /// One hour of exploration without food: short pauses between long runs.
    #[test]
    fn test_1h_exploration() {
        let cfg = BrainConfig {
            seed: Some(2024),
            ..BrainConfig::default()
        };
        let mut brain = Brain::new(&cfg).unwrap();
        let traj = simulate(&mut brain, 3600.0, 4.0, empty_field);

        assert_eq!(traj.ticks, 36_000);
        assert_eq!(traj.bites, 0, "EEB = 0 must never feed");
        assert!(traj.distance > 0.0);

        let summary = brain.intermitter().unwrap().summary().clone();
        assert!(summary.pauses > 100, "only {} pauses in an hour", summary.pauses);
        assert_eq!(summary.feedchains, 0);

        // lognormal(mean 1 s) pauses at dt = 0.1 s
        let mean_pause = summary.mean_pause_ticks();
        assert!((mean_pause - 10.0).abs() < 1.5, "mean pause {} ticks", mean_pause);

        let mean_chain = summary.mean_stridechain_length();
        assert!(mean_chain > 3.0 && mean_chain < 20.0, "mean stride chain {}", mean_chain);

        let pause_fraction = summary.pause_fraction();
        assert!(
            pause_fraction > 0.05 && pause_fraction < 0.35,
            "pause fraction {}",
            pause_fraction
        );
    }

    /// Foraging on a food patch: the EEB favours feeding and bites recur.
    #[test]
    fn test_foraging_feedchains() {
        let cfg = BrainConfig {
            seed: Some(7),
            intermitter: Some(IntermitterConfig {
                eeb: 0.8,
                feeder_reoccurence_rate: Some(0.9),
                ..IntermitterConfig::default()
            }),
            ..BrainConfig::default()
        };
        let mut brain = Brain::new(&cfg).unwrap();
        let traj = simulate(&mut brain, 3600.0, 4.0, empty_field);

        let summary = brain.intermitter().unwrap().summary().clone();
        assert!(summary.feedchains > summary.stridechains);
        // bites of an unfinished chain are not registered yet
        assert!(summary.bites <= traj.bites);

        // geometric continuation with p = 0.9 → 10 bites per chain
        let mean_feed = summary.mean_feedchain_length();
        assert!(mean_feed > 7.0 && mean_feed < 13.0, "mean feed chain {}", mean_feed);
    }

    /// A steadily rising attractive odor biases the turner to one side.
    #[test]
    fn test_odor_gradient_biases_turning() {
        let base = BrainConfig {
            seed: Some(3),
            intermitter: None,
            ..BrainConfig::default()
        };
        let odor = BrainConfig {
            olfactor: Some(SensorConfig::olfactor().with_gain("odor", 100.0)),
            ..base.clone()
        };

        let mut plain = Brain::new(&base).unwrap();
        let mut smelling = Brain::new(&odor).unwrap();
        let rising = |t: u64| BTreeMap::from([("odor".to_string(), (0.001 * t as f64).exp())]);

        let unbiased = simulate(&mut plain, 600.0, 4.0, empty_field);
        let biased = simulate(&mut smelling, 600.0, 4.0, rising);

        assert!(unbiased.mean_angular().abs() < 1.0, "drift {}", unbiased.mean_angular());
        assert!(biased.mean_angular() > 10.0, "bias {}", biased.mean_angular());
    }

    /// Ten simulated minutes reproduce bit for bit from the same seed.
    #[test]
    fn test_long_run_reproducible() {
        let cfg = BrainConfig {
            seed: Some(99),
            intermitter: Some(IntermitterConfig {
                eeb: 0.4,
                ..IntermitterConfig::default()
            }),
            ..BrainConfig::default()
        };
        let mut a = Brain::new(&cfg).unwrap();
        let mut b = Brain::new(&cfg).unwrap();
        let ta = simulate(&mut a, 600.0, 4.0, empty_field);
        let tb = simulate(&mut b, 600.0, 4.0, empty_field);
        assert_eq!(ta, tb);
        assert_eq!(
            a.intermitter().unwrap().records(),
            b.intermitter().unwrap().records()
        );
    }
}
