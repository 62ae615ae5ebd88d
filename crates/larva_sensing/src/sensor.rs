//! Generic per-channel sensor.
//!
//! Each channel carries a gain. A tick turns the raw readings into
//! differentials, weights them by gain and folds them into a single
//! leaky activation clamped to [−1, 1]. Unknown channels are adopted on
//! first sight with zero gain.

use larva_core::{AgentRng, Perception, Result, SensorConfig};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
pub struct Sensor {
    perception: Perception,
    decay_coef: f64,
    input_noise: f64,
    dt: f64,
    gains: BTreeMap<String, f64>,
    previous: HashMap<String, f64>,
    /// Differentials of the channels seen on the last tick.
    dx: BTreeMap<String, f64>,
    /// Noise-free readings and their change on the last tick.
    raw_previous: HashMap<String, f64>,
    raw_change: BTreeMap<String, f64>,
    activation: f64,
}

impl Sensor {
    /// Build a sensor, drawing each configured gain once from a normal with
    /// its configured mean and std.
    pub fn new(cfg: &SensorConfig, dt: f64, rng: &mut AgentRng) -> Result<Self> {
        larva_core::error::check_timestep(dt)?;
        cfg.validate()?;
        let gains = cfg
            .gain_dict
            .iter()
            .map(|(channel, spec)| (channel.clone(), rng.normal(spec.mean, spec.std)))
            .collect();
        Ok(Self {
            perception: cfg.perception,
            decay_coef: cfg.decay_coef,
            input_noise: cfg.input_noise,
            dt,
            gains,
            previous: HashMap::new(),
            dx: BTreeMap::new(),
            raw_previous: HashMap::new(),
            raw_change: BTreeMap::new(),
            activation: 0.0,
        })
    }

    /// Consume one tick of readings and return the updated activation.
    pub fn step<'a, I>(&mut self, rng: &mut AgentRng, readings: I) -> f64
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        self.dx.clear();
        self.raw_change.clear();
        let mut drive = 0.0;

        for (channel, raw) in readings {
            if !raw.is_finite() {
                tracing::warn!("Ignoring non-finite reading {} on channel '{}'", raw, channel);
                continue;
            }
            if let Some(prev) = self.raw_previous.insert(channel.to_string(), raw) {
                self.raw_change.insert(channel.to_string(), raw - prev);
            }
            let value = if self.input_noise > 0.0 {
                raw * (1.0 + rng.normal(0.0, self.input_noise))
            } else {
                raw
            };

            let dx = self.differential(channel, value);
            self.previous.insert(channel.to_string(), value);

            let gain = *self.gains.entry(channel.to_string()).or_insert_with(|| {
                tracing::debug!("New sensor channel '{}' registered with zero gain", channel);
                0.0
            });
            drive += gain * dx;
            self.dx.insert(channel.to_string(), dx);
        }

        let decayed = self.activation * (-self.dt * self.decay_coef).exp();
        let next = decayed + self.dt * drive;
        self.activation = if next.is_finite() {
            next.clamp(-1.0, 1.0)
        } else {
            tracing::warn!("Sensor drive diverged, keeping decayed activation");
            decayed.clamp(-1.0, 1.0)
        };
        self.activation
    }

    fn differential(&self, channel: &str, value: f64) -> f64 {
        match self.perception {
            Perception::Null => value,
            Perception::Linear => self.previous.get(channel).map_or(0.0, |prev| value - prev),
            Perception::Log => match self.previous.get(channel) {
                Some(&prev) if prev != 0.0 => value / prev - 1.0,
                _ => 0.0,
            },
        }
    }

    pub fn activation(&self) -> f64 {
        self.activation
    }

    pub fn gain(&self, channel: &str) -> Option<f64> {
        self.gains.get(channel).copied()
    }

    pub fn gains(&self) -> &BTreeMap<String, f64> {
        &self.gains
    }

    pub fn set_gain(&mut self, channel: &str, gain: f64) {
        self.gains.insert(channel.to_string(), gain);
    }

    pub fn set_gains<'a, I>(&mut self, gains: I)
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        for (channel, gain) in gains {
            self.set_gain(channel, gain);
        }
    }

    pub fn decay_coef(&self) -> f64 {
        self.decay_coef
    }

    pub fn set_decay_coef(&mut self, decay_coef: f64) {
        if decay_coef.is_finite() && decay_coef >= 0.0 {
            self.decay_coef = decay_coef;
        }
    }

    /// Differential of `channel` on the last tick; 0 if it was not read.
    pub fn dx(&self, channel: &str) -> f64 {
        self.dx.get(channel).copied().unwrap_or(0.0)
    }

    pub fn dx_all(&self) -> &BTreeMap<String, f64> {
        &self.dx
    }

    /// Change of the noise-free readings on the last tick, for channels read
    /// on both this tick and an earlier one.
    pub fn raw_changes(&self) -> &BTreeMap<String, f64> {
        &self.raw_change
    }

    /// Last accepted reading of `channel`.
    pub fn last_reading(&self, channel: &str) -> Option<f64> {
        self.previous.get(channel).copied()
    }

    pub fn perception(&self) -> Perception {
        self.perception
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(perception: Perception, gains: &[(&str, f64)]) -> Sensor {
        let mut cfg = SensorConfig {
            perception,
            decay_coef: 0.0,
            ..SensorConfig::default()
        };
        for (c, g) in gains {
            cfg = cfg.with_gain(c, *g);
        }
        Sensor::new(&cfg, 0.1, &mut AgentRng::seeded(0)).unwrap()
    }

    #[test]
    fn test_unknown_channel_gets_zero_gain() {
        let mut rng = AgentRng::seeded(0);
        let mut s = sensor(Perception::Linear, &[]);
        s.step(&mut rng, [("odor", 1.0)]);
        let a = s.step(&mut rng, [("odor", 5.0)]);
        assert_eq!(a, 0.0);
        assert_eq!(s.gain("odor"), Some(0.0));
        assert_eq!(s.dx("odor"), 4.0);
    }

    #[test]
    fn test_linear_differential_drives_activation() {
        let mut rng = AgentRng::seeded(0);
        let mut s = sensor(Perception::Linear, &[("odor", 2.0)]);
        assert_eq!(s.step(&mut rng, [("odor", 1.0)]), 0.0);
        let a = s.step(&mut rng, [("odor", 1.5)]);
        assert!((a - 0.1 * 2.0 * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_log_guards_zero_previous() {
        let mut rng = AgentRng::seeded(0);
        let mut s = sensor(Perception::Log, &[("odor", 1.0)]);
        s.step(&mut rng, [("odor", 0.0)]);
        s.step(&mut rng, [("odor", 3.0)]);
        assert_eq!(s.dx("odor"), 0.0);
        s.step(&mut rng, [("odor", 6.0)]);
        assert!((s.dx("odor") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_activation_clamped() {
        let mut rng = AgentRng::seeded(0);
        let mut s = sensor(Perception::Null, &[("x", 1000.0)]);
        assert_eq!(s.step(&mut rng, [("x", 1.0)]), 1.0);
        assert_eq!(s.step(&mut rng, [("x", -1.0)]), -1.0);
    }

    #[test]
    fn test_empty_readings_decay() {
        let mut rng = AgentRng::seeded(0);
        let cfg = SensorConfig {
            perception: Perception::Null,
            decay_coef: 1.0,
            ..SensorConfig::default()
        }
        .with_gain("x", 5.0);
        let mut s = Sensor::new(&cfg, 0.1, &mut rng).unwrap();
        let a0 = s.step(&mut rng, [("x", 1.0)]);
        let a1 = s.step(&mut rng, std::iter::empty());
        assert!((a1 - a0 * (-0.1f64).exp()).abs() < 1e-12);
        assert!(s.dx_all().is_empty());
    }

    #[test]
    fn test_non_finite_reading_skipped() {
        let mut rng = AgentRng::seeded(0);
        let mut s = sensor(Perception::Linear, &[("odor", 1.0)]);
        s.step(&mut rng, [("odor", 1.0)]);
        let a = s.step(&mut rng, [("odor", f64::NAN)]);
        assert_eq!(a, 0.0);
        assert_eq!(s.last_reading("odor"), Some(1.0));
    }

    #[test]
    fn test_raw_changes_ignore_input_noise() {
        let mut rng = AgentRng::seeded(1);
        let cfg = SensorConfig {
            input_noise: 0.05,
            ..SensorConfig::default()
        };
        let mut s = Sensor::new(&cfg, 0.1, &mut rng).unwrap();
        s.step(&mut rng, [("touch_head", 0.0)]);
        assert!(s.raw_changes().is_empty());
        s.step(&mut rng, [("touch_head", 1.0)]);
        assert_eq!(s.raw_changes().get("touch_head"), Some(&1.0));
        assert_ne!(s.dx("touch_head"), 1.0);
    }

    #[test]
    fn test_gain_draw_uses_mean_and_std() {
        let mut cfg = SensorConfig::default();
        cfg.gain_dict
            .insert("odor".into(), larva_core::GainSpec { mean: 50.0, std: 10.0 });
        let a = Sensor::new(&cfg, 0.1, &mut AgentRng::seeded(4)).unwrap();
        let b = Sensor::new(&cfg, 0.1, &mut AgentRng::seeded(4)).unwrap();
        assert_eq!(a.gain("odor"), b.gain("odor"));
        assert_ne!(a.gain("odor"), Some(50.0));
    }
}
